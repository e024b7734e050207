//! In-process process group: one thread per rank.
//!
//! Workers talk only to the coordinator. Each worker owns an upward
//! channel (worker → coordinator) and a downward channel (coordinator →
//! worker); since every rank issues collectives in the same order, FIFO
//! delivery on each channel is enough to keep collectives matched.

use std::sync::{Arc, Barrier};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::comm::{Communicator, COORDINATOR};
use crate::error::CommError;

enum Role {
    Coordinator {
        /// Indexed by `rank - 1`.
        from_workers: Vec<Receiver<Vec<u8>>>,
        /// Indexed by `rank - 1`.
        to_workers: Vec<Sender<Vec<u8>>>,
    },
    Worker {
        to_coordinator: Sender<Vec<u8>>,
        from_coordinator: Receiver<Vec<u8>>,
    },
}

/// One rank's endpoint in a [`ThreadGroup`].
///
/// Move each endpoint into its own thread; endpoints are `Send` but are
/// meant to be used by exactly one thread.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
    role: Role,
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.barrier.wait();
        Ok(())
    }

    fn gather_bytes(&self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        match &self.role {
            Role::Coordinator { from_workers, .. } => {
                let mut out = Vec::with_capacity(self.size);
                out.push(payload);
                for (i, rx) in from_workers.iter().enumerate() {
                    let bytes = rx
                        .recv()
                        .map_err(|_| CommError::Disconnected { peer: i + 1 })?;
                    out.push(bytes);
                }
                Ok(Some(out))
            }
            Role::Worker { to_coordinator, .. } => {
                to_coordinator
                    .send(payload)
                    .map_err(|_| CommError::Disconnected { peer: COORDINATOR })?;
                Ok(None)
            }
        }
    }

    fn broadcast_bytes(&self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        match &self.role {
            Role::Coordinator { to_workers, .. } => {
                let payload = payload.unwrap_or_default();
                for (i, tx) in to_workers.iter().enumerate() {
                    tx.send(payload.clone())
                        .map_err(|_| CommError::Disconnected { peer: i + 1 })?;
                }
                Ok(payload)
            }
            Role::Worker {
                from_coordinator, ..
            } => from_coordinator
                .recv()
                .map_err(|_| CommError::Disconnected { peer: COORDINATOR }),
        }
    }
}

/// Factory for in-process groups.
pub struct ThreadGroup;

impl ThreadGroup {
    /// Build `size` connected endpoints, ordered by rank.
    pub fn endpoints(size: usize) -> Result<Vec<ThreadComm>, CommError> {
        if size == 0 {
            return Err(CommError::EmptyGroup);
        }
        let barrier = Arc::new(Barrier::new(size));
        let mut from_workers = Vec::with_capacity(size - 1);
        let mut to_workers = Vec::with_capacity(size - 1);
        let mut workers = Vec::with_capacity(size - 1);
        for rank in 1..size {
            let (up_tx, up_rx) = unbounded();
            let (down_tx, down_rx) = unbounded();
            from_workers.push(up_rx);
            to_workers.push(down_tx);
            workers.push(ThreadComm {
                rank,
                size,
                barrier: Arc::clone(&barrier),
                role: Role::Worker {
                    to_coordinator: up_tx,
                    from_coordinator: down_rx,
                },
            });
        }
        let mut out = Vec::with_capacity(size);
        out.push(ThreadComm {
            rank: COORDINATOR,
            size,
            barrier,
            role: Role::Coordinator {
                from_workers,
                to_workers,
            },
        });
        out.extend(workers);
        Ok(out)
    }

    /// Run `body` once per rank on scoped threads and collect the results
    /// in rank order.
    ///
    /// A panic on any rank is re-raised on the caller's thread.
    pub fn run<T, F>(size: usize, body: F) -> Result<Vec<T>, CommError>
    where
        T: Send,
        F: Fn(ThreadComm) -> T + Sync,
    {
        let endpoints = Self::endpoints(size)?;
        let body = &body;
        Ok(thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|comm| scope.spawn(move || body(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        }))
    }
}
