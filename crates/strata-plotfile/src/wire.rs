//! Per-rank write reports exchanged during a collective write.

use strata_comm::{CommError, Communicator};

use crate::error::PlotfileError;

/// Where one locally owned box landed and its component bounds.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BoxEntry {
    pub index: usize,
    pub offset: u64,
    pub mins: Vec<f64>,
    pub maxs: Vec<f64>,
}

/// A rank's outcome: per-level entries, or its failure message.
pub(crate) type RankReport = Result<Vec<Vec<BoxEntry>>, String>;

pub(crate) fn encode_report(report: &RankReport) -> Vec<u8> {
    let mut out = Vec::new();
    match report {
        Ok(levels) => {
            out.push(0);
            put_u32(&mut out, levels.len());
            for entries in levels {
                put_u32(&mut out, entries.len());
                for e in entries {
                    put_u32(&mut out, e.index);
                    out.extend_from_slice(&e.offset.to_le_bytes());
                    put_u32(&mut out, e.mins.len());
                    for v in e.mins.iter().chain(&e.maxs) {
                        out.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }
        Err(msg) => {
            out.push(1);
            put_u32(&mut out, msg.len());
            out.extend_from_slice(msg.as_bytes());
        }
    }
    out
}

pub(crate) fn decode_report(buf: &[u8]) -> Result<RankReport, CommError> {
    let mut r = Reader { buf, pos: 0 };
    match r.take::<1>()?[0] {
        0 => {
            let nlevels = r.u32()?;
            let mut levels = Vec::with_capacity(nlevels);
            for _ in 0..nlevels {
                let n = r.u32()?;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    let index = r.u32()?;
                    let offset = u64::from_le_bytes(r.take()?);
                    let ncomp = r.u32()?;
                    let mins = (0..ncomp).map(|_| r.f64()).collect::<Result<_, _>>()?;
                    let maxs = (0..ncomp).map(|_| r.f64()).collect::<Result<_, _>>()?;
                    entries.push(BoxEntry {
                        index,
                        offset,
                        mins,
                        maxs,
                    });
                }
                levels.push(entries);
            }
            Ok(Ok(levels))
        }
        1 => {
            let len = r.u32()?;
            let bytes = r.slice(len)?;
            Ok(Err(String::from_utf8_lossy(bytes).into_owned()))
        }
        tag => Err(malformed(format!("unknown report tag {tag}"))),
    }
}

/// Share the coordinator's outcome with every rank.
///
/// The coordinator passes `Some(outcome)`, others `None`. On failure the
/// coordinator gets its own error back and the others a
/// [`PlotfileError::Remote`].
pub(crate) fn share_outcome(
    comm: &dyn Communicator,
    outcome: Option<Result<(), PlotfileError>>,
) -> Result<(), PlotfileError> {
    let payload = outcome.as_ref().map(|o| match o {
        Ok(()) => Vec::new(),
        Err(e) => e.to_string().into_bytes(),
    });
    let shared = comm.broadcast_bytes(payload)?;
    match outcome {
        Some(local) => local,
        None if shared.is_empty() => Ok(()),
        None => Err(PlotfileError::Remote {
            rank: comm.coordinator(),
            reason: String::from_utf8_lossy(&shared).into_owned(),
        }),
    }
}

fn put_u32(out: &mut Vec<u8>, v: usize) {
    out.extend_from_slice(&(v as u32).to_le_bytes());
}

fn malformed(detail: String) -> CommError {
    CommError::MalformedPayload { detail }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn slice(&mut self, n: usize) -> Result<&'a [u8], CommError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + n)
            .ok_or_else(|| malformed(format!("report truncated at byte {}", self.pos)))?;
        self.pos += n;
        Ok(bytes)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CommError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<usize, CommError> {
        Ok(u32::from_le_bytes(self.take()?) as usize)
    }

    fn f64(&mut self) -> Result<f64, CommError> {
        Ok(f64::from_le_bytes(self.take()?))
    }
}
