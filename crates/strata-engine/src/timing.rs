//! Wall-clock timing and memory diagnostics of a run.

use std::time::Instant;

use chrono::{DateTime, Utc};
use strata_comm::Communicator;
use strata_core::RunError;
use strata_grid::FabArena;
use tracing::info;

/// Wall-clock seconds of a run, maximized over ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunTimings {
    /// From before initialization to after teardown.
    pub run_time: f64,
    /// From the end of initialization to after teardown.
    pub run_time_without_init: f64,
}

/// Records when a run started and finished initializing.
#[derive(Clone, Debug)]
pub struct RunTimer {
    start: Instant,
    init_done: Option<Instant>,
}

impl RunTimer {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            init_done: None,
        }
    }

    /// Mark the end of initialization.
    pub fn mark_init(&mut self) {
        self.init_done = Some(Instant::now());
    }

    /// Stop timing and report the slowest rank's times on the
    /// coordinator. Collective.
    pub fn finish(&self, comm: &dyn Communicator) -> Result<RunTimings, RunError> {
        let now = Instant::now();
        let init_done = self.init_done.unwrap_or(self.start);
        let run_time = comm.all_reduce_max_f64(now.duration_since(self.start).as_secs_f64())?;
        let run_time_without_init = comm.all_reduce_max_f64(now.duration_since(init_done).as_secs_f64())?;
        if comm.is_coordinator() {
            info!("Run time = {run_time}");
            info!("Run time w/o init = {run_time_without_init}");
        }
        Ok(RunTimings {
            run_time,
            run_time_without_init,
        })
    }
}

/// Report every rank's FAB high-water mark once all ranks reach this
/// point. The coordinator logs one line per rank and returns the marks in
/// rank order; other ranks return `None`. Collective.
pub fn report_heap(arena: &FabArena, comm: &dyn Communicator) -> Result<Option<Vec<usize>>, RunError> {
    comm.barrier()?;
    let used = arena.heap_space_used() as u64;
    let Some(payloads) = comm.gather_bytes(used.to_le_bytes().to_vec())? else {
        return Ok(None);
    };
    let marks = payloads
        .iter()
        .map(|p| {
            let raw: [u8; 8] = p.as_slice().try_into().map_err(|_| {
                RunError::collaborator("process group", format!("heap report of {} bytes", p.len()))
            })?;
            Ok(u64::from_le_bytes(raw) as usize)
        })
        .collect::<Result<Vec<_>, RunError>>()?;
    for (rank, used) in marks.iter().enumerate() {
        info!(rank, "{}", heap_line(rank, *used));
    }
    Ok(Some(marks))
}

fn heap_line(rank: usize, used: usize) -> String {
    format!("CPU({rank}): Heap Space (bytes) used by Coalescing FAB Arena: {used}")
}

/// Which end of a run a timestamp line marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMark {
    /// Before initialization.
    Start,
    /// After the final flush, before teardown.
    End,
}

/// Log a UTC timestamp line on the coordinator.
pub fn log_timestamp(comm: &dyn Communicator, mark: RunMark) {
    if comm.is_coordinator() {
        info!("{}", timestamp_line(mark, Utc::now()));
    }
}

fn timestamp_line(mark: RunMark, at: DateTime<Utc>) -> String {
    let verb = match mark {
        RunMark::Start => "Starting",
        RunMark::End => "Ending",
    };
    format!("{verb} run at {} UTC on {}.", at.format("%H:%M:%S"), at.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use strata_comm::{SerialComm, ThreadGroup};

    #[test]
    fn init_time_is_excluded() {
        let mut timer = RunTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        timer.mark_init();
        let t = timer.finish(&SerialComm).unwrap();
        assert!(t.run_time >= t.run_time_without_init);
        assert!(t.run_time >= 0.005);
    }

    #[test]
    fn timings_agree_across_ranks() {
        let timings = ThreadGroup::run(3, |comm| {
            let timer = RunTimer::start();
            if comm.rank() == 2 {
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
            timer.finish(&comm).unwrap()
        })
        .unwrap();
        assert!(timings.iter().all(|t| *t == timings[0]));
        assert!(timings[0].run_time >= 0.010);
    }

    #[test]
    fn heap_report_returns_high_water() {
        let arena = FabArena::new();
        {
            let _lease = arena.lease(4096);
        }
        assert_eq!(report_heap(&arena, &SerialComm).unwrap(), Some(vec![4096]));
    }

    #[test]
    fn heap_marks_reach_the_coordinator_only() {
        let results = ThreadGroup::run(3, |comm| {
            let arena = FabArena::new();
            {
                let _lease = arena.lease(1024 * (comm.rank() + 1));
            }
            report_heap(&arena, &comm).unwrap()
        })
        .unwrap();
        assert_eq!(results[0], Some(vec![1024, 2048, 3072]));
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
        assert_eq!(
            heap_line(2, 3072),
            "CPU(2): Heap Space (bytes) used by Coalescing FAB Arena: 3072"
        );
    }

    #[test]
    fn timestamp_lines_name_time_then_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamp_line(RunMark::Start, at), "Starting run at 07:05:01 UTC on 2024-03-09.");
        assert_eq!(timestamp_line(RunMark::End, at), "Ending run at 07:05:01 UTC on 2024-03-09.");
    }
}
