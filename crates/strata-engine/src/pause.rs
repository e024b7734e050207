//! Holding every rank until someone presses enter.

use std::io::BufRead;

use strata_comm::Communicator;
use strata_core::RunError;
use tracing::info;

use crate::sync::coordinator_outcome;

/// Block the coordinator on one line of `input`, then release every rank.
/// A failed read on the coordinator fails the pause on every rank.
/// Collective.
pub fn pause_for_debug(input: &mut dyn BufRead, comm: &dyn Communicator) -> Result<(), RunError> {
    let read = comm.is_coordinator().then(|| {
        info!("Waiting for input to continue the run");
        let mut line = String::new();
        input.read_line(&mut line).map(drop).map_err(|e| RunError::Io {
            path: "<stdin>".into(),
            reason: e.to_string(),
        })
    });
    comm.barrier()?;
    coordinator_outcome(comm, read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use strata_comm::ThreadGroup;

    #[test]
    fn only_the_coordinator_reads() {
        let results = ThreadGroup::run(2, |comm| {
            let mut input = Cursor::new(if comm.is_coordinator() { "go\n" } else { "" });
            pause_for_debug(&mut input, &comm).map(|()| input.position())
        })
        .unwrap();
        assert_eq!(results[0], Ok(3));
        assert_eq!(results[1], Ok(0));
    }

    #[test]
    fn failed_read_releases_every_rank_with_an_error() {
        let results = ThreadGroup::run(2, |comm| {
            let bytes: &[u8] = if comm.is_coordinator() { &[0xff, 0xfe, b'\n'] } else { &[] };
            pause_for_debug(&mut Cursor::new(bytes), &comm)
        })
        .unwrap();
        assert!(matches!(&results[0], Err(RunError::Io { path, .. }) if path == "<stdin>"));
        assert!(matches!(&results[1], Err(RunError::Collaborator { component, .. }) if component == "coordinator"));
    }
}
