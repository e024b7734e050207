//! Sharing the outcome of coordinator-only work with every rank.

use strata_comm::Communicator;
use strata_core::RunError;

/// Make the coordinator's `outcome` every rank's outcome.
///
/// The coordinator passes `Some(result)`; other ranks pass `None`. On
/// failure the coordinator gets its own error back and the others get a
/// collaborator error carrying its message, so every rank stops at the
/// same point.
pub(crate) fn coordinator_outcome(
    comm: &dyn Communicator,
    outcome: Option<Result<(), RunError>>,
) -> Result<(), RunError> {
    let (payload, own) = match outcome {
        Some(Ok(())) => (Some(Vec::new()), None),
        Some(Err(e)) => (Some(e.to_string().into_bytes()), Some(e)),
        None => (None, None),
    };
    let shared = comm.broadcast_bytes(payload)?;
    match own {
        Some(e) => Err(e),
        None if shared.is_empty() => Ok(()),
        None => Err(RunError::collaborator(
            "coordinator",
            String::from_utf8_lossy(&shared),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_comm::{SerialComm, ThreadGroup};

    #[test]
    fn serial_outcome_passes_through() {
        assert!(coordinator_outcome(&SerialComm, Some(Ok(()))).is_ok());
        let err = RunError::Io {
            path: "Header".into(),
            reason: "denied".into(),
        };
        assert_eq!(coordinator_outcome(&SerialComm, Some(Err(err.clone()))), Err(err));
    }

    #[test]
    fn failure_reaches_every_rank() {
        let results = ThreadGroup::run(3, |comm| {
            let outcome = comm
                .is_coordinator()
                .then(|| Err(RunError::usage("metadata unavailable")));
            coordinator_outcome(&comm, outcome)
        })
        .unwrap();
        assert_eq!(results[0], Err(RunError::usage("metadata unavailable")));
        for r in &results[1..] {
            assert!(matches!(r, Err(RunError::Collaborator { reason, .. }) if reason == "metadata unavailable"));
        }
    }
}
