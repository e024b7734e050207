//! Single-rank process group.

use crate::comm::Communicator;
use crate::error::CommError;

/// A group of one. Every collective returns immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<(), CommError> {
        Ok(())
    }

    fn gather_bytes(&self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        Ok(Some(vec![payload]))
    }

    fn broadcast_bytes(&self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        Ok(payload.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_reductions_are_identity() {
        let comm = SerialComm;
        assert!(comm.is_coordinator());
        assert_eq!(comm.reduce_max_f64(2.5).unwrap(), Some(2.5));
        assert_eq!(comm.all_reduce_min_f64(-1.0).unwrap(), -1.0);
        assert_eq!(comm.all_gather_bytes(vec![7]).unwrap(), vec![vec![7]]);
    }
}
