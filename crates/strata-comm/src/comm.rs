//! The [`Communicator`] trait.

use crate::error::CommError;

/// Rank of the coordinator process.
pub const COORDINATOR: usize = 0;

/// Collective operations over a fixed group of ranks.
///
/// Every method except the accessors is collective: all ranks must call
/// it, in the same order, or the group deadlocks. Conditions guarding a
/// collective call must therefore evaluate identically on every rank.
pub trait Communicator: Send {
    /// This rank's index in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Rank that owns shared metadata and receives reductions.
    fn coordinator(&self) -> usize {
        COORDINATOR
    }

    /// `true` on the coordinator only.
    fn is_coordinator(&self) -> bool {
        self.rank() == self.coordinator()
    }

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), CommError>;

    /// Gather one payload per rank to the coordinator.
    ///
    /// Returns `Some(payloads)` ordered by rank on the coordinator and
    /// `None` elsewhere.
    fn gather_bytes(&self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError>;

    /// Distribute the coordinator's payload to every rank.
    ///
    /// The coordinator passes `Some(payload)`; other ranks pass `None`.
    /// Every rank receives the coordinator's bytes.
    fn broadcast_bytes(&self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError>;

    /// Maximum of `value` across ranks, delivered to the coordinator only.
    fn reduce_max_f64(&self, value: f64) -> Result<Option<f64>, CommError> {
        let gathered = self.gather_bytes(value.to_le_bytes().to_vec())?;
        gathered
            .map(|payloads| {
                payloads
                    .iter()
                    .map(|p| decode_f64(p))
                    .try_fold(f64::NEG_INFINITY, |acc, v| Ok(acc.max(v?)))
            })
            .transpose()
    }

    /// Maximum of `value` across ranks, delivered to every rank.
    fn all_reduce_max_f64(&self, value: f64) -> Result<f64, CommError> {
        let reduced = self.reduce_max_f64(value)?;
        let bytes = self.broadcast_bytes(reduced.map(|v| v.to_le_bytes().to_vec()))?;
        decode_f64(&bytes)
    }

    /// Minimum of `value` across ranks, delivered to every rank.
    fn all_reduce_min_f64(&self, value: f64) -> Result<f64, CommError> {
        Ok(-self.all_reduce_max_f64(-value)?)
    }

    /// Gather every rank's payload and hand the full, rank-ordered set to
    /// every rank.
    fn all_gather_bytes(&self, payload: Vec<u8>) -> Result<Vec<Vec<u8>>, CommError> {
        let gathered = self.gather_bytes(payload)?;
        let packed = gathered.map(|payloads| pack(&payloads));
        unpack(&self.broadcast_bytes(packed)?)
    }
}

fn decode_f64(bytes: &[u8]) -> Result<f64, CommError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| CommError::MalformedPayload {
        detail: format!("expected 8 bytes for f64, got {}", bytes.len()),
    })?;
    Ok(f64::from_le_bytes(raw))
}

/// Concatenate payloads as `u64` length + bytes records.
fn pack(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payloads.iter().map(|p| p.len() + 8).sum());
    for p in payloads {
        out.extend_from_slice(&(p.len() as u64).to_le_bytes());
        out.extend_from_slice(p);
    }
    out
}

fn unpack(mut bytes: &[u8]) -> Result<Vec<Vec<u8>>, CommError> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 8 {
            return Err(CommError::MalformedPayload {
                detail: "truncated length prefix".to_string(),
            });
        }
        let (len, rest) = bytes.split_at(8);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(len);
        let len = u64::from_le_bytes(raw) as usize;
        if rest.len() < len {
            return Err(CommError::MalformedPayload {
                detail: format!("record of {len} bytes truncated to {}", rest.len()),
            });
        }
        let (record, rest) = rest.split_at(len);
        out.push(record.to_vec());
        bytes = rest;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn unpack_recovers_packed_records(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..8)
        ) {
            // Empty records are preserved; an empty list packs to nothing.
            prop_assert_eq!(unpack(&pack(&payloads)).unwrap(), payloads);
        }
    }

    #[test]
    fn unpack_rejects_truncation() {
        let mut bytes = pack(&[vec![1, 2, 3]]);
        bytes.pop();
        assert!(matches!(
            unpack(&bytes),
            Err(CommError::MalformedPayload { .. })
        ));
    }
}
