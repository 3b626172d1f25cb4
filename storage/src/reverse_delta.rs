//! The rollback record produced whenever a block is committed (spec §3, §6):
//! enough information to undo the block's effect on the UTXO set without
//! re-validating or re-fetching anything.

use thunderbolt_chain::codec::{CodecError, Decode, Encode};
use thunderbolt_chain::{transaction, transparent::Utxo};

/// For each UTXO the block consumed, its full record (so rollback can
/// re-insert it); for each UTXO the block created, just its identifier (so
/// rollback knows what to remove).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ReverseDelta {
    pub consumed: Vec<(transaction::Hash, u32, Utxo)>,
    pub created: Vec<(transaction::Hash, u32)>,
}

impl ReverseDelta {
    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty() && self.created.is_empty()
    }
}

impl Encode for ReverseDelta {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        (self.consumed.len() as u32).encode(&mut writer)?;
        for (tx_id, index, utxo) in &self.consumed {
            tx_id.encode(&mut writer)?;
            index.encode(&mut writer)?;
            utxo.encode(&mut writer)?;
        }

        (self.created.len() as u32).encode(&mut writer)?;
        for (tx_id, index) in &self.created {
            tx_id.encode(&mut writer)?;
            index.encode(&mut writer)?;
        }
        Ok(())
    }
}

impl Decode for ReverseDelta {
    fn decode<R: std::io::Read>(mut reader: R) -> Result<Self, CodecError> {
        let consumed_count = u32::decode(&mut reader)? as usize;
        let mut consumed = Vec::with_capacity(std::cmp::min(consumed_count, 1 << 16));
        for _ in 0..consumed_count {
            let tx_id = transaction::Hash::decode(&mut reader)?;
            let index = u32::decode(&mut reader)?;
            let utxo = Utxo::decode(&mut reader)?;
            consumed.push((tx_id, index, utxo));
        }

        let created_count = u32::decode(&mut reader)? as usize;
        let mut created = Vec::with_capacity(std::cmp::min(created_count, 1 << 16));
        for _ in 0..created_count {
            let tx_id = transaction::Hash::decode(&mut reader)?;
            let index = u32::decode(&mut reader)?;
            created.push((tx_id, index));
        }

        Ok(ReverseDelta { consumed, created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;
    use thunderbolt_chain::amount::{Amount, NonNegative};
    use thunderbolt_chain::transparent::{LockingParameters, Output};

    fn sample_utxo() -> Utxo {
        Utxo {
            output: Output {
                amount: Amount::<NonNegative>::try_from(5_000u64).unwrap(),
                locking_parameters: LockingParameters::single_sig([4; 20]),
            },
            height: 12,
            is_coinbase: false,
        }
    }

    #[test]
    fn round_trips_with_both_consumed_and_created_entries() {
        let delta = ReverseDelta {
            consumed: vec![(transaction::Hash::from_bytes([1; 32]), 0, sample_utxo())],
            created: vec![(transaction::Hash::from_bytes([2; 32]), 1)],
        };

        let bytes = delta.encode_to_vec();
        let decoded = ReverseDelta::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, delta);
    }

    #[test]
    fn empty_delta_round_trips() {
        let delta = ReverseDelta::default();
        let bytes = delta.encode_to_vec();
        assert_eq!(ReverseDelta::decode(&bytes[..]).unwrap(), delta);
    }
}
