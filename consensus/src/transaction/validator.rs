use std::collections::HashSet;
use std::convert::TryFrom;

use thunderbolt_chain::amount::{Amount, NonNegative};
use thunderbolt_chain::crypto::ecdsa;
use thunderbolt_chain::parameters::MAX_TX_SIZE;
use thunderbolt_chain::transaction::{self, Transaction};
use thunderbolt_chain::transparent::{LockingParameters, MultiSigUnlock, OutPoint, UnlockingParameters, Utxo};

use crate::error::ValidationError;
use crate::subsidy;

/// A read-only view onto the UTXO set the validator checks inputs against.
/// Implemented by [`thunderbolt_storage::PersistenceService`] for production
/// use, and by the mempool's own pending-spend view when a transaction is
/// revalidated against unconfirmed state.
pub trait UtxoView {
    fn get_utxo(&self, tx_id: &transaction::Hash, index: u32) -> Result<Option<Utxo>, ValidationError>;
}

impl<M: thunderbolt_storage::MetadataProvider> UtxoView for thunderbolt_storage::PersistenceService<M> {
    fn get_utxo(&self, tx_id: &transaction::Hash, index: u32) -> Result<Option<Utxo>, ValidationError> {
        Ok(thunderbolt_storage::PersistenceService::get_utxo(self, tx_id, index)?)
    }
}

/// The preimage a single- or multi-sig unlock signs: the transaction's
/// serialization with every input's `unlocking_parameters` replaced by an
/// empty placeholder of the same kind, so a signature never has to commit
/// to signatures gathered after it (including its own). `crypto::ecdsa`
/// takes the double-SHA256 of this itself, so this returns the preimage
/// rather than pre-hashing it — hashing it here too would sign
/// double-SHA256(double-SHA256(tx)) instead of the double-SHA256 the spec
/// names as the signed message.
pub fn signing_message(tx: &Transaction) -> Vec<u8> {
    let mut stripped = tx.clone();
    for input in &mut stripped.inputs {
        input.unlocking_parameters = match &input.unlocking_parameters {
            UnlockingParameters::SingleSig { .. } => {
                UnlockingParameters::SingleSig { pubkey: [0; 33], signature: Vec::new() }
            }
            UnlockingParameters::MultiSig(_) => UnlockingParameters::MultiSig(MultiSigUnlock::new()),
        };
    }
    stripped.encode_to_vec()
}

fn sum_outputs(outputs: &[thunderbolt_chain::transparent::Output]) -> Result<Amount<NonNegative>, ValidationError> {
    let mut total = Amount::<NonNegative>::zero();
    for output in outputs {
        if output.amount.value() < 1 {
            return Err(ValidationError::InvalidOutputAmount(output.amount.value()));
        }
        total = (total + output.amount).map_err(|_| ValidationError::AmountOverflow)?;
    }
    Ok(total)
}

/// Validates `tx` against structural rules, context-dependent rules (the
/// referenced UTXOs, coinbase maturity, and either the coinbase subsidy cap
/// or signature verification), and returns the fee a non-coinbase
/// transaction pays (zero for a coinbase, which has no "fee" of its own).
///
/// `is_coinbase_position` is true only when validating the first
/// transaction of a block under assembly or review; `aggregate_fees` is the
/// sum of every other transaction's fee in that same block, used to check
/// the coinbase does not overpay.
pub fn validate_transaction<V: UtxoView>(
    tx: &Transaction,
    utxos: &V,
    height: u32,
    is_coinbase_position: bool,
    aggregate_fees: Amount<NonNegative>,
    coinbase_maturity: u32,
) -> Result<Amount<NonNegative>, ValidationError> {
    if tx.inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(ValidationError::NoOutputs);
    }
    let size = tx.serialized_len();
    if size as u64 > MAX_TX_SIZE {
        return Err(ValidationError::OversizeTx(size, MAX_TX_SIZE));
    }

    let output_total = sum_outputs(&tx.outputs)?;

    let mut seen_outpoints: HashSet<OutPoint> = HashSet::new();
    for input in &tx.inputs {
        if !seen_outpoints.insert(input.outpoint) {
            return Err(ValidationError::DuplicateInput(input.outpoint.prev_tx_id, input.outpoint.output_index));
        }
    }

    if tx.is_coinbase() {
        if !is_coinbase_position {
            return Err(ValidationError::UnexpectedCoinbase);
        }
        let allowed = (subsidy::subsidy(height) + aggregate_fees).map_err(|_| ValidationError::AmountOverflow)?;
        if output_total.value() > allowed.value() {
            return Err(ValidationError::CoinbaseOverpays(output_total.value(), allowed.value()));
        }
        return Ok(Amount::zero());
    }

    if is_coinbase_position {
        return Err(ValidationError::MissingCoinbase);
    }

    let message = signing_message(tx);
    let mut input_total = Amount::<NonNegative>::zero();

    for input in &tx.inputs {
        let utxo = utxos
            .get_utxo(&input.outpoint.prev_tx_id, input.outpoint.output_index)?
            .ok_or_else(|| ValidationError::MissingUtxo(input.outpoint.prev_tx_id, input.outpoint.output_index))?;

        if !utxo.is_spendable_at(height, coinbase_maturity) {
            return Err(ValidationError::ImmatureCoinbase);
        }

        verify_unlock(&utxo, input, &message)?;

        input_total = (input_total + utxo.output.amount).map_err(|_| ValidationError::AmountOverflow)?;
    }

    let fee = (input_total - output_total).map_err(|_| ValidationError::AmountOverflow)?;
    Amount::<NonNegative>::try_from(fee.value()).map_err(|_| ValidationError::InsufficientInputs)
}

fn verify_unlock(
    utxo: &Utxo,
    input: &thunderbolt_chain::transparent::Input,
    message: &[u8],
) -> Result<(), ValidationError> {
    match (&utxo.output.locking_parameters, &input.unlocking_parameters) {
        (LockingParameters::SingleSig { pubkey_hash }, UnlockingParameters::SingleSig { pubkey, signature }) => {
            let sha = thunderbolt_chain::crypto::sha256::digest(&pubkey[..]);
            let derived_hash = thunderbolt_chain::crypto::ripemd160::digest(&sha);
            if derived_hash != *pubkey_hash || !ecdsa::verify_single(pubkey, message, signature) {
                return Err(ValidationError::BadSignature);
            }
            Ok(())
        }
        (LockingParameters::MultiSig { required, pubkeys }, UnlockingParameters::MultiSig(unlock)) => {
            if ecdsa::verify_multi(*required, pubkeys, unlock.signatures(), message) {
                Ok(())
            } else {
                Err(ValidationError::BadSignature)
            }
        }
        _ => Err(ValidationError::LockingKindMismatch),
    }
}
