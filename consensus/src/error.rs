//! The three disjoint error families spec §7 describes: validation
//! rejection (`ValidationError`, `BlockError`), storage failure
//! (propagated from `thunderbolt_storage::StoreError`), and the
//! engine-level failures that can only arise from orchestrating the two
//! (`EngineError`).

use thunderbolt_chain::{block, transaction};
use thunderbolt_storage::StoreError;

/// Why a transaction was rejected by the validator or the mempool. Every
/// variant here is a consensus rejection: the caller is told why, the
/// transaction is discarded, and no persisted state changes — except
/// `Storage`, which is a transient/storage failure masquerading as a
/// validation call result only because the validator's UTXO lookups go
/// through the same fallible interface as everything else.
#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    /// transaction has no inputs
    #[error("transaction has no inputs")]
    NoInputs,
    /// transaction has no outputs
    #[error("transaction has no outputs")]
    NoOutputs,
    /// transaction serialized size {0} exceeds the {1}-byte limit
    #[error("transaction serialized size {0} exceeds the {1}-byte limit")]
    OversizeTx(usize, u64),
    /// output amount {0} is outside the valid 1..=MAX_MONEY range
    #[error("output amount {0} is outside the valid 1..=MAX_MONEY range")]
    InvalidOutputAmount(i64),
    /// summing transaction amounts overflowed or exceeded MAX_MONEY
    #[error("summing transaction amounts overflowed or exceeded MAX_MONEY")]
    AmountOverflow,
    /// input (tx {0}, index {1}) is referenced more than once
    #[error("input (tx {0}, index {1}) is referenced more than once")]
    DuplicateInput(transaction::Hash, u32),
    /// input (tx {0}, index {1}) does not reference a known unspent output
    #[error("input (tx {0}, index {1}) does not reference a known unspent output")]
    MissingUtxo(transaction::Hash, u32),
    /// input spends a coinbase output before it has matured
    #[error("input spends a coinbase output before it has matured")]
    ImmatureCoinbase,
    /// unlocking parameters do not match the referenced output's locking kind
    #[error("unlocking parameters do not match the referenced output's locking kind")]
    LockingKindMismatch,
    /// signature verification failed
    #[error("signature verification failed")]
    BadSignature,
    /// sum of inputs is less than sum of outputs
    #[error("sum of inputs is less than sum of outputs")]
    InsufficientInputs,
    /// coinbase outputs total {0} but subsidy plus fees is only {1}
    #[error("coinbase outputs total {0} but subsidy plus fees is only {1}")]
    CoinbaseOverpays(i64, i64),
    /// a coinbase transaction may only appear as the first transaction of a block
    #[error("a coinbase transaction may only appear as the first transaction of a block")]
    UnexpectedCoinbase,
    /// the first transaction of a block must be a coinbase transaction
    #[error("the first transaction of a block must be a coinbase transaction")]
    MissingCoinbase,
    /// transaction is already present in the mempool
    #[error("transaction is already present in the mempool")]
    AlreadyInMempool,
    /// a storage operation failed while validating: {0}
    #[error("a storage operation failed while validating: {0}")]
    Storage(#[from] StoreError),
}

/// Why header or body validation rejected a submitted block (spec §4.8
/// steps 2–3).
#[derive(thiserror::Error, Debug)]
pub enum BlockError {
    /// block {0} is already known
    #[error("block {0} is already known")]
    AlreadyKnown(block::Hash),
    /// parent block {0} is not known to this node
    #[error("parent block {0} is not known to this node")]
    UnknownParent(block::Hash),
    /// timestamp is more than the allowed window ahead of the local clock
    #[error("timestamp is more than the allowed window ahead of the local clock")]
    TimestampTooFarInFuture,
    /// target difficulty does not match the expected retarget
    #[error("target difficulty does not match the expected retarget")]
    WrongDifficulty,
    /// block hash does not satisfy its target difficulty
    #[error("block hash does not satisfy its target difficulty")]
    ProofOfWorkInvalid,
    /// block has no transactions
    #[error("block has no transactions")]
    NoTransactions,
    /// merkle root does not commit to the block's transactions
    #[error("merkle root does not commit to the block's transactions")]
    BadMerkleRoot,
    /// block serialized size {0} exceeds the {1}-byte limit
    #[error("block serialized size {0} exceeds the {1}-byte limit")]
    OversizeBlock(usize, u64),
    /// a transaction in the block failed validation: {0}
    #[error("a transaction in the block failed validation: {0}")]
    Transaction(#[from] ValidationError),
    /// a storage operation failed while validating: {0}
    #[error("a storage operation failed while validating: {0}")]
    Storage(#[from] StoreError),
}

/// Failures that can arise only while the blockchain engine orchestrates
/// validation and persistence together — a single block's validation
/// failure is a [`BlockError`]; this is for the state machine around it.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// the submitted block failed validation: {0}
    #[error("the submitted block failed validation: {0}")]
    InvalidBlock(#[from] BlockError),
    /// reorganization to the new best chain failed and was rolled back: {0}
    #[error("reorganization to the new best chain failed and was rolled back: {0}")]
    ReorganizationFailed(String),
    /// a storage operation failed: {0}
    #[error("a storage operation failed: {0}")]
    Storage(#[from] StoreError),
}
