//! A `tower::Service` facade over the blockchain engine and mempool, for
//! callers (the node's network/RPC layers) that want the request/response
//! shape rather than calling the engine directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use thunderbolt_chain::block::{self, Block};
use thunderbolt_chain::parameters::COINBASE_MATURITY;
use thunderbolt_chain::transaction::Transaction;
use thunderbolt_storage::MetadataProvider;

use crate::engine::BlockchainEngine;
use crate::error::{EngineError, ValidationError};
use crate::mempool::Mempool;

pub enum Request {
    SubmitBlock(Block),
    SubmitTransaction(Transaction),
}

pub enum Response {
    BlockAccepted(block::Hash),
    TransactionAccepted(thunderbolt_chain::transaction::Hash),
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// the submitted block was rejected: {0}
    #[error("the submitted block was rejected: {0}")]
    Block(#[from] EngineError),
    /// the submitted transaction was rejected: {0}
    #[error("the submitted transaction was rejected: {0}")]
    Transaction(#[from] ValidationError),
}

/// Wires [`Request`]s to the engine and mempool. Cloning is cheap: both
/// fields are already reference-counted/internally-synchronized.
pub struct ConsensusService<M: MetadataProvider> {
    engine: Arc<BlockchainEngine<M>>,
    mempool: Arc<Mempool>,
}

impl<M: MetadataProvider> Clone for ConsensusService<M> {
    fn clone(&self) -> Self {
        ConsensusService { engine: self.engine.clone(), mempool: self.mempool.clone() }
    }
}

impl<M: MetadataProvider> ConsensusService<M> {
    pub fn new(engine: Arc<BlockchainEngine<M>>, mempool: Arc<Mempool>) -> ConsensusService<M> {
        ConsensusService { engine, mempool }
    }
}

impl<M: MetadataProvider + Send + Sync + 'static> Service<Request> for ConsensusService<M> {
    type Response = Response;
    type Error = ServiceError;
    #[allow(clippy::type_complexity)]
    type Future = Pin<Box<dyn Future<Output = Result<Response, ServiceError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let engine = self.engine.clone();
        let mempool = self.mempool.clone();

        Box::pin(async move {
            match request {
                Request::SubmitBlock(block) => {
                    let block_id = engine.submit_block(block)?;
                    Ok(Response::BlockAccepted(block_id))
                }
                Request::SubmitTransaction(tx) => {
                    let tx_id = tx.hash();
                    let height = engine.next_height()?;
                    engine.with_utxo_view(|utxos| mempool.add(tx, utxos, height, COINBASE_MATURITY))?;
                    Ok(Response::TransactionAccepted(tx_id))
                }
            }
        })
    }
}
