//! Shared helpers for the end-to-end scenario tests in this directory:
//! a signing keypair, a genesis-bootstrapped engine, and a way to pad the
//! chain out to a given height with filler blocks so coinbase-maturity
//! rules can be satisfied without hand-mining a hundred blocks per test.

#![allow(dead_code)]

use std::convert::TryFrom;

use secp256k1::rand::rngs::OsRng;
use secp256k1::{Secp256k1, SecretKey};

use thunderbolt_chain::amount::{Amount, NonNegative};
use thunderbolt_chain::block::Block;
use thunderbolt_chain::crypto::ecdsa;
use thunderbolt_chain::parameters::Network;
use thunderbolt_chain::transaction::Transaction;
use thunderbolt_chain::transparent::{Input, LockingParameters, OutPoint, Output, UnlockingParameters};
use thunderbolt_consensus::engine::BlockchainEngine;
use thunderbolt_storage::metadata::memory::InMemoryMetadataProvider;
use thunderbolt_test_support::fixtures::{child_block, ephemeral_persistence, genesis_block, EphemeralPersistence};

/// A secp256k1 keypair plus the pubkey hash a `SingleSig` output would lock
/// to, for building and signing spends in these tests.
pub struct Keypair {
    pub secret_key: SecretKey,
    pub pubkey: [u8; 33],
    pub pubkey_hash: [u8; 20],
}

pub fn keypair() -> Keypair {
    let secp = Secp256k1::new();
    let mut rng = OsRng::new().expect("OS rng available");
    let (secret_key, public_key) = secp.generate_keypair(&mut rng);
    let pubkey = public_key.serialize();
    let sha = thunderbolt_chain::crypto::sha256::digest(&pubkey[..]);
    let pubkey_hash = thunderbolt_chain::crypto::ripemd160::digest(&sha);
    Keypair { secret_key, pubkey, pubkey_hash }
}

/// Builds an unsigned single-input, single-output spend of `outpoint`,
/// signs it with `from`, and returns the finished transaction.
pub fn spend(from: &Keypair, outpoint: OutPoint, to: [u8; 20], amount: i64) -> Transaction {
    let mut tx = Transaction {
        version: 1,
        inputs: vec![Input {
            outpoint,
            unlocking_parameters: UnlockingParameters::SingleSig { pubkey: from.pubkey, signature: Vec::new() },
            sequence: 0xffff_ffff,
        }],
        outputs: vec![Output {
            amount: Amount::<NonNegative>::try_from(amount).expect("test amounts stay within range"),
            locking_parameters: LockingParameters::single_sig(to),
        }],
        lock_time: 0,
    };

    let message = thunderbolt_consensus::transaction::signing_message(&tx);
    let signature = ecdsa::sign(&from.secret_key, &message).serialize_der().to_vec();
    if let UnlockingParameters::SingleSig { signature: slot, .. } = &mut tx.inputs[0].unlocking_parameters {
        *slot = signature;
    }
    tx
}

/// A running engine plus the temp-directory guard keeping its backing
/// files alive for the test's duration.
pub struct TestChain {
    pub engine: BlockchainEngine<InMemoryMetadataProvider>,
    pub genesis: Block,
    _persistence: EphemeralPersistence,
}

/// An engine over an in-memory metadata provider, bootstrapped with a
/// genesis block whose sole coinbase output pays `genesis_reward_to`.
pub fn engine_with_genesis(genesis_reward_to: [u8; 20]) -> TestChain {
    let persistence = ephemeral_persistence();
    let engine = BlockchainEngine::new(persistence.service, Network::Mainnet);
    let genesis = genesis_block(genesis_reward_to, subsidy(0), 1_700_000_000);
    engine.bootstrap_genesis(genesis.clone()).unwrap();
    TestChain { engine, genesis, _persistence: persistence }
}

/// Submits `count` filler blocks (coinbase only, no other transactions)
/// extending `tip`, each paying the subsidy to `reward_to`. Returns the
/// last block submitted.
pub fn advance(engine: &BlockchainEngine<InMemoryMetadataProvider>, tip: &Block, count: u32, reward_to: [u8; 20]) -> Block {
    let mut current = tip.clone();
    for i in 0..count {
        let next_height = engine.next_height().unwrap();
        let next = child_block(&current, i, reward_to, subsidy(next_height), Vec::new());
        engine.submit_block(next.clone()).unwrap();
        current = next;
    }
    current
}

pub fn subsidy(height: u32) -> i64 {
    thunderbolt_consensus::subsidy::subsidy(height).value()
}
