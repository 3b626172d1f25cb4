//! End-to-end scenario 4: once a mempool has accepted a spend of a given
//! output, a second transaction spending that same output is rejected.

mod support;

use thunderbolt_chain::parameters::COINBASE_MATURITY;
use thunderbolt_chain::transparent::OutPoint;
use thunderbolt_consensus::error::ValidationError;
use thunderbolt_consensus::mempool::Mempool;

#[test]
fn a_second_spend_of_an_already_mempooled_output_is_rejected() {
    let miner = support::keypair();
    let alice = support::keypair();
    let bob = support::keypair();
    let chain = support::engine_with_genesis(miner.pubkey_hash);
    support::advance(&chain.engine, &chain.genesis, COINBASE_MATURITY, miner.pubkey_hash);

    let coinbase_id = chain.genesis.transactions[0].hash();
    let coinbase_amount = support::subsidy(0);
    let outpoint = OutPoint { prev_tx_id: coinbase_id, output_index: 0 };

    let first = support::spend(&miner, outpoint, alice.pubkey_hash, coinbase_amount - 1_000);
    let second = support::spend(&miner, outpoint, bob.pubkey_hash, coinbase_amount - 2_000);

    let mempool = Mempool::new();
    let height = chain.engine.next_height().unwrap();

    chain.engine.with_utxo_view(|utxos| mempool.add(first.clone(), utxos, height, COINBASE_MATURITY)).unwrap();
    assert!(mempool.contains(&first.hash()));

    let result = chain.engine.with_utxo_view(|utxos| mempool.add(second.clone(), utxos, height, COINBASE_MATURITY));
    assert!(matches!(result, Err(ValidationError::DuplicateInput(id, index)) if id == coinbase_id && index == 0));
    assert!(!mempool.contains(&second.hash()));
}
