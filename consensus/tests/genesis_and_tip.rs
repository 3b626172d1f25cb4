//! End-to-end scenario 1: bootstrapping from genesis and extending the
//! chain by one block lands the expected chain head, height, and UTXO set.

mod support;

use thunderbolt_storage::metadata::BlockStatus;

#[test]
fn genesis_bootstraps_at_height_zero_with_its_coinbase_spendable() {
    let miner = support::keypair();
    let chain = support::engine_with_genesis(miner.pubkey_hash);

    let head = chain.engine.chain_head().unwrap().unwrap();
    assert_eq!(head, chain.genesis.hash());

    let metadata = chain.engine.block_metadata(&head).unwrap().unwrap();
    assert_eq!(metadata.height, 0);
    assert_eq!(metadata.status, BlockStatus::OnMainChain);

    let coinbase_id = chain.genesis.transactions[0].hash();
    let utxo = chain.engine.get_utxo(&coinbase_id, 0).unwrap().unwrap();
    assert_eq!(utxo.output.amount.value(), support::subsidy(0));
}

#[test]
fn one_block_on_top_of_genesis_advances_the_head_and_height() {
    let miner = support::keypair();
    let chain = support::engine_with_genesis(miner.pubkey_hash);

    let tip = support::advance(&chain.engine, &chain.genesis, 1, miner.pubkey_hash);

    let head = chain.engine.chain_head().unwrap().unwrap();
    assert_eq!(head, tip.hash());

    let metadata = chain.engine.block_metadata(&head).unwrap().unwrap();
    assert_eq!(metadata.height, 1);
    assert_eq!(metadata.status, BlockStatus::OnMainChain);

    let genesis_metadata = chain.engine.block_metadata(&chain.genesis.hash()).unwrap().unwrap();
    assert_eq!(genesis_metadata.status, BlockStatus::OnMainChain);
}
