//! End-to-end scenario 2: once the genesis coinbase matures, a block that
//! spends it is accepted and the UTXO set reflects the new owner and the
//! change output minus whatever the miner takes as fee.

mod support;

use thunderbolt_chain::parameters::COINBASE_MATURITY;
use thunderbolt_chain::transparent::OutPoint;

#[test]
fn a_mature_coinbase_output_can_be_spent() {
    let miner = support::keypair();
    let payee = support::keypair();
    let chain = support::engine_with_genesis(miner.pubkey_hash);

    // One block short of maturity the coinbase is still present but unspent;
    // advancing past `COINBASE_MATURITY` makes it spendable.
    let tip = support::advance(&chain.engine, &chain.genesis, COINBASE_MATURITY, miner.pubkey_hash);

    let coinbase_id = chain.genesis.transactions[0].hash();
    let coinbase_amount = support::subsidy(0);
    let fee = 1_000;
    let spend = support::spend(&miner, OutPoint { prev_tx_id: coinbase_id, output_index: 0 }, payee.pubkey_hash, coinbase_amount - fee);

    let next_height = chain.engine.next_height().unwrap();
    let block = thunderbolt_test_support::fixtures::child_block(
        &tip,
        0,
        miner.pubkey_hash,
        support::subsidy(next_height) + fee,
        vec![spend],
    );
    chain.engine.submit_block(block.clone()).unwrap();

    assert!(chain.engine.get_utxo(&coinbase_id, 0).unwrap().is_none());

    let spend_id = block.transactions[1].hash();
    let payee_utxo = chain.engine.get_utxo(&spend_id, 0).unwrap().unwrap();
    assert_eq!(payee_utxo.output.amount.value(), coinbase_amount - fee);

    let head = chain.engine.chain_head().unwrap().unwrap();
    assert_eq!(head, block.hash());
}
