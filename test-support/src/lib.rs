//! Shared test fixtures and harness setup for the Thunderbolt workspace: a
//! tracing/color-eyre test harness initializer every crate's tests share,
//! plus chain-data builders (`fixtures`) so integration tests don't each
//! reinvent a genesis block and a coinbase transaction.

pub mod fixtures;

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `color-eyre` panic/error report hook and a `tracing`
/// subscriber that writes through the test harness's captured output.
/// Idempotent — later calls from other tests in the same binary are no-ops.
pub fn init() {
    INIT.call_once(|| {
        let _ = color_eyre::install();
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
