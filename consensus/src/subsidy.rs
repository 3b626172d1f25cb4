//! Block subsidy: the halving schedule a coinbase transaction's total
//! output may not exceed (plus the block's collected fees).

use std::convert::TryFrom;

use thunderbolt_chain::amount::{Amount, NonNegative};

/// Height interval between subsidy halvings.
pub const HALVING_INTERVAL: u32 = 210_000;

/// The subsidy paid at height 0, before any halving.
pub const INITIAL_SUBSIDY: i64 = 50 * thunderbolt_chain::amount::COIN;

/// The block subsidy at `height`: halved every [`HALVING_INTERVAL`] blocks,
/// floored at zero once the reward has halved away to nothing.
pub fn subsidy(height: u32) -> Amount<NonNegative> {
    let halvings = height / HALVING_INTERVAL;
    if halvings >= 64 {
        return Amount::zero();
    }
    let value = INITIAL_SUBSIDY >> halvings;
    Amount::try_from(value).expect("a halved initial subsidy never exceeds MAX_MONEY")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_pays_the_initial_subsidy() {
        assert_eq!(subsidy(0).value(), INITIAL_SUBSIDY);
    }

    #[test]
    fn halves_on_schedule() {
        assert_eq!(subsidy(HALVING_INTERVAL).value(), INITIAL_SUBSIDY / 2);
        assert_eq!(subsidy(HALVING_INTERVAL * 2).value(), INITIAL_SUBSIDY / 4);
    }

    #[test]
    fn eventually_reaches_zero() {
        assert_eq!(subsidy(HALVING_INTERVAL * 64).value(), 0);
    }
}
