//! A typed monetary amount, so that a negative or over-range value can never
//! silently flow into a transaction output.

use crate::codec::{CodecError, Decode, Encode};
use std::convert::TryFrom;
use std::marker::PhantomData;

/// One whole unit of currency, in the smallest indivisible subunit.
pub const COIN: i64 = 100_000_000;

/// The maximum amount of currency that can ever exist in one place (inputs,
/// outputs, or a transaction total), matching Bitcoin's 21 million coin cap.
pub const MAX_MONEY: i64 = 21_000_000 * COIN;

/// A constraint on the range an [`Amount`] may hold.
pub trait Constraint: Clone + Copy {
    fn validate(value: i64) -> Result<(), AmountError>;
}

/// Amounts used for transaction outputs, UTXOs, and subsidies: `1..=MAX_MONEY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonNegative;

impl Constraint for NonNegative {
    fn validate(value: i64) -> Result<(), AmountError> {
        if value < 0 {
            Err(AmountError::Negative(value))
        } else if value > MAX_MONEY {
            Err(AmountError::TooLarge(value))
        } else {
            Ok(())
        }
    }
}

/// Amounts used for intermediate computations (e.g. fees) that may be
/// negative transiently before being checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegativeAllowed;

impl Constraint for NegativeAllowed {
    fn validate(value: i64) -> Result<(), AmountError> {
        if value.abs() > MAX_MONEY {
            Err(AmountError::TooLarge(value))
        } else {
            Ok(())
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    /// amount {0} is negative
    #[error("amount {0} is negative")]
    Negative(i64),
    /// amount {0} exceeds MAX_MONEY
    #[error("amount {0} exceeds MAX_MONEY")]
    TooLarge(i64),
    /// arithmetic overflowed while combining amounts
    #[error("arithmetic overflowed while combining amounts")]
    Overflow,
}

#[derive(Clone, Copy, Eq, serde::Serialize, serde::Deserialize)]
pub struct Amount<C: Constraint>(i64, #[serde(skip)] PhantomData<C>);

impl<C: Constraint> Amount<C> {
    pub fn zero() -> Amount<C> {
        Amount(0, PhantomData)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn constrain<C2: Constraint>(self) -> Result<Amount<C2>, AmountError> {
        Amount::<C2>::try_from(self.0)
    }
}

impl<C: Constraint> TryFrom<i64> for Amount<C> {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        C::validate(value)?;
        Ok(Amount(value, PhantomData))
    }
}

impl<C: Constraint> TryFrom<u64> for Amount<C> {
    type Error = AmountError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let value = i64::try_from(value).map_err(|_| AmountError::TooLarge(i64::MAX))?;
        Self::try_from(value)
    }
}

impl<C: Constraint> std::fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Amount").field(&self.0).finish()
    }
}

impl<C: Constraint> PartialEq for Amount<C> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<C: Constraint> std::hash::Hash for Amount<C> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<C: Constraint> std::ops::Add for Amount<C> {
    type Output = Result<Amount<C>, AmountError>;

    fn add(self, rhs: Self) -> Self::Output {
        let sum = self.0.checked_add(rhs.0).ok_or(AmountError::Overflow)?;
        Amount::try_from(sum)
    }
}

impl<C: Constraint> std::ops::Sub for Amount<C> {
    type Output = Result<Amount<NegativeAllowed>, AmountError>;

    fn sub(self, rhs: Self) -> Self::Output {
        let diff = self.0.checked_sub(rhs.0).ok_or(AmountError::Overflow)?;
        Amount::<NegativeAllowed>::try_from(diff)
    }
}

impl Encode for Amount<NonNegative> {
    fn encode<W: std::io::Write>(&self, mut writer: W) -> std::io::Result<()> {
        (self.0 as u64).encode(&mut writer)
    }
}

impl Decode for Amount<NonNegative> {
    fn decode<R: std::io::Read>(reader: R) -> Result<Self, CodecError> {
        let raw = u64::decode(reader)?;
        Amount::try_from(raw).map_err(|_| CodecError::Parse("amount out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative() {
        assert!(Amount::<NonNegative>::try_from(-1i64).is_err());
    }

    #[test]
    fn rejects_over_max_money() {
        assert!(Amount::<NonNegative>::try_from(MAX_MONEY + 1).is_err());
    }

    #[test]
    fn addition_detects_overflow() {
        let a = Amount::<NonNegative>::try_from(MAX_MONEY).unwrap();
        let b = Amount::<NonNegative>::try_from(1i64).unwrap();
        assert!((a + b).is_err());
    }

    #[test]
    fn round_trip() {
        let amount = Amount::<NonNegative>::try_from(5_000_000_000i64).unwrap();
        let mut buf = Vec::new();
        amount.encode(&mut buf).unwrap();
        let decoded = Amount::<NonNegative>::decode(&buf[..]).unwrap();
        assert_eq!(amount, decoded);
    }
}
