//! Single-denomination amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer amount tagged with its denomination.
///
/// All balance arithmetic in the engine goes through the checked helpers;
/// an underflow is a logic error surfaced to the caller, never silently
/// wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Subtract `amount`, returning `None` on underflow.
    pub fn checked_sub(&self, amount: u128) -> Option<Coin> {
        Some(Coin::new(self.denom.clone(), self.amount.checked_sub(amount)?))
    }

    /// Integer floor division of the amount.
    pub fn div_floor(&self, divisor: u128) -> u128 {
        self.amount / divisor
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}
