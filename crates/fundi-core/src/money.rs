//! # Money — Minor-Unit Amounts
//!
//! Defines `MoneyAmount`, a non-negative count of minor currency units
//! (e.g., centimes of XOF). All fund arithmetic in the engine goes through
//! this type.
//!
//! ## Invariants
//!
//! - Amounts are never negative: subtraction that would go below zero is
//!   rejected, not saturated.
//! - Amounts are never floating point. Commission and split computations
//!   use integer basis-point arithmetic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from money arithmetic.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MoneyError {
    /// Subtraction would produce a negative amount.
    #[error("amount underflow: cannot take {subtrahend} from {minuend}")]
    Underflow {
        /// The amount being subtracted from.
        minuend: u64,
        /// The amount being subtracted.
        subtrahend: u64,
    },

    /// Addition overflowed the minor-unit counter.
    #[error("amount overflow adding {lhs} and {rhs}")]
    Overflow {
        /// Left operand in minor units.
        lhs: u64,
        /// Right operand in minor units.
        rhs: u64,
    },
}

/// A non-negative amount of money in minor currency units.
///
/// The engine is currency-agnostic: every escrow settles in the platform
/// currency and the unit is whatever the smallest denomination is. There is
/// deliberately no `From<f64>` — float money cannot exist in this codebase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MoneyAmount(u64);

impl MoneyAmount {
    /// The zero amount.
    pub const ZERO: MoneyAmount = MoneyAmount(0);

    /// Construct from a count of minor units.
    pub const fn from_minor(units: u64) -> Self {
        Self(units)
    }

    /// The raw minor-unit count.
    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: MoneyAmount) -> Result<MoneyAmount, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(MoneyAmount)
            .ok_or(MoneyError::Overflow {
                lhs: self.0,
                rhs: other.0,
            })
    }

    /// Checked subtraction. Rejects results below zero.
    pub fn checked_sub(self, other: MoneyAmount) -> Result<MoneyAmount, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(MoneyAmount)
            .ok_or(MoneyError::Underflow {
                minuend: self.0,
                subtrahend: other.0,
            })
    }

    /// The smaller of two amounts.
    pub fn min(self, other: MoneyAmount) -> MoneyAmount {
        MoneyAmount(self.0.min(other.0))
    }

    /// Integer basis-point share of this amount, rounded down.
    ///
    /// Used for commission derivation: `amount.share_bps(1000)` is 10%.
    /// Computed in u128 so the intermediate product cannot overflow.
    pub fn share_bps(self, bps: u32) -> MoneyAmount {
        let share = (u128::from(self.0) * u128::from(bps)) / 10_000;
        // share <= self.0 for any bps <= 10_000; larger rates are clamped.
        MoneyAmount(u64::try_from(share).unwrap_or(self.0).min(self.0))
    }
}

impl std::fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
