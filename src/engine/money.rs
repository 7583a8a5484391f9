use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::Error;
use super::Decimal;

/// Number of minor units in one major unit.
const CENTS_PER_UNIT: u64 = 100;

/// Maximum number of fractional digits accepted when parsing a human amount.
const MAX_SCALE: u32 = 2;

/// A non-negative amount of money in minor units (cents).
///
/// All ledger arithmetic happens on integers; `Decimal` is only used at the edge
/// to parse what a human typed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the raw number of minor units
    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    pub fn checked_sub(self, other: Cents) -> Option<Cents> {
        self.0.checked_sub(other.0).map(Cents)
    }

    /// Parse a human amount such as `"12.5"` or `"100"` into cents.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let decimal = Decimal::from_str(input.trim()).map_err(|_| Error::invalid_amount(input))?;
        Cents::try_from(decimal)
    }
}

impl TryFrom<Decimal> for Cents {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let mut normalized = value.normalize();
        if normalized < Decimal::ZERO || normalized.scale() > MAX_SCALE {
            return Err(Error::invalid_amount(value));
        }
        normalized.rescale(MAX_SCALE);
        u64::try_from(normalized.mantissa())
            .map(Cents)
            .map_err(|_| Error::invalid_amount(value))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / CENTS_PER_UNIT,
            self.0 % CENTS_PER_UNIT
        )
    }
}
