//! Fixed-point amounts
//!
//! In memory every amount is a [`Decimal`]; at rest it is an INTEGER count of
//! micro-units (1 unit = 1_000_000 micros) so that balance credits can be a
//! single `balance = balance + ?` statement.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Decimal places kept at rest
pub const SCALE: u32 = 6;

const MICROS_PER_UNIT: i64 = 1_000_000;

/// A currency amount (or percentage) with six decimal places of precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Build from a decimal, truncating anything past six places
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero))
    }

    pub fn from_micros(micros: i64) -> Self {
        Self(Decimal::new(micros, SCALE))
    }

    /// Integer micro-units, `None` on overflow
    pub fn to_micros(&self) -> Option<i64> {
        (self.0 * Decimal::from(MICROS_PER_UNIT)).trunc().to_i64()
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `self * percent / 100`, rounded toward zero so a payout never
    /// exceeds the exact share
    pub fn percent_of(&self, percent: Amount) -> Amount {
        Amount::new(self.0 * percent.0 / Decimal::ONE_HUNDRED)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<i64> for Amount {
    /// Whole units
    fn from(units: i64) -> Self {
        Amount(Decimal::from(units))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(feature = "db")]
mod db {
    use super::Amount;
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
    use sqlx::{Database, Decode, Encode, Sqlite, Type};

    impl Type<Sqlite> for Amount {
        fn type_info() -> SqliteTypeInfo {
            <i64 as Type<Sqlite>>::type_info()
        }

        fn compatible(ty: &SqliteTypeInfo) -> bool {
            <i64 as Type<Sqlite>>::compatible(ty)
        }
    }

    impl<'q> Encode<'q, Sqlite> for Amount {
        fn encode_by_ref(
            &self,
            buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
        ) -> Result<IsNull, BoxDynError> {
            let micros = self
                .to_micros()
                .ok_or_else(|| format!("amount {} overflows micro-units", self))?;
            <i64 as Encode<'q, Sqlite>>::encode_by_ref(&micros, buf)
        }
    }

    impl<'r> Decode<'r, Sqlite> for Amount {
        fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
            let micros = <i64 as Decode<'r, Sqlite>>::decode(value)?;
            Ok(Amount::from_micros(micros))
        }
    }
}
