use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Currency an account (or a money amount) is denominated in.
///
/// The aggregate balance is always reported in [`Currency::Usd`]; everything
/// else is converted through a [`RateProvider`](crate::RateProvider) at
/// reconciliation time.
///
/// ## Minor units
///
/// The engine stores monetary values as an `i64` number of **minor units**
/// (see [`Money`](crate::Money)). `minor_units()` returns how many decimal
/// digits separate major from minor units: `10.50 USD` ⇄ `1050`. The crypto
/// currencies are stored with 8 fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Uah,
    #[default]
    Usd,
    Eur,
    Btc,
    Eth,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Uah => "UAH",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
        }
    }

    /// Number of fraction digits used when converting between major and
    /// minor units.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Currency::Uah | Currency::Usd | Currency::Eur => 2,
            Currency::Btc | Currency::Eth => 8,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UAH" => Ok(Currency::Uah),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "BTC" => Ok(Currency::Btc),
            "ETH" => Ok(Currency::Eth),
            other => Err(EngineError::InvalidAmount(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
