//! Currency normalization collaborators.
//!
//! The aggregate balance is kept in USD; account balances in other
//! currencies are converted through a [`RateProvider`] while the unit of
//! work is open. Providers are fallible by contract: the engine maps any
//! failure to [`EngineError::ConversionFailure`](crate::EngineError) and
//! rolls the whole operation back.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{Currency, Money};

/// Failure reported by a [`RateProvider`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct RateError(pub String);

/// Converts amounts into the reporting currency.
///
/// Implementations must be sign-preserving: a negative input amount yields a
/// negative output value.
#[async_trait]
pub trait RateProvider: Send + Sync + std::fmt::Debug {
    /// The currency every conversion lands in.
    fn reporting_currency(&self) -> Currency {
        Currency::Usd
    }

    /// Converts `amount` minor units of `currency` into minor units of the
    /// reporting currency.
    async fn to_reporting(&self, currency: Currency, amount: Money) -> Result<Money, RateError>;
}

/// In-process provider with a fixed conversion table.
///
/// Rates are major-unit factors: `1` source major unit equals `rate`
/// reporting major units. USD converts at identity unless overridden.
#[derive(Debug, Default)]
pub struct FixedRates {
    rates: HashMap<Currency, Decimal>,
}

impl FixedRates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.rates.insert(currency, rate);
        self
    }
}

#[async_trait]
impl RateProvider for FixedRates {
    async fn to_reporting(&self, currency: Currency, amount: Money) -> Result<Money, RateError> {
        let rate = match self.rates.get(&currency) {
            Some(rate) => *rate,
            None if currency == self.reporting_currency() => Decimal::ONE,
            None => {
                return Err(RateError(format!("no rate for {}", currency.code())));
            }
        };

        let value = amount
            .to_major(currency)
            .checked_mul(rate)
            .ok_or_else(|| RateError(format!("rate overflow for {}", currency.code())))?;
        Money::from_major(value, self.reporting_currency())
            .ok_or_else(|| RateError(format!("converted amount out of range for {}", currency.code())))
    }
}

/// Provider that fails every conversion. Used to exercise rollback paths.
#[derive(Debug, Default)]
pub struct FailingRates;

#[async_trait]
impl RateProvider for FailingRates {
    async fn to_reporting(&self, currency: Currency, _amount: Money) -> Result<Money, RateError> {
        Err(RateError(format!(
            "rate service unavailable for {}",
            currency.code()
        )))
    }
}

#[derive(Debug, Deserialize)]
struct ConvertValue {
    value: Decimal,
}

#[derive(Debug, Deserialize)]
struct ConvertData {
    #[serde(rename = "USD")]
    usd: ConvertValue,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    data: ConvertData,
}

/// Live provider backed by the currencyapi.com `/v3/convert` endpoint.
///
/// The remote API only converts non-negative values, so the sign is stripped
/// before the call and restored on the result.
#[derive(Debug)]
pub struct CurrencyApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CurrencyApiClient {
    const BASE_URL: &'static str = "https://api.currencyapi.com";

    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: Self::BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the API origin (tests point this at a local server).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl RateProvider for CurrencyApiClient {
    async fn to_reporting(&self, currency: Currency, amount: Money) -> Result<Money, RateError> {
        let negative = amount.is_negative();
        let magnitude = if negative { -amount } else { amount };

        let url = format!("{}/v3/convert", self.base_url);
        let value = magnitude.to_major(currency).to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("currencies", self.reporting_currency().code()),
                ("base_currency", currency.code()),
                ("value", value.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RateError(format!("conversion request failed: {err}")))?
            .error_for_status()
            .map_err(|err| RateError(format!("conversion request failed: {err}")))?;

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|err| RateError(format!("invalid conversion response: {err}")))?;

        let value = if negative {
            -body.data.usd.value
        } else {
            body.data.usd.value
        };
        Money::from_major(value, self.reporting_currency())
            .ok_or_else(|| RateError(format!("converted amount out of range for {}", currency.code())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_rates_convert_and_preserve_sign() {
        let rates = FixedRates::new().with_rate(Currency::Eur, Decimal::new(110, 2));

        let converted = rates
            .to_reporting(Currency::Eur, Money::new(1000))
            .await
            .unwrap();
        assert_eq!(converted, Money::new(1100));

        let converted = rates
            .to_reporting(Currency::Eur, Money::new(-1000))
            .await
            .unwrap();
        assert_eq!(converted, Money::new(-1100));
    }

    #[tokio::test]
    async fn fixed_rates_default_to_usd_identity() {
        let rates = FixedRates::new();
        let converted = rates
            .to_reporting(Currency::Usd, Money::new(42))
            .await
            .unwrap();
        assert_eq!(converted, Money::new(42));
    }

    #[tokio::test]
    async fn fixed_rates_reject_unknown_currency() {
        let rates = FixedRates::new();
        assert!(
            rates
                .to_reporting(Currency::Btc, Money::new(1))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn btc_scale_converts_to_usd_cents() {
        // 1 BTC = 60_000 USD; 0.5 BTC = 30_000.00 USD.
        let rates = FixedRates::new().with_rate(Currency::Btc, Decimal::from(60_000));
        let converted = rates
            .to_reporting(Currency::Btc, Money::new(50_000_000))
            .await
            .unwrap();
        assert_eq!(converted, Money::new(30_000_00));
    }
}
