//! Currency conversion abstractions

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Failure modes of a rate lookup.
///
/// `Unavailable` means the upstream service answered but carried no rate for
/// the requested pair/date; retrying the same request will not help. `Fetch`
/// covers transport errors, non-success statuses, timeouts and malformed
/// responses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("no {symbol} rate for base {base} on {date}")]
    Unavailable {
        base: String,
        symbol: String,
        date: String,
    },
    #[error("failed to fetch exchange rate: {0}")]
    Fetch(String),
}

/// Formats an optional as-of date the way the rate service addresses it.
pub fn date_label(on: Option<NaiveDate>) -> String {
    on.map_or_else(
        || "latest".to_string(),
        |d| d.format("%Y-%m-%d").to_string(),
    )
}

#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    /// Returns the `from` -> `to` conversion rate, historical when `on` is
    /// given, otherwise the latest known rate.
    async fn get_exchange_rate(
        &self,
        from: &str,
        to: &str,
        on: Option<NaiveDate>,
    ) -> Result<f64, RateError>;

    /// Converts `amount` from one currency to another.
    async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
        on: Option<NaiveDate>,
    ) -> Result<f64, RateError> {
        let rate = self.get_exchange_rate(from, to, on).await?;
        Ok(amount * rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRateConverter(f64);

    #[async_trait]
    impl CurrencyConverter for FixedRateConverter {
        async fn get_exchange_rate(
            &self,
            _from: &str,
            _to: &str,
            _on: Option<NaiveDate>,
        ) -> Result<f64, RateError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_convert_multiplies_by_rate() {
        let converter = FixedRateConverter(0.9);
        let converted = converter.convert(100.0, "USD", "EUR", None).await.unwrap();
        assert!((converted - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(None), "latest");
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(date_label(Some(date)), "2023-01-01");
    }

    #[test]
    fn test_error_display() {
        let err = RateError::Unavailable {
            base: "USD".to_string(),
            symbol: "EUR".to_string(),
            date: "2023-01-01".to_string(),
        };
        assert_eq!(err.to_string(), "no EUR rate for base USD on 2023-01-01");
    }
}
