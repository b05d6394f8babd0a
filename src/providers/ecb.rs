use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::core::audit::{AuditLog, AuditPhase};
use crate::core::currency::{CurrencyConverter, RateError, date_label};
use crate::core::ratelimit::RateLimiter;

/// Historical FX rates from an exchangeratesapi-style service.
///
/// `GET {base_url}/{date|latest}?base=FROM&symbols=TO` answers with a JSON
/// body carrying a `rates` map. Every upstream call runs under the injected
/// rate limiter and is recorded in the audit log under a fresh correlation
/// id.
pub struct EcbRateProvider {
    base_url: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    audit: Arc<AuditLog>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

impl EcbRateProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        limiter: Arc<RateLimiter>,
        audit: Arc<AuditLog>,
    ) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .user_agent("cryptotax/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(EcbRateProvider {
            base_url: base_url.to_string(),
            client,
            limiter,
            audit,
        })
    }

    async fn fetch_rate(
        &self,
        url: &str,
        from: &str,
        to: &str,
        date: &str,
    ) -> Result<(f64, String), RateError> {
        let response = self
            .client
            .get(url)
            .query(&[("base", from), ("symbols", to)])
            .send()
            .await
            .map_err(|e| RateError::Fetch(format!("request error: {e} for URL: {url}")))?;

        if !response.status().is_success() {
            return Err(RateError::Fetch(format!(
                "HTTP error: {} for currency pair: {from}/{to}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RateError::Fetch(format!("failed to read response body: {e}")))?;

        let data: RatesResponse = serde_json::from_str(&text)
            .map_err(|e| RateError::Fetch(format!("failed to parse rate response: {e}")))?;

        match data.rates.get(to) {
            Some(rate) => Ok((*rate, text)),
            None => Err(RateError::Unavailable {
                base: from.to_string(),
                symbol: to.to_string(),
                date: date.to_string(),
            }),
        }
    }
}

#[async_trait]
impl CurrencyConverter for EcbRateProvider {
    async fn get_exchange_rate(
        &self,
        from: &str,
        to: &str,
        on: Option<NaiveDate>,
    ) -> Result<f64, RateError> {
        let date = date_label(on);
        let url = format!("{}/{}", self.base_url, date);
        debug!("Requesting {from}->{to} rate from {url}");

        let correlation_id = Uuid::new_v4();

        // The permit covers request log, dispatch and response/error log, so
        // one call's audit entries stay contiguous.
        let _permit = self.limiter.acquire().await;
        self.audit
            .record(
                correlation_id,
                AuditPhase::Request,
                &format!("GET {url}?base={from}&symbols={to}"),
            )
            .await;

        match self.fetch_rate(&url, from, to, &date).await {
            Ok((rate, raw_body)) => {
                self.audit
                    .record(correlation_id, AuditPhase::Response, &raw_body)
                    .await;
                Ok(rate)
            }
            Err(e) => {
                self.audit
                    .record(correlation_id, AuditPhase::Error, &e.to_string())
                    .await;
                Err(e)
            }
        }
    }
}
