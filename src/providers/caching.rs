use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::currency::{CurrencyConverter, RateError, date_label};

/// Memoizes rate lookups per `(from, to, as-of)` key for the lifetime of a
/// run. Failed lookups are cached too: within a single run a pair/date that
/// already failed is not worth refetching.
#[derive(Clone)]
pub struct CachingConverter<T: CurrencyConverter> {
    inner: T,
    cache: Arc<Mutex<HashMap<String, Result<f64, RateError>>>>,
}

impl<T: CurrencyConverter> CachingConverter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl<T: CurrencyConverter + Send + Sync> CurrencyConverter for CachingConverter<T> {
    async fn get_exchange_rate(
        &self,
        from: &str,
        to: &str,
        on: Option<NaiveDate>,
    ) -> Result<f64, RateError> {
        let key = format!("{from}-{to}-{}", date_label(on));
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(&key) {
            debug!("Cache hit for currency rate: {key}");
            return cached.clone();
        }
        debug!("Cache miss for currency rate: {key}");
        let result = self.inner.get_exchange_rate(from, to, on).await;
        cache.insert(key, result.clone());
        result
    }
}
