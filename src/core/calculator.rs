//! Profit/loss and tax aggregation over a sequence of transactions.

use crate::core::currency::{CurrencyConverter, RateError};
use crate::core::tax::TaxRule;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One validated buy/sell transaction, as handed over by the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub asset: String,
    pub buy_price: f64,
    pub buy_currency: String,
    pub sell_price: f64,
    pub sell_currency: String,
    pub quantity: f64,
}

/// A transaction with its computed profit/loss and tax, both expressed in
/// the reporting currency. Prices keep their original currencies.
#[derive(Debug, Clone)]
pub struct TransactionDetail {
    pub date: NaiveDate,
    pub buy_price: f64,
    pub buy_currency: String,
    pub sell_price: f64,
    pub sell_currency: String,
    pub quantity: f64,
    pub profit_or_loss: f64,
    pub tax: f64,
}

/// Per-asset aggregate: details in input order plus the accumulated tax.
#[derive(Debug, Clone, Default)]
pub struct AssetReport {
    pub transactions: Vec<TransactionDetail>,
    pub total_tax: f64,
}

/// The pipeline's terminal output, keyed by asset symbol.
pub type TaxReport = BTreeMap<String, AssetReport>;

pub struct TaxCalculator {
    converter: Arc<dyn CurrencyConverter>,
    tax_rule: Box<dyn TaxRule>,
    reporting_currency: String,
}

impl TaxCalculator {
    pub fn new(
        converter: Arc<dyn CurrencyConverter>,
        tax_rule: Box<dyn TaxRule>,
        reporting_currency: &str,
    ) -> Self {
        TaxCalculator {
            converter,
            tax_rule,
            reporting_currency: reporting_currency.to_string(),
        }
    }

    /// Folds the transactions into a per-asset report.
    ///
    /// Transactions are processed in input order and each asset's detail
    /// sequence keeps that order. Any rate failure aborts the whole run: no
    /// partial report is returned. `update_callback` fires once per
    /// processed transaction so callers can report progress.
    pub async fn calculate_taxes(
        &self,
        transactions: &[Transaction],
        update_callback: &(dyn Fn()),
    ) -> Result<TaxReport, RateError> {
        let mut report = TaxReport::new();

        for transaction in transactions {
            let buy_in_reporting = self
                .normalize(transaction.buy_price, &transaction.buy_currency, transaction.date)
                .await?;
            let sell_in_reporting = self
                .normalize(
                    transaction.sell_price,
                    &transaction.sell_currency,
                    transaction.date,
                )
                .await?;

            let profit_or_loss = (sell_in_reporting - buy_in_reporting) * transaction.quantity;
            let tax = self.tax_rule.assess(profit_or_loss, transaction.date);

            let aggregate = report.entry(transaction.asset.clone()).or_default();
            aggregate.transactions.push(TransactionDetail {
                date: transaction.date,
                buy_price: transaction.buy_price,
                buy_currency: transaction.buy_currency.clone(),
                sell_price: transaction.sell_price,
                sell_currency: transaction.sell_currency.clone(),
                quantity: transaction.quantity,
                profit_or_loss,
                tax,
            });
            aggregate.total_tax += tax;

            update_callback();
        }

        Ok(report)
    }

    /// Expresses `amount` in the reporting currency. Legs already quoted in
    /// it skip the converter entirely.
    async fn normalize(
        &self,
        amount: f64,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, RateError> {
        if currency == self.reporting_currency {
            return Ok(amount);
        }
        debug!(
            "Converting {amount} from {currency} to {} on {date}",
            self.reporting_currency
        );
        self.converter
            .convert(amount, currency, &self.reporting_currency, Some(date))
            .await
    }
}
