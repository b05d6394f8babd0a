//! Transaction source: CSV import with per-row validation.
//!
//! Rows that fail validation are excluded from the sequence handed to the
//! calculator and collected as `RowError`s instead of failing the import.

use anyhow::{Context, Result};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::core::Transaction;

// Spreadsheet rows are 1-based and the first row is the header.
const CSV_START_LINE: usize = 2;

#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    asset: String,
    buy_price: String,
    buy_currency: String,
    sell_price: String,
    sell_currency: String,
    quantity: String,
}

/// One rejected input row, with the spreadsheet line it came from.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub reason: String,
    pub raw: String,
}

/// Reads the transaction file, returning the valid transactions in file
/// order plus one `RowError` per rejected row.
pub fn read_transactions(path: &Path) -> Result<(Vec<Transaction>, Vec<RowError>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read transaction file: {}", path.display()))?;

    let mut transactions = Vec::new();
    let mut errors = Vec::new();

    for (index, row) in reader.deserialize::<RawRow>().enumerate() {
        let line = index + CSV_START_LINE;
        match row {
            Ok(raw) => match parse_row(&raw) {
                Ok(transaction) => transactions.push(transaction),
                Err(reason) => {
                    debug!("Rejecting line {line}: {reason}");
                    errors.push(RowError {
                        line,
                        reason,
                        raw: format!(
                            "{},{},{},{},{},{},{}",
                            raw.date,
                            raw.asset,
                            raw.buy_price,
                            raw.buy_currency,
                            raw.sell_price,
                            raw.sell_currency,
                            raw.quantity
                        ),
                    });
                }
            },
            Err(e) => {
                debug!("Rejecting line {line}: {e}");
                errors.push(RowError {
                    line,
                    reason: format!("malformed row: {e}"),
                    raw: String::new(),
                });
            }
        }
    }

    Ok((transactions, errors))
}

/// Writes one line per rejected row. No file is created when there is
/// nothing to report.
pub fn write_error_log(path: &Path, errors: &[RowError]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut content = String::new();
    for error in errors {
        content.push_str(&format!(
            "[{timestamp}] line {}: {} ({})\n",
            error.line, error.reason, error.raw
        ));
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write error log to {}", path.display()))
}

fn parse_row(raw: &RawRow) -> Result<Transaction, String> {
    let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}'", raw.date))?;

    let asset = raw.asset.trim();
    if asset.is_empty() {
        return Err("asset must not be empty".to_string());
    }

    Ok(Transaction {
        date,
        asset: asset.to_string(),
        buy_price: parse_amount(&raw.buy_price, "buy_price")?,
        buy_currency: parse_currency(&raw.buy_currency, "buy_currency")?,
        sell_price: parse_amount(&raw.sell_price, "sell_price")?,
        sell_currency: parse_currency(&raw.sell_currency, "sell_currency")?,
        quantity: parse_amount(&raw.quantity, "quantity")?,
    })
}

fn parse_amount(value: &str, field: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {field} '{value}'"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(format!("{field} must be a non-negative number"));
    }
    Ok(parsed)
}

fn parse_currency(value: &str, field: &str) -> Result<String, String> {
    let code = value.trim();
    if code.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(code.to_string())
}
