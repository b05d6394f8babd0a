//! Report sink: writes the per-asset tax report as a CSV file.
//!
//! Each asset contributes its detail rows in input order followed by a
//! `Total` row carrying the asset's accumulated tax.

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::TaxReport;

pub fn write_csv(report: &TaxReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;

    writer.write_record([
        "asset",
        "date",
        "buy_price",
        "buy_currency",
        "sell_price",
        "sell_currency",
        "quantity",
        "profit_or_loss",
        "tax",
    ])?;

    for (asset, aggregate) in report {
        for detail in &aggregate.transactions {
            writer.write_record([
                asset.as_str(),
                &detail.date.format("%Y-%m-%d").to_string(),
                &format!("{:.2}", detail.buy_price),
                &detail.buy_currency,
                &format!("{:.2}", detail.sell_price),
                &detail.sell_currency,
                &format!("{:.2}", detail.quantity),
                &format!("{:.2}", detail.profit_or_loss),
                &format!("{:.2}", detail.tax),
            ])?;
        }
        writer.write_record([
            asset.as_str(),
            "Total",
            "",
            "",
            "",
            "",
            "",
            "",
            &format!("{:.2}", aggregate.total_tax),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write report file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetReport, TransactionDetail};
    use chrono::NaiveDate;

    fn sample_report() -> TaxReport {
        let detail = TransactionDetail {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            buy_price: 100.0,
            buy_currency: "USD".to_string(),
            sell_price: 150.0,
            sell_currency: "USD".to_string(),
            quantity: 2.0,
            profit_or_loss: 100.0,
            tax: 30.0,
        };
        let mut report = TaxReport::new();
        report.insert(
            "Bitcoin".to_string(),
            AssetReport {
                transactions: vec![detail],
                total_tax: 30.0,
            },
        );
        report
    }

    #[test]
    fn test_report_has_detail_and_total_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        write_csv(&sample_report(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("asset,date,"));
        assert_eq!(
            lines[1],
            "Bitcoin,2023-01-01,100.00,USD,150.00,USD,2.00,100.00,30.00"
        );
        assert_eq!(lines[2], "Bitcoin,Total,,,,,,,30.00");
    }

    #[test]
    fn test_total_row_matches_aggregate_tax() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let report = sample_report();

        write_csv(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let total_line = content
            .lines()
            .find(|l| l.contains(",Total,"))
            .expect("missing total row");
        let total: f64 = total_line.rsplit(',').next().unwrap().parse().unwrap();
        assert!((total - report["Bitcoin"].total_tax).abs() < 0.005);
    }
}
