use super::ui;
use crate::config::AppConfig;
use crate::core::{
    AssetReport, AuditLog, CurrencyConverter, FlatRateTax, RateLimiter, TaxCalculator, TaxReport,
};
use crate::providers::caching::CachingConverter;
use crate::providers::ecb::EcbRateProvider;
use crate::{importer, reporter};
use anyhow::{Context, Result};
use comfy_table::Cell;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub async fn run(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    error_log: Option<&Path>,
) -> Result<()> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let output = output.map_or_else(
        || PathBuf::from(format!("crypto_taxes_{timestamp}.csv")),
        Path::to_path_buf,
    );
    let error_log = error_log.map_or_else(
        || PathBuf::from(format!("errors_{timestamp}.log")),
        Path::to_path_buf,
    );

    let (transactions, row_errors) = importer::read_transactions(input)?;
    importer::write_error_log(&error_log, &row_errors)?;
    if !row_errors.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Skipped {} malformed row(s), see {}",
                    row_errors.len(),
                    error_log.display()
                ),
                ui::StyleType::Error
            )
        );
    }
    if transactions.is_empty() {
        anyhow::bail!("No valid transactions found in {}", input.display());
    }
    debug!("Imported {} transactions", transactions.len());

    let audit = Arc::new(AuditLog::open(&config.audit_log)?);
    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(config.rate_limit_ms)));
    let provider = EcbRateProvider::new(
        &config.provider.base_url,
        Duration::from_secs(config.provider.timeout_secs),
        limiter,
        Arc::clone(&audit),
    )
    .context("Failed to set up the rate provider")?;
    let converter: Arc<dyn CurrencyConverter> = if config.cache_rates {
        Arc::new(CachingConverter::new(provider))
    } else {
        Arc::new(provider)
    };

    let calculator = TaxCalculator::new(
        converter,
        Box::new(FlatRateTax::new(config.tax.flat_rate)),
        &config.currency,
    );

    let pb = ui::new_progress_bar(transactions.len() as u64, true);
    pb.set_message("Processing transactions...");
    let report = calculator
        .calculate_taxes(&transactions, &|| pb.inc(1))
        .await
        .context("Tax calculation aborted")?;
    pb.finish_and_clear();

    display_report(&report, &config.currency);

    reporter::write_csv(&report, &output)?;
    info!("Report written to {}", output.display());
    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "Report: {} · Audit log: {}",
                output.display(),
                audit.path().display()
            ),
            ui::StyleType::Subtle
        )
    );

    Ok(())
}

fn display_report(report: &TaxReport, currency: &str) {
    let num_assets = report.len();
    for (i, (asset, aggregate)) in report.iter().enumerate() {
        println!("{}", asset_table(asset, aggregate, currency));
        if i < num_assets - 1 {
            ui::print_separator();
        }
    }

    let grand_total: f64 = report.values().map(|a| a.total_tax).sum();
    if num_assets > 1 {
        let term_width = console::Term::stdout()
            .size_checked()
            .map(|(_, w)| w as usize)
            .unwrap_or(80);
        println!("\n{}", "=".repeat(term_width));
        let total_str = format!("Total Tax ({currency}): {grand_total:.2}");
        let styled_total = style(&total_str).bold().green();
        println!("{styled_total:>term_width$}");
    }
}

fn asset_table(asset: &str, aggregate: &AssetReport, currency: &str) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Buy"),
        ui::header_cell("Sell"),
        ui::header_cell("Quantity"),
        ui::header_cell(&format!("P/L ({currency})")),
        ui::header_cell(&format!("Tax ({currency})")),
    ]);

    for detail in &aggregate.transactions {
        table.add_row(vec![
            Cell::new(detail.date.format("%Y-%m-%d").to_string()),
            ui::amount_cell(format!("{:.2} {}", detail.buy_price, detail.buy_currency)),
            ui::amount_cell(format!("{:.2} {}", detail.sell_price, detail.sell_currency)),
            ui::amount_cell(format!("{:.2}", detail.quantity)),
            ui::signed_amount_cell(detail.profit_or_loss),
            ui::amount_cell(format!("{:.2}", detail.tax)),
        ]);
    }

    // Asset name at top
    let mut output = format!("Asset: {}\n\n", ui::style_text(asset, ui::StyleType::Title));

    // Table in the middle
    output.push_str(&table.to_string());

    // Total tax at bottom
    output.push_str(&format!(
        "\n\nTotal Tax ({}): {}",
        ui::style_text(currency, ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2}", aggregate.total_tax),
            ui::StyleType::TotalValue
        )
    ));

    output
}
