use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use rand::Rng;
use std::path::Path;
use tracing::info;

const ASSETS: [&str; 5] = ["Bitcoin", "Ethereum", "Ripple", "Litecoin", "Cardano"];
const CURRENCIES: [&str; 2] = ["USD", "EUR"];
const MIN_TRANSACTIONS: usize = 3;
const MAX_TRANSACTIONS: usize = 7;

/// Writes a sample transaction file for trying the tool out: a handful of
/// random buy/sell rows per asset, quoted in a mix of USD and EUR.
pub fn run(output: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create sample file: {}", output.display()))?;
    writer.write_record([
        "date",
        "asset",
        "buy_price",
        "buy_currency",
        "sell_price",
        "sell_currency",
        "quantity",
    ])?;

    let mut rng = rand::thread_rng();
    let today = Local::now().date_naive();
    let mut rows = 0;

    for asset in ASSETS {
        let num_transactions = rng.gen_range(MIN_TRANSACTIONS..=MAX_TRANSACTIONS);

        // Half the time an asset trades in a single currency throughout.
        let single_currency = if rng.gen_bool(0.5) {
            Some(CURRENCIES[rng.gen_range(0..CURRENCIES.len())])
        } else {
            None
        };

        for _ in 0..num_transactions {
            let date = random_date(&mut rng, today);
            let buy_price = rng.gen_range(1_000.0..51_000.0);
            let sell_price = buy_price + rng.gen_range(-1_000.0..1_000.0);
            let quantity = rng.gen_range(0.01..5.0);

            let buy_currency =
                single_currency.unwrap_or_else(|| CURRENCIES[rng.gen_range(0..CURRENCIES.len())]);
            let sell_currency = single_currency.unwrap_or_else(|| {
                if rng.gen_bool(0.5) {
                    buy_currency
                } else {
                    CURRENCIES[rng.gen_range(0..CURRENCIES.len())]
                }
            });

            writer.write_record([
                &date.format("%Y-%m-%d").to_string(),
                asset,
                &format!("{buy_price:.2}"),
                buy_currency,
                &format!("{sell_price:.2}"),
                sell_currency,
                &format!("{quantity:.2}"),
            ])?;
            rows += 1;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write sample file: {}", output.display()))?;

    info!("Generated {rows} sample transactions");
    println!("Sample transaction file written to {}", output.display());
    Ok(())
}

fn random_date(rng: &mut impl Rng, today: NaiveDate) -> NaiveDate {
    today - Duration::days(rng.gen_range(0..365))
}
