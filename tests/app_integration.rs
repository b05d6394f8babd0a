use std::fs;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_rate_mock_server(
        date_segment: &str,
        base: &str,
        symbol: &str,
        rate: f64,
    ) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/{date_segment}")))
            .and(query_param("base", base))
            .and(query_param("symbols", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"base":"{base}","date":"{date_segment}","rates":{{"{symbol}":{rate}}}}}"#
            )))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

#[test_log::test(tokio::test)]
async fn test_full_report_flow_with_mock_rate_service() {
    // USD legs on 2023-01-01 convert to EUR at 0.90.
    let mock_server = test_utils::create_rate_mock_server("2023-01-01", "USD", "EUR", 0.90).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input_path = dir.path().join("transactions.csv");
    let output_path = dir.path().join("report.csv");
    let error_log_path = dir.path().join("errors.log");
    let audit_path = dir.path().join("fx_audit.log");

    fs::write(
        &input_path,
        "date,asset,buy_price,buy_currency,sell_price,sell_currency,quantity\n\
         2023-01-01,Bitcoin,100,EUR,150,EUR,2\n\
         2023-01-01,Bitcoin,100,USD,200,EUR,1\n\
         bad-date,Ethereum,1,EUR,2,EUR,1\n",
    )
    .expect("Failed to write input file");

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
currency: "EUR"
provider:
  base_url: {}
rate_limit_ms: 0
audit_log: {}
"#,
        mock_server.uri(),
        audit_path.display()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let result = cryptotax::run_command(
        cryptotax::AppCommand::Report {
            input: input_path,
            output: Some(output_path.clone()),
            error_log: Some(error_log_path.clone()),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Report run failed with: {:?}", result.err());

    // Report: first transaction P/L = (150-100)*2 = 100, tax 30;
    // second P/L = 200 - 100*0.9 = 110, tax 33; total 63.
    let report = fs::read_to_string(&output_path).expect("Report file missing");
    info!(%report, "Generated report");
    assert!(report.contains("Bitcoin,2023-01-01,100.00,EUR,150.00,EUR,2.00,100.00,30.00"));
    assert!(report.contains("Bitcoin,2023-01-01,100.00,USD,200.00,EUR,1.00,110.00,33.00"));
    assert!(report.contains("Bitcoin,Total,,,,,,,63.00"));

    // The malformed row landed in the error log, not the report.
    let errors = fs::read_to_string(&error_log_path).expect("Error log missing");
    assert!(errors.contains("line 4"));
    assert!(!report.contains("Ethereum"));

    // The single upstream call is fully audited.
    let audit = fs::read_to_string(&audit_path).expect("Audit log missing");
    assert!(audit.contains("[request]"));
    assert!(audit.contains("GET"));
    assert!(audit.contains("base=USD&symbols=EUR"));
    assert!(audit.contains("[response]"));
}

#[test_log::test(tokio::test)]
async fn test_report_aborts_when_rate_is_unavailable() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Upstream answers, but without the requested symbol.
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2023-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rates":{"GBP":0.79}}"#))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let input_path = dir.path().join("transactions.csv");
    let output_path = dir.path().join("report.csv");

    fs::write(
        &input_path,
        "date,asset,buy_price,buy_currency,sell_price,sell_currency,quantity\n\
         2023-01-01,Bitcoin,100,USD,150,EUR,2\n",
    )
    .expect("Failed to write input file");

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
currency: "EUR"
provider:
  base_url: {}
rate_limit_ms: 0
audit_log: {}
"#,
        mock_server.uri(),
        dir.path().join("fx_audit.log").display()
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let result = cryptotax::run_command(
        cryptotax::AppCommand::Report {
            input: input_path,
            output: Some(output_path.clone()),
            error_log: Some(dir.path().join("errors.log")),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    assert!(result.is_err(), "Run should abort on a missing rate");
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("no EUR rate for base USD"), "{message}");
    // All-or-nothing: no partial report is written.
    assert!(!output_path.exists());
}

#[test_log::test(tokio::test)]
async fn test_generate_then_import_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let sample_path = dir.path().join("transactions.csv");

    let result = cryptotax::run_command(
        cryptotax::AppCommand::Generate {
            output: sample_path.clone(),
        },
        None,
    )
    .await;
    assert!(result.is_ok(), "Generate failed with: {:?}", result.err());

    let (transactions, errors) =
        cryptotax::importer::read_transactions(&sample_path).expect("Sample file unreadable");
    assert!(errors.is_empty(), "Sample rows failed validation: {errors:?}");
    assert!(!transactions.is_empty());
}
