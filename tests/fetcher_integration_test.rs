use anyhow::Result;
use edgar_probe::config::toml_config::CompanyConfig;
use edgar_probe::domain::model::{DocumentRequest, StepOutcome, StepReport};
use edgar_probe::domain::ports::FormPlan;
use edgar_probe::{EdgarClient, EdgarEndpoints, FilingsFetcher, LocalStorage, TomlConfig};
use httpmock::prelude::*;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const IDENTITY: &str = "Integration Test tests@example.com";

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn find<'a>(reports: &'a [StepReport], step: &str) -> &'a StepReport {
    reports
        .iter()
        .find(|r| r.step == step)
        .unwrap_or_else(|| panic!("no step '{}' in {:#?}", step, reports))
}

fn mock_edgar(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/files/company_tickers.json")
            .header("user-agent", IDENTITY);
        then.status(200).json_body(serde_json::json!({
            "0": {"cik_str": 1327567, "ticker": "PANW", "title": "Palo Alto Networks Inc"},
            "1": {"cik_str": 1262039, "ticker": "FTNT", "title": "Fortinet, Inc."}
        }));
    });

    server.mock(|when, then| {
        when.method(GET).path("/submissions/CIK0001327567.json");
        then.status(200).json_body(serde_json::json!({
            "cik": "1327567",
            "name": "Palo Alto Networks Inc",
            "tickers": ["PANW"],
            "formerNames": [],
            "filings": {
                "recent": {
                    "accessionNumber": ["0001327567-24-000023", "0001327567-24-000010", "0001327567-24-000002"],
                    "filingDate": ["2024-08-19", "2024-05-20", "2024-02-20"],
                    "reportDate": ["2024-08-19", "2024-04-30", "2024-01-31"],
                    "form": ["8-K", "10-Q", "10-Q"],
                    "primaryDocument": ["panw-20240819.htm", "panw-20240430.htm", "panw-20240131.htm"],
                    "primaryDocDescription": ["8-K", "10-Q", "10-Q"],
                    "size": [250000, 9100000, 8800000],
                    "isXBRL": [1, 1, 1]
                }
            }
        }));
    });

    // Fortinet's submissions are unavailable; the run must carry on without it
    server.mock(|when, then| {
        when.method(GET).path("/submissions/CIK0001262039.json");
        then.status(500);
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/api/xbrl/companyfacts/CIK0001327567.json");
        then.status(200).json_body(serde_json::json!({
            "cik": 1327567,
            "entityName": "Palo Alto Networks Inc",
            "facts": {
                "us-gaap": {
                    "Revenues": {
                        "label": "Revenues",
                        "units": {
                            "USD": [
                                {"end": "2024-01-31", "val": 1980000000.0, "accn": "0001327567-24-000002", "fy": 2024, "fp": "Q2", "form": "10-Q", "filed": "2024-02-20"},
                                {"end": "2024-04-30", "val": 1985000000.0, "accn": "0001327567-24-000010", "fy": 2024, "fp": "Q3", "form": "10-Q", "filed": "2024-05-20"}
                            ]
                        }
                    },
                    "NetIncomeLoss": {
                        "label": "Net Income (Loss)",
                        "units": {
                            "USD": [
                                {"end": "2024-04-30", "val": 278800000.0, "accn": "0001327567-24-000010", "fy": 2024, "fp": "Q3", "form": "10-Q", "filed": "2024-05-20"}
                            ]
                        }
                    }
                }
            }
        }));
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/Archives/edgar/data/1327567/000132756724000010/panw-20240430.htm");
        then.status(200).body(
            "<html><body>\
             <p>PART I</p><p>Item 1. Financial Statements 3</p><p>Item 2. Management's Discussion 25</p>\
             <p>Item 1. Financial Statements</p><p>Balance sheets</p>\
             <p>Item 2. Management's Discussion and Analysis</p><p>Total revenue grew 15%.</p>\
             <p>Item 3. Quantitative and Qualitative Disclosures</p>\
             </body></html>",
        );
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/Archives/edgar/data/1327567/000132756724000023/panw-20240819.htm");
        then.status(200).body(
            "<p>Item 2.02 Results of Operations</p><p>The Company issued a press release.</p>\
             <p>Item 9.01 Financial Statements and Exhibits</p>\
             <p>99.1 Press release issued by Palo Alto Networks, Inc. dated August 19, 2024</p>",
        );
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/Archives/edgar/data/1327567/000132756724000023/ex991q424earningsrelease.htm");
        then.status(200).body("<html>Palo Alto Networks Reports Fiscal Fourth Quarter</html>");
    });

    server.mock(|when, then| {
        when.method(GET)
            .path("/Archives/edgar/data/1262039/000126203924000034/ftntq2-2024ex991corrected.htm");
        then.status(404);
    });
}

fn config(server: &MockServer, download_dir: &str) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.edgar.identity = IDENTITY.to_string();
    config.edgar.download_dir = download_dir.to_string();
    let endpoints = EdgarEndpoints::with_base(&server.base_url());
    config.edgar.tickers_url = endpoints.tickers_url;
    config.edgar.data_url = endpoints.data_url;
    config.edgar.archives_url = endpoints.archives_url;
    config
}

#[tokio::test]
async fn test_end_to_end_against_mock_edgar() {
    let server = MockServer::start();
    mock_edgar(&server);
    let temp_dir = TempDir::new().unwrap();
    let download_dir = temp_dir.path().to_str().unwrap().to_string();

    let config = config(&server, &download_dir);
    config.validate_fetcher().unwrap();

    let client = EdgarClient::new(IDENTITY, config.endpoints(), Duration::from_secs(5))
        .unwrap()
        .with_min_interval(Duration::ZERO);
    let buffer = SharedBuffer::default();
    let mut fetcher = FilingsFetcher::new(client, LocalStorage::new(&download_dir), config)
        .with_output(Box::new(buffer.clone()));

    let reports = fetcher.run().await;

    assert!(find(&reports, "resolve company PANW").is_success());
    match &find(&reports, "resolve company FTNT").outcome {
        StepOutcome::Failed { reason } => {
            assert!(reason.contains("500"));
            assert!(reason.contains("/submissions/CIK0001262039.json"));
        }
        StepOutcome::Succeeded => panic!("FTNT should not resolve"),
    }

    assert!(find(&reports, "financials for Palo Alto Networks Inc").is_success());
    assert!(find(&reports, "10-Q filings for Palo Alto Networks Inc").is_success());
    assert!(find(&reports, "Item 2 of 10-Q 0001327567-24-000010").is_success());
    assert!(find(&reports, "XBRL annex of 10-Q 0001327567-24-000010").is_success());
    assert!(find(&reports, "Item 9.01 of 8-K 0001327567-24-000023").is_success());
    assert!(find(&reports, "download ex991q424earningsrelease.htm").is_success());
    assert!(!find(&reports, "download ftntq2-2024ex991corrected.htm").is_success());

    let saved = temp_dir.path().join("palo_alto_networks_document.htm");
    let body = std::fs::read_to_string(saved).unwrap();
    assert!(body.contains("Fiscal Fourth Quarter"));
    assert!(!temp_dir.path().join("fortinet_document.htm").exists());

    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Palo Alto Networks Inc Financials:"));
    assert!(output.contains("1985000000"));
    assert!(output.contains("Total revenue grew 15%."));
    assert!(output.contains("Item 2. Management's Discussion and Analysis\nTotal revenue grew 15%."));
    assert!(output.contains("Number of 'press release' mentions in Item 9.01: 1"));
    assert!(output.contains("XBRL facts for 0001327567-24-000010 (2 facts)"));
}

#[tokio::test]
async fn test_custom_plan_reports_missing_form_and_item() -> Result<()> {
    let server = MockServer::start();
    mock_edgar(&server);
    let temp_dir = TempDir::new()?;
    let download_dir = temp_dir
        .path()
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("temp dir is not valid UTF-8"))?
        .to_string();

    let mut config = config(&server, &download_dir);
    config.companies = vec![CompanyConfig {
        ticker: "PANW".to_string(),
    }];
    config.forms = vec![
        FormPlan {
            form: "10-K".to_string(),
            items: vec!["Item 7".to_string()],
            count_phrase: None,
            annex: false,
        },
        FormPlan {
            form: "10-q".to_string(),
            items: vec!["Item 4".to_string()],
            count_phrase: None,
            annex: false,
        },
    ];
    config.downloads = vec![DocumentRequest {
        cik: "1327567".to_string(),
        accession_number: "0001327567-24-000023".to_string(),
        document: "ex991q424earningsrelease.htm".to_string(),
        save_path: "nested/panw.htm".to_string(),
    }];

    let client = EdgarClient::new(IDENTITY, config.endpoints(), Duration::from_secs(5))?
        .with_min_interval(Duration::ZERO);
    let mut fetcher = FilingsFetcher::new(client, LocalStorage::new(&download_dir), config)
        .with_output(Box::new(std::io::sink()));

    let reports = fetcher.run().await;

    assert_eq!(
        find(&reports, "10-K filings for Palo Alto Networks Inc").outcome,
        StepOutcome::Failed {
            reason: "No 10-K filings available".to_string()
        }
    );
    assert!(find(&reports, "10-q filings for Palo Alto Networks Inc").is_success());
    assert_eq!(
        find(&reports, "Item 4 of 10-q 0001327567-24-000010").outcome,
        StepOutcome::Failed {
            reason: "Item 'Item 4' not found in filing".to_string()
        }
    );
    assert!(temp_dir.path().join("nested/panw.htm").exists());
    Ok(())
}
