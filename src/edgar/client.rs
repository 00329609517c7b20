//! SEC EDGAR HTTP client.
//!
//! EDGAR rejects requests without a `User-Agent` naming the caller ("Name email") and
//! limits clients to 10 requests per second.

use crate::domain::model::{
    AnnexFacts, Company, CompanyTicker, DocumentRequest, Filing, FinancialSummary,
};
use crate::domain::ports::FilingsSource;
use crate::edgar::types::{CompanyFacts, Submissions, TickerTable};
use crate::utils::error::{ProbeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::time::sleep;

pub const SEC_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
pub const SEC_DATA_BASE: &str = "https://data.sec.gov";
pub const SEC_ARCHIVES_BASE: &str = "https://www.sec.gov/Archives/edgar/data";
const RATE_LIMIT_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgarEndpoints {
    pub tickers_url: String,
    pub data_url: String,
    pub archives_url: String,
}

impl Default for EdgarEndpoints {
    fn default() -> Self {
        Self {
            tickers_url: SEC_TICKERS_URL.to_string(),
            data_url: SEC_DATA_BASE.to_string(),
            archives_url: SEC_ARCHIVES_BASE.to_string(),
        }
    }
}

impl EdgarEndpoints {
    /// All endpoints under one host; used against mock servers.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            tickers_url: format!("{}/files/company_tickers.json", base),
            data_url: base.to_string(),
            archives_url: format!("{}/Archives/edgar/data", base),
        }
    }
}

pub struct EdgarClient {
    http: Client,
    endpoints: EdgarEndpoints,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    tickers: OnceCell<HashMap<String, CompanyTicker>>,
}

impl EdgarClient {
    pub fn new(identity: &str, endpoints: EdgarEndpoints, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(identity)
            .build()?;

        Ok(Self {
            http,
            endpoints,
            min_interval: Duration::from_millis(RATE_LIMIT_DELAY_MS),
            last_request: Mutex::new(None),
            tickers: OnceCell::new(),
        })
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn endpoints(&self) -> &EdgarEndpoints {
        &self.endpoints
    }

    /// `{base}/{cik}/{accession}/{document}`; dashes in the accession number are dropped.
    pub fn document_url(base: &str, cik: &str, accession_number: &str, document: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            base.trim_end_matches('/'),
            cik,
            accession_number.replace('-', ""),
            document
        )
    }

    async fn rate_limit(&self) {
        let wait = {
            let last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            (*last).and_then(|t| self.min_interval.checked_sub(t.elapsed()))
        };

        if let Some(wait) = wait {
            sleep(wait).await;
        }

        let mut last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Instant::now());
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.rate_limit().await;
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(ProbeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get(url).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn ticker_table(&self) -> Result<&HashMap<String, CompanyTicker>> {
        self.tickers
            .get_or_try_init(|| async {
                tracing::debug!("Fetching SEC company tickers");
                let table: TickerTable = self.get_json(&self.endpoints.tickers_url).await?;
                Ok(table
                    .into_values()
                    .map(|t| (t.ticker.to_uppercase(), t))
                    .collect())
            })
            .await
    }

    /// Ticker symbol or a numeric CIK.
    pub async fn lookup_cik(&self, ticker: &str) -> Result<u64> {
        let ticker = ticker.trim();
        if !ticker.is_empty() && ticker.chars().all(|c| c.is_ascii_digit()) {
            return ticker.parse().map_err(|_| ProbeError::CompanyNotFound {
                ticker: ticker.to_string(),
            });
        }

        self.ticker_table()
            .await?
            .get(&ticker.to_uppercase())
            .map(|t| t.cik)
            .ok_or_else(|| ProbeError::CompanyNotFound {
                ticker: ticker.to_string(),
            })
    }

    async fn company_facts(&self, cik: u64) -> Result<CompanyFacts> {
        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{:010}.json",
            self.endpoints.data_url.trim_end_matches('/'),
            cik
        );
        self.get_json(&url).await
    }
}

#[async_trait]
impl FilingsSource for EdgarClient {
    async fn resolve_company(&self, ticker: &str) -> Result<Company> {
        let cik = self.lookup_cik(ticker).await?;
        let url = format!(
            "{}/submissions/CIK{:010}.json",
            self.endpoints.data_url.trim_end_matches('/'),
            cik
        );
        let submissions: Submissions = self.get_json(&url).await?;
        let company = Company::from(submissions);
        tracing::debug!(
            "Resolved {} to CIK {} ({}, {} recent filings)",
            ticker,
            company.cik,
            company.name,
            company.filings.len()
        );
        Ok(company)
    }

    async fn financial_summary(&self, company: &Company) -> Result<FinancialSummary> {
        Ok(self.company_facts(company.cik).await?.summary())
    }

    async fn annex_facts(&self, company: &Company, filing: &Filing) -> Result<AnnexFacts> {
        Ok(self
            .company_facts(company.cik)
            .await?
            .annex_for(&filing.accession_number))
    }

    async fn filing_text(&self, company: &Company, filing: &Filing) -> Result<String> {
        let url = Self::document_url(
            &self.endpoints.archives_url,
            &company.cik.to_string(),
            &filing.accession_number,
            &filing.primary_document,
        );
        Ok(self.get(&url).await?.text().await?)
    }

    async fn download(&self, request: &DocumentRequest) -> Result<Vec<u8>> {
        let url = self.document_url_for(request);
        Ok(self.get(&url).await?.bytes().await?.to_vec())
    }

    fn document_url_for(&self, request: &DocumentRequest) -> String {
        Self::document_url(
            &self.endpoints.archives_url,
            &request.cik,
            &request.accession_number,
            &request.document,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_document_url_order_and_separators() {
        let url = EdgarClient::document_url(
            SEC_ARCHIVES_BASE,
            "1327567",
            "000132756724000023",
            "ex991q424earningsrelease.htm",
        );
        assert_eq!(
            url,
            "https://www.sec.gov/Archives/edgar/data/1327567/000132756724000023/ex991q424earningsrelease.htm"
        );
    }

    #[test]
    fn test_document_url_normalizes_base_and_accession() {
        let url = EdgarClient::document_url("http://host/data/", "1262039", "0001262039-24-000034", "a.htm");
        assert_eq!(url, "http://host/data/1262039/000126203924000034/a.htm");
    }

    #[tokio::test]
    async fn test_lookup_cik_from_ticker_table() {
        let server = MockServer::start();
        let tickers_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/files/company_tickers.json")
                .header("user-agent", "Test Runner test@example.com");
            then.status(200).json_body(serde_json::json!({
                "0": {"cik_str": 1327567, "ticker": "PANW", "title": "Palo Alto Networks Inc"},
                "1": {"cik_str": 1262039, "ticker": "FTNT", "title": "Fortinet, Inc."}
            }));
        });

        let client = EdgarClient::new(
            "Test Runner test@example.com",
            EdgarEndpoints::with_base(&server.base_url()),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_min_interval(Duration::ZERO);

        assert_eq!(client.lookup_cik("ftnt").await.unwrap(), 1262039);
        assert_eq!(client.lookup_cik("PANW").await.unwrap(), 1327567);
        assert!(matches!(
            client.lookup_cik("ZZZZ").await,
            Err(ProbeError::CompanyNotFound { .. })
        ));
        // numeric CIKs skip the table
        assert_eq!(client.lookup_cik("320193").await.unwrap(), 320193);

        tickers_mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_requests_are_spaced_by_min_interval() {
        let server = MockServer::start();
        let document_mock = server.mock(|when, then| {
            when.method(GET).path("/Archives/edgar/data/1327567/000132756724000023/a.htm");
            then.status(200).body("<html>ok</html>");
        });

        let interval = Duration::from_millis(250);
        let client = EdgarClient::new(
            "Test Runner test@example.com",
            EdgarEndpoints::with_base(&server.base_url()),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_min_interval(interval);

        let request = DocumentRequest {
            cik: "1327567".to_string(),
            accession_number: "0001327567-24-000023".to_string(),
            document: "a.htm".to_string(),
            save_path: "a.htm".to_string(),
        };

        let started = Instant::now();
        client.download(&request).await.unwrap();
        client.download(&request).await.unwrap();
        assert!(started.elapsed() >= interval);

        document_mock.assert_hits(2);
    }

    #[test]
    fn test_default_min_interval() {
        let client = EdgarClient::new(
            "Test Runner test@example.com",
            EdgarEndpoints::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.min_interval, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_http_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/submissions/CIK0001327567.json");
            then.status(403);
        });

        let client = EdgarClient::new(
            "Test Runner test@example.com",
            EdgarEndpoints::with_base(&server.base_url()),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_min_interval(Duration::ZERO);

        match client.resolve_company("1327567").await {
            Err(ProbeError::HttpStatus { status, url }) => {
                assert_eq!(status, 403);
                assert!(url.ends_with("/submissions/CIK0001327567.json"));
            }
            other => panic!("expected HttpStatus error, got {:?}", other.map(|c| c.name)),
        }
    }
}
