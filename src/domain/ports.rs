use crate::domain::model::{AnnexFacts, Company, DocumentRequest, Filing, FinancialSummary};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn identity(&self) -> &str;
    fn tickers(&self) -> Vec<String>;
    fn forms(&self) -> Vec<FormPlan>;
    fn downloads(&self) -> Vec<DocumentRequest>;
}

/// Form type to list, plus the item sections to pull from its latest filing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FormPlan {
    pub form: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub count_phrase: Option<String>,
    #[serde(default)]
    pub annex: bool,
}

#[async_trait]
pub trait FilingsSource: Send + Sync {
    async fn resolve_company(&self, ticker: &str) -> Result<Company>;
    async fn financial_summary(&self, company: &Company) -> Result<FinancialSummary>;
    async fn annex_facts(&self, company: &Company, filing: &Filing) -> Result<AnnexFacts>;
    async fn filing_text(&self, company: &Company, filing: &Filing) -> Result<String>;
    async fn download(&self, request: &DocumentRequest) -> Result<Vec<u8>>;
    fn document_url_for(&self, request: &DocumentRequest) -> String;
}
