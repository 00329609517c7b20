use crate::domain::model::DocumentRequest;
use crate::domain::ports::{ConfigProvider, FormPlan};
use crate::edgar::client::{SEC_ARCHIVES_BASE, SEC_DATA_BASE, SEC_TICKERS_URL};
use crate::edgar::EdgarEndpoints;
use crate::sniffer::filter::Filter;
use crate::utils::error::{ProbeError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const IDENTITY_ENV: &str = "EDGAR_IDENTITY";
pub const DEFAULT_FILTER: &str = "ip and (tcp or udp)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub edgar: EdgarConfig,
    pub companies: Vec<CompanyConfig>,
    pub forms: Vec<FormPlan>,
    pub downloads: Vec<DocumentRequest>,
    pub sniffer: SnifferConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgarConfig {
    /// "Name email", sent as User-Agent.
    pub identity: String,
    pub tickers_url: String,
    pub data_url: String,
    pub archives_url: String,
    pub timeout_seconds: u64,
    pub download_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub ticker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    pub interface: Option<String>,
    pub filter: String,
    pub count: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            identity: String::new(),
            tickers_url: SEC_TICKERS_URL.to_string(),
            data_url: SEC_DATA_BASE.to_string(),
            archives_url: SEC_ARCHIVES_BASE.to_string(),
            timeout_seconds: 30,
            download_dir: "./downloads".to_string(),
        }
    }
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            interface: None,
            filter: DEFAULT_FILTER.to_string(),
            count: 1,
            timeout_ms: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            edgar: EdgarConfig::default(),
            companies: vec![
                CompanyConfig {
                    ticker: "PANW".to_string(),
                },
                CompanyConfig {
                    ticker: "FTNT".to_string(),
                },
            ],
            forms: vec![
                FormPlan {
                    form: "10-Q".to_string(),
                    items: vec!["Item 2".to_string()],
                    count_phrase: None,
                    annex: true,
                },
                FormPlan {
                    form: "8-K".to_string(),
                    items: vec!["Item 9.01".to_string()],
                    count_phrase: Some("press release".to_string()),
                    annex: false,
                },
            ],
            downloads: vec![
                DocumentRequest {
                    cik: "1327567".to_string(),
                    accession_number: "000132756724000023".to_string(),
                    document: "ex991q424earningsrelease.htm".to_string(),
                    save_path: "palo_alto_networks_document.htm".to_string(),
                },
                DocumentRequest {
                    cik: "1262039".to_string(),
                    accession_number: "000126203924000034".to_string(),
                    document: "ftntq2-2024ex991corrected.htm".to_string(),
                    save_path: "fortinet_document.htm".to_string(),
                },
            ],
            sniffer: SnifferConfig::default(),
        }
    }
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ProbeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// Environment identity wins over an empty or unresolved one from the file.
    pub fn apply_env_identity(&mut self) {
        if let Ok(identity) = std::env::var(IDENTITY_ENV) {
            if !identity.trim().is_empty() {
                self.edgar.identity = identity;
            }
        }
    }

    pub fn endpoints(&self) -> EdgarEndpoints {
        EdgarEndpoints {
            tickers_url: self.edgar.tickers_url.clone(),
            data_url: self.edgar.data_url.clone(),
            archives_url: self.edgar.archives_url.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.edgar.timeout_seconds)
    }

    pub fn validate_fetcher(&self) -> Result<()> {
        self.edgar.validate()?;

        for company in &self.companies {
            validation::validate_non_empty_string("companies.ticker", &company.ticker)?;
        }
        for plan in &self.forms {
            validation::validate_non_empty_string("forms.form", &plan.form)?;
        }
        for request in &self.downloads {
            validation::validate_digits("downloads.cik", &request.cik)?;
            validation::validate_digits(
                "downloads.accession_number",
                &request.accession_number.replace('-', ""),
            )?;
            validation::validate_non_empty_string("downloads.document", &request.document)?;
            validation::validate_path("downloads.save_path", &request.save_path)?;
        }
        Ok(())
    }

    pub fn validate_sniffer(&self) -> Result<()> {
        self.sniffer.validate()
    }
}

impl Validate for EdgarConfig {
    fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() {
            return Err(ProbeError::MissingConfigError {
                field: "edgar.identity".to_string(),
            });
        }
        validation::validate_identity("edgar.identity", &self.identity)?;
        validation::validate_url("edgar.tickers_url", &self.tickers_url)?;
        validation::validate_url("edgar.data_url", &self.data_url)?;
        validation::validate_url("edgar.archives_url", &self.archives_url)?;
        validation::validate_range("edgar.timeout_seconds", self.timeout_seconds, 1, 300)?;
        validation::validate_path("edgar.download_dir", &self.download_dir)
    }
}

impl Validate for SnifferConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_positive_number("sniffer.count", self.count, 1)?;
        if let Some(interface) = &self.interface {
            validation::validate_non_empty_string("sniffer.interface", interface)?;
        }
        Filter::parse(&self.filter)?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn identity(&self) -> &str {
        &self.edgar.identity
    }

    fn tickers(&self) -> Vec<String> {
        self.companies.iter().map(|c| c.ticker.clone()).collect()
    }

    fn forms(&self) -> Vec<FormPlan> {
        self.forms.clone()
    }

    fn downloads(&self) -> Vec<DocumentRequest> {
        self.downloads.clone()
    }
}
