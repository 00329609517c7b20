pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::ports::FormPlan;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use toml_config::{CompanyConfig, TomlConfig};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "edgar-probe")]
#[command(about = "Fetch SEC EDGAR filings, financials and exhibits for a set of companies")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Client identity sent to SEC ("Name email")
    #[arg(long, env = "EDGAR_IDENTITY")]
    pub identity: Option<String>,

    /// Ticker symbols or CIKs, overriding the configured companies
    #[arg(long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Form types to list, overriding the configured forms
    #[arg(long, value_delimiter = ',')]
    pub forms: Vec<String>,

    /// Directory that relative download paths are saved under
    #[arg(long)]
    pub download_dir: Option<String>,

    /// Skip the exhibit downloads
    #[arg(long)]
    pub skip_downloads: bool,

    /// Show the resolved plan without contacting EDGAR
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// File (or built-in defaults) with CLI flags layered on top.
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        config.apply_env_identity();

        if let Some(identity) = &self.identity {
            config.edgar.identity = identity.clone();
        }
        if !self.tickers.is_empty() {
            config.companies = self
                .tickers
                .iter()
                .map(|ticker| CompanyConfig {
                    ticker: ticker.trim().to_string(),
                })
                .collect();
        }
        if !self.forms.is_empty() {
            config.forms = self
                .forms
                .iter()
                .map(|form| {
                    // keep item settings for forms that were already configured
                    config
                        .forms
                        .iter()
                        .find(|plan| plan.form.eq_ignore_ascii_case(form.trim()))
                        .cloned()
                        .unwrap_or_else(|| FormPlan {
                            form: form.trim().to_string(),
                            items: Vec::new(),
                            count_phrase: None,
                            annex: false,
                        })
                })
                .collect();
        }
        if let Some(dir) = &self.download_dir {
            config.edgar.download_dir = dir.clone();
        }
        if self.skip_downloads {
            config.downloads.clear();
        }
        Ok(config)
    }
}
