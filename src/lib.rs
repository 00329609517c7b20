pub mod config;
pub mod core;
pub mod domain;
pub mod edgar;
pub mod sniffer;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::fetcher::FilingsFetcher;
pub use edgar::{EdgarClient, EdgarEndpoints};
pub use sniffer::Filter;
pub use utils::error::{ProbeError, Result};
