use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error {status} - URL: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("No company found for ticker '{ticker}'")]
    CompanyNotFound { ticker: String },

    #[error("No {form} filings available")]
    NoFilings { form: String },

    #[error("Item '{item}' not found in filing")]
    ItemNotFound { item: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },

    #[error("Invalid filter expression '{expr}': {message}")]
    FilterParse { expr: String, message: String },

    #[error("Unable to find network interface: {name}")]
    InterfaceNotFound { name: String },

    #[error("Capture error: {message}")]
    Capture { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProbeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProbeError::Http(_) | ProbeError::HttpStatus { .. } => ErrorCategory::Network,
            ProbeError::SerializationError(_)
            | ProbeError::CsvError(_)
            | ProbeError::CompanyNotFound { .. }
            | ProbeError::NoFilings { .. }
            | ProbeError::ItemNotFound { .. } => ErrorCategory::Data,
            ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::MissingConfigError { .. }
            | ProbeError::FilterParse { .. } => ErrorCategory::Configuration,
            ProbeError::IoError(_)
            | ProbeError::InterfaceNotFound { .. }
            | ProbeError::Capture { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProbeError::NoFilings { .. } | ProbeError::ItemNotFound { .. } => ErrorSeverity::Low,
            ProbeError::Http(_)
            | ProbeError::HttpStatus { .. }
            | ProbeError::CompanyNotFound { .. } => ErrorSeverity::Medium,
            ProbeError::SerializationError(_)
            | ProbeError::CsvError(_)
            | ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::MissingConfigError { .. }
            | ProbeError::FilterParse { .. } => ErrorSeverity::High,
            ProbeError::IoError(_)
            | ProbeError::InterfaceNotFound { .. }
            | ProbeError::Capture { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ProbeError::Http(_) => "Check network connectivity and that sec.gov is reachable",
            ProbeError::HttpStatus { status: 403, .. } => {
                "SEC rejected the request; set a real 'Name email' identity"
            }
            ProbeError::HttpStatus { status: 404, .. } => {
                "Verify the CIK, accession number and document name"
            }
            ProbeError::HttpStatus { .. } => "Retry later; SEC may be rate limiting requests",
            ProbeError::IoError(_) => "Check that the output path exists and is writable",
            ProbeError::SerializationError(_) => "The EDGAR response format may have changed",
            ProbeError::CsvError(_) => "A filing field could not be written as a table row",
            ProbeError::CompanyNotFound { .. } => "Check the ticker symbol on sec.gov",
            ProbeError::NoFilings { .. } => "The company may not file this form type",
            ProbeError::ItemNotFound { .. } => "List the available items and pick one of them",
            ProbeError::ConfigError { .. }
            | ProbeError::ConfigValidationError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
            ProbeError::FilterParse { .. } => {
                "Use primitives like 'ip', 'tcp', 'host 10.0.0.1', 'port 53' joined by and/or/not"
            }
            ProbeError::InterfaceNotFound { .. } => {
                "Run with --list-interfaces to see available interfaces"
            }
            ProbeError::Capture { .. } => "Packet capture usually requires root or CAP_NET_RAW",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }

    /// Process exit code for a fatal error of this severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
