pub mod app_config;
pub mod repository;
pub mod json_repo;

pub use app_config::{Config, LogConfig};
pub use json_repo::JsonFileStore;
pub use repository::{BookingRepository, CustomRuleRepository, LedgerRepository};

use pass_reimbursement::ReimbursementError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No {0} file configured")]
    NotConfigured(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    InvalidRule(#[from] ReimbursementError),
}

pub type StoreResult<T> = Result<T, StoreError>;
