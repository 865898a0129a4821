pub mod period;

pub use period::{reimbursement_rate_cutoff, revenue_period, revenue_year, RevenuePeriod};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
