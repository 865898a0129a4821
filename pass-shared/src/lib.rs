pub mod models;
pub mod money;

pub use models::events::FinanceAuditEvent;
pub use money::{round_to_integer, to_eurocents};
