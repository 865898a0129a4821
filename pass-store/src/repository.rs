use async_trait::async_trait;
use pass_catalog::Booking;
use pass_finance::LedgerSnapshot;
use pass_reimbursement::CustomReimbursementRule;

use crate::StoreResult;

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;
}

/// Repository trait for custom reimbursement rules
#[async_trait]
pub trait CustomRuleRepository: Send + Sync {
    async fn list_custom_rules(&self) -> StoreResult<Vec<CustomReimbursementRule>>;

    /// Insert or replace (by id) a rule. Invalid rules are rejected.
    async fn save_custom_rule(&self, rule: &CustomReimbursementRule) -> StoreResult<()>;
}

/// Repository trait for the finance ledger
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn load_ledger(&self) -> StoreResult<LedgerSnapshot>;

    async fn save_ledger(&self, snapshot: &LedgerSnapshot) -> StoreResult<()>;
}
