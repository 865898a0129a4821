pub mod rules;
pub mod custom;
pub mod resolver;
pub mod revenue;

pub use custom::{CustomReimbursementRule, CustomRuleFinder, CustomRuleValue};
pub use resolver::{find_reimbursement_rule, get_reimbursement_rule, ReimbursementRule, RuleReference};
pub use revenue::{find_all_booking_reimbursements, BookingReimbursement, ReimbursementOutcome, RevenueAccumulator};
pub use rules::{RuleGroup, StandardRule, REGULAR_RULES};

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReimbursementError {
    #[error("Booking {0} has no use date")]
    MissingDateUsed(Uuid),

    #[error("No reimbursement rule applies to booking {0}")]
    NoApplicableRule(Uuid),

    #[error("Unknown reimbursement rule: {0}")]
    UnknownRule(String),

    #[error("Invalid custom reimbursement rule {id}: {reason}")]
    InvalidCustomRule {
        id: Uuid,
        reason: String,
    },
}

pub type ReimbursementResult<T> = Result<T, ReimbursementError>;
