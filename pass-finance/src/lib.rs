pub mod models;
pub mod settings;
pub mod ledger;
pub mod events;
pub mod pricing;
pub mod invalidation;
pub mod batch;
pub mod validation;

pub use batch::{PricingFailure, PricingReport};
pub use events::EventSubject;
pub use ledger::{FinanceLedger, LedgerSnapshot};
pub use models::{
    BookingFinanceIncident, FinanceEvent, FinanceEventMotive, FinanceEventStatus, Pricing, PricingLine,
    PricingLineCategory, PricingLog, PricingLogReason, PricingStatus,
};
pub use settings::FinanceSettings;
pub use validation::{check_commercial_gesture_total_amount, create_commercial_gesture};

use pass_catalog::VenueError;
use pass_core::CoreError;
use pass_reimbursement::ReimbursementError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    #[error("Pricing {pricing_id} has already been processed and cannot be cancelled or deleted")]
    NonCancellablePricing {
        pricing_id: i64,
    },

    #[error("Finance event not found: {0}")]
    EventNotFound(i64),

    #[error("Finance event {0} has neither a booking nor an incident")]
    EventWithoutSubject(i64),

    #[error("Pricing not found: {0}")]
    PricingNotFound(i64),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Booking finance incident not found: {0}")]
    IncidentNotFound(Uuid),

    #[error("Venue not found: {0}")]
    VenueNotFound(Uuid),

    #[error("Could not find pricing point: {0}")]
    PricingPointNotFound(String),

    #[error("No invoiced pricing for booking {0}")]
    OriginalPricingNotFound(Uuid),

    #[error("Unexpected finance event motive: {0:?}")]
    UnexpectedMotive(FinanceEventMotive),

    #[error("Missing date: {0}")]
    MissingDate(String),

    #[error("Invalid commercial gesture: {0}")]
    InvalidCommercialGesture(String),

    #[error(transparent)]
    Reimbursement(#[from] ReimbursementError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<VenueError> for FinanceError {
    fn from(err: VenueError) -> Self {
        match err {
            VenueError::NoPricingPoint(venue) => FinanceError::PricingPointNotFound(venue),
        }
    }
}

pub type FinanceResult<T> = Result<T, FinanceError>;
