use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct EventPricedEvent {
    pub event_id: i64,
    pub pricing_id: i64,
    pub pricing_point_id: Uuid,
    pub amount: i64,
    pub revenue: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct DependentPricingsDeletedEvent {
    pub event_being_priced_or_cancelled: i64,
    pub pricing_point_id: Uuid,
    pub deleted_pricing_ids: Vec<i64>,
    pub events_already_priced: Vec<i64>,
    pub message: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PricingCancelledEvent {
    pub event_id: i64,
    pub pricing_id: i64,
    pub reason: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct EventCancelledEvent {
    pub event_id: i64,
    pub booking_id: Uuid,
    pub pricing_id: Option<i64>,
}

/// Everything the finance ledger records about pricing-order maintenance.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceAuditEvent {
    EventPriced(EventPricedEvent),
    DependentPricingsDeleted(DependentPricingsDeletedEvent),
    PricingCancelled(PricingCancelledEvent),
    EventCancelled(EventCancelledEvent),
}
