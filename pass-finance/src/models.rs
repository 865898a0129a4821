use chrono::{DateTime, Utc};
use pass_reimbursement::RuleReference;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceEventStatus {
    /// Waiting for the venue to get a pricing point
    Pending,
    Ready,
    Priced,
    Cancelled,
    NotToBePriced,
}

impl FinanceEventStatus {
    pub fn is_cancellable(&self) -> bool {
        matches!(self, FinanceEventStatus::Pending | FinanceEventStatus::Ready | FinanceEventStatus::Priced)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceEventMotive {
    BookingUsed,
    BookingUsedAfterCancellation,
    BookingUnused,
    BookingCancelledAfterUse,
    IncidentReversalOfOriginalEvent,
    IncidentNewPrice,
    IncidentCommercialGesture,
}

impl FinanceEventMotive {
    pub fn is_booking_used(&self) -> bool {
        matches!(self, FinanceEventMotive::BookingUsed | FinanceEventMotive::BookingUsedAfterCancellation)
    }

    pub fn is_incident(&self) -> bool {
        matches!(
            self,
            FinanceEventMotive::IncidentReversalOfOriginalEvent
                | FinanceEventMotive::IncidentNewPrice
                | FinanceEventMotive::IncidentCommercialGesture
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingStatus {
    Cancelled,
    Validated,
    Processed,
    Invoiced,
}

impl PricingStatus {
    /// Pricings that can be thrown away and recomputed.
    pub fn is_deletable(&self) -> bool {
        matches!(self, PricingStatus::Validated | PricingStatus::Cancelled)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, PricingStatus::Validated)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingLineCategory {
    OffererRevenue,
    OffererContribution,
    PassCultureCommission,
    CommercialGesture,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingLogReason {
    MarkAsUnused,
    ChangeAmount,
    ChangeDate,
    GenerateCashflow,
    GenerateInvoice,
}

/// Something that happened to a booking and that may have to be priced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinanceEvent {
    pub id: i64,
    pub motive: FinanceEventMotive,
    pub status: FinanceEventStatus,
    pub value_date: DateTime<Utc>,
    pub pricing_point_id: Option<Uuid>,
    pub pricing_ordering_date: Option<DateTime<Utc>>,
    pub booking_id: Option<Uuid>,
    pub incident_id: Option<Uuid>,
    pub venue_id: Uuid,
}

impl FinanceEvent {
    /// Position of the event in the pricing order of its pricing point.
    pub fn ordering_key(&self) -> Option<(DateTime<Utc>, i64)> {
        self.pricing_ordering_date.map(|date| (date, self.id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingLine {
    pub category: PricingLineCategory,
    /// Eurocents, negative when owed to the offerer
    pub amount: i64,
}

impl PricingLine {
    pub fn new(category: PricingLineCategory, amount: i64) -> Self {
        Self { category, amount }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub id: i64,
    pub event_id: i64,
    /// Only set for pricings of individual use events
    pub booking_id: Option<Uuid>,
    pub status: PricingStatus,
    pub pricing_point_id: Uuid,
    pub venue_id: Uuid,
    pub value_date: DateTime<Utc>,
    /// Sum of the lines, in eurocents
    pub amount: i64,
    /// Description of the standard rule, empty for custom rules
    pub standard_rule: String,
    pub custom_rule_id: Option<Uuid>,
    /// Revenue of the pricing point once this pricing is accounted for
    pub revenue: i64,
    pub lines: Vec<PricingLine>,
    pub creation_date: DateTime<Utc>,
}

impl Pricing {
    pub fn rule_reference(&self) -> RuleReference {
        match self.custom_rule_id {
            Some(id) => RuleReference::Custom(id),
            None => RuleReference::Standard(self.standard_rule.clone()),
        }
    }

    pub fn line_amount(&self, category: PricingLineCategory) -> Option<i64> {
        self.lines.iter().find(|line| line.category == category).map(|line| line.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingLog {
    pub pricing_id: i64,
    pub status_before: PricingStatus,
    pub status_after: PricingStatus,
    pub reason: PricingLogReason,
    pub timestamp: DateTime<Utc>,
}

/// Correction of an already reimbursed booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingFinanceIncident {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// Eurocents
    pub new_total_amount: i64,
    #[serde(default)]
    pub commercial_gesture_amount: Option<i64>,
}

impl BookingFinanceIncident {
    pub fn new(booking_id: Uuid, new_total_amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            new_total_amount,
            commercial_gesture_amount: None,
        }
    }

    pub fn commercial_gesture(booking_id: Uuid, amount: i64) -> Self {
        Self {
            commercial_gesture_amount: Some(amount),
            ..Self::new(booking_id, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_sets() {
        assert!(PricingStatus::Validated.is_deletable());
        assert!(PricingStatus::Cancelled.is_deletable());
        assert!(!PricingStatus::Processed.is_deletable());
        assert!(!PricingStatus::Invoiced.is_deletable());

        assert!(PricingStatus::Validated.is_cancellable());
        assert!(!PricingStatus::Cancelled.is_cancellable());
        assert!(!PricingStatus::Invoiced.is_cancellable());

        assert!(FinanceEventStatus::Priced.is_cancellable());
        assert!(!FinanceEventStatus::NotToBePriced.is_cancellable());
        assert!(!FinanceEventStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&FinanceEventStatus::NotToBePriced).unwrap(),
            "\"NOT_TO_BE_PRICED\""
        );
        assert_eq!(
            serde_json::to_string(&FinanceEventMotive::IncidentReversalOfOriginalEvent).unwrap(),
            "\"INCIDENT_REVERSAL_OF_ORIGINAL_EVENT\""
        );
    }
}
