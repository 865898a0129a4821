use chrono::{DateTime, Utc};
use pass_shared::money::to_eurocents;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subcategory::{ReimbursementRuleChoice, Subcategory};

/// A purchase of one stock by a beneficiary, flattened so that the
/// reimbursement and pricing code never has to walk relationships.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    /// Unit price, in euros
    pub amount: Decimal,
    pub quantity: u32,
    pub date_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_date: Option<DateTime<Utc>>,
    pub stock_id: Uuid,
    pub offer_id: Uuid,
    pub offerer_id: Uuid,
    pub venue_id: Uuid,
    pub subcategory: Subcategory,
    #[serde(default)]
    pub is_educational: bool,
    /// Beginning of the booked event, if the offer is an event
    #[serde(default)]
    pub event_datetime: Option<DateTime<Utc>>,
    /// Pricing point of the venue when the booking was used
    #[serde(default)]
    pub pricing_point_id: Option<Uuid>,
}

impl Booking {
    pub fn new(amount: Decimal, quantity: u32, subcategory: Subcategory) -> Self {
        let venue_id = Uuid::new_v4();
        Self {
            id: Uuid::new_v4(),
            amount,
            quantity,
            date_used: None,
            cancellation_date: None,
            stock_id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            offerer_id: Uuid::new_v4(),
            venue_id,
            subcategory,
            is_educational: false,
            event_datetime: None,
            pricing_point_id: Some(venue_id),
        }
    }

    pub fn used_at(mut self, date_used: DateTime<Utc>) -> Self {
        self.date_used = Some(date_used);
        self
    }

    pub fn educational(mut self) -> Self {
        self.is_educational = true;
        self
    }

    pub fn total_amount(&self) -> Decimal {
        self.amount * Decimal::from(self.quantity)
    }

    pub fn total_amount_cents(&self) -> i64 {
        to_eurocents(self.total_amount())
    }

    pub fn reimbursement_rule(&self) -> ReimbursementRuleChoice {
        self.subcategory.reimbursement_rule
    }

    /// Whether the booking counts towards the yearly revenue that drives
    /// the degressive reimbursement rates.
    pub fn is_relevant_for_gradual_decreasing(&self) -> bool {
        !self.is_educational && self.reimbursement_rule() == ReimbursementRuleChoice::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subcategory::{LIVRE_PAPIER, SEANCE_CINE, VOD};

    #[test]
    fn test_total_amount() {
        let booking = Booking::new(Decimal::new(51, 1), 4, Subcategory::from_id(SEANCE_CINE).unwrap());
        assert_eq!(booking.total_amount(), Decimal::new(204, 1));
        assert_eq!(booking.total_amount_cents(), 2040);
    }

    #[test]
    fn test_gradual_decreasing_relevance() {
        let standard = Booking::new(Decimal::TEN, 1, Subcategory::from_id(SEANCE_CINE).unwrap());
        assert!(standard.is_relevant_for_gradual_decreasing());
        assert!(!standard.clone().educational().is_relevant_for_gradual_decreasing());

        let book = Booking::new(Decimal::TEN, 1, Subcategory::from_id(LIVRE_PAPIER).unwrap());
        assert!(!book.is_relevant_for_gradual_decreasing());

        let digital = Booking::new(Decimal::TEN, 1, Subcategory::from_id(VOD).unwrap());
        assert!(!digital.is_relevant_for_gradual_decreasing());
    }
}
