use std::collections::HashSet;

use chrono::Utc;
use pass_core::revenue_period;
use pass_reimbursement::{find_reimbursement_rule, get_reimbursement_rule, CustomRuleFinder, ReimbursementRule, StandardRule};
use pass_shared::models::events::EventPricedEvent;
use pass_shared::FinanceAuditEvent;
use uuid::Uuid;

use crate::ledger::FinanceLedger;
use crate::models::{
    FinanceEvent, FinanceEventMotive, FinanceEventStatus, Pricing, PricingLine, PricingLineCategory, PricingStatus,
};
use crate::{FinanceError, FinanceResult};

impl FinanceLedger {
    /// Price a READY event.
    ///
    /// Returns `None` when the event is not ready, and the existing pricing
    /// when the event has already been priced. Pricings computed too early
    /// relative to this event are deleted first.
    pub fn price_event(
        &mut self,
        event_id: i64,
        finder: &CustomRuleFinder,
        overrides: &[Uuid],
    ) -> FinanceResult<Option<Pricing>> {
        let event = self.get_event(event_id)?.clone();
        if event.status != FinanceEventStatus::Ready {
            return Ok(None);
        }
        if let Some(pricing) = self.active_pricing(event_id) {
            return Ok(Some(pricing.clone()));
        }

        let dependents = self.find_dependent_pricings(&event, overrides)?;
        let excluded: HashSet<i64> = dependents.pricing_ids.iter().copied().collect();
        let mut pricing = self.compute_pricing(&event, finder, &excluded)?;

        self.remove_dependent_pricings(&event, dependents, "Deleted pricings priced too early");
        pricing.id = self.next_pricing_id();
        self.pricings.insert(pricing.id, pricing.clone());
        self.get_event_mut(event_id)?.status = FinanceEventStatus::Priced;

        self.record(FinanceAuditEvent::EventPriced(EventPricedEvent {
            event_id,
            pricing_id: pricing.id,
            pricing_point_id: pricing.pricing_point_id,
            amount: pricing.amount,
            revenue: pricing.revenue,
            timestamp: pricing.creation_date,
        }));
        tracing::debug!(event = event_id, pricing = pricing.id, amount = pricing.amount, "Priced event");
        Ok(Some(pricing))
    }

    /// Revenue of the event's pricing point over the event's revenue
    /// period, without the event's own booking. Eurocents.
    pub fn current_revenue(&self, event: &FinanceEvent) -> FinanceResult<i64> {
        self.revenue_excluding(event, &HashSet::new())
    }

    fn revenue_excluding(&self, event: &FinanceEvent, excluded: &HashSet<i64>) -> FinanceResult<i64> {
        let Some(pricing_point_id) = event.pricing_point_id else {
            return Ok(0);
        };
        let period = revenue_period(event.value_date)?;

        let mut revenue = 0;
        for pricing in self.pricings.values() {
            if pricing.pricing_point_id != pricing_point_id
                || pricing.status == PricingStatus::Cancelled
                || excluded.contains(&pricing.id)
                || !period.contains(pricing.value_date)
            {
                continue;
            }
            // Incident pricings carry no booking and do not count.
            let Some(booking_id) = pricing.booking_id else {
                continue;
            };
            if event.booking_id == Some(booking_id) {
                continue;
            }
            let booking = self.get_booking(&booking_id)?;
            if booking.is_educational {
                continue;
            }
            revenue += booking.total_amount_cents();
        }
        Ok(revenue)
    }

    fn invoiced_pricing(&self, booking_id: &Uuid) -> FinanceResult<&Pricing> {
        self.pricings
            .values()
            .find(|pricing| pricing.booking_id == Some(*booking_id) && pricing.status == PricingStatus::Invoiced)
            .ok_or(FinanceError::OriginalPricingNotFound(*booking_id))
    }

    /// Build the pricing of an event. The returned pricing has no id yet.
    fn compute_pricing(
        &self,
        event: &FinanceEvent,
        finder: &CustomRuleFinder,
        excluded: &HashSet<i64>,
    ) -> FinanceResult<Pricing> {
        let pricing_point_id = event
            .pricing_point_id
            .ok_or_else(|| FinanceError::PricingPointNotFound(format!("event {} has no pricing point", event.id)))?;
        let (booking_id, incident) = match (event.booking_id, event.incident_id) {
            (Some(booking_id), _) => (booking_id, None),
            (None, Some(incident_id)) => {
                let incident = self.get_incident(&incident_id)?;
                (incident.booking_id, Some(incident))
            }
            (None, None) => return Err(FinanceError::EventWithoutSubject(event.id)),
        };
        let mut booking = self.get_booking(&booking_id)?.clone();
        booking.pricing_point_id = Some(pricing_point_id);
        let require_incident = || incident.ok_or(FinanceError::IncidentNotFound(event.incident_id.unwrap_or_default()));

        let mut revenue = self.revenue_excluding(event, excluded)?;
        // Collective bookings do not count towards the revenue.
        if !booking.is_educational {
            match event.motive {
                FinanceEventMotive::BookingUsed | FinanceEventMotive::BookingUsedAfterCancellation => {
                    revenue += booking.total_amount_cents();
                }
                FinanceEventMotive::IncidentNewPrice | FinanceEventMotive::IncidentCommercialGesture => {
                    revenue += require_incident()?.new_total_amount;
                }
                _ => {}
            }
        }

        let (rule, amount, lines, pricing_booking_id) = match event.motive {
            FinanceEventMotive::BookingUsed | FinanceEventMotive::BookingUsedAfterCancellation => {
                let rule = get_reimbursement_rule(&booking, finder, revenue)?;
                let amount = -rule.apply(&booking, None);
                let offerer_revenue = -booking.total_amount_cents();
                let lines = vec![
                    PricingLine::new(PricingLineCategory::OffererRevenue, offerer_revenue),
                    PricingLine::new(PricingLineCategory::OffererContribution, amount - offerer_revenue),
                ];
                (rule, amount, lines, Some(booking.id))
            }
            FinanceEventMotive::IncidentReversalOfOriginalEvent => {
                let original = self.invoiced_pricing(&booking.id)?;
                let rule = find_reimbursement_rule(&original.rule_reference(), finder)?;
                let lines = original
                    .lines
                    .iter()
                    .map(|line| PricingLine::new(line.category, -line.amount))
                    .collect();
                (rule, -original.amount, lines, None)
            }
            FinanceEventMotive::IncidentNewPrice => {
                let new_total_amount = require_incident()?.new_total_amount;
                let original = self.invoiced_pricing(&booking.id)?;
                let rule = find_reimbursement_rule(&original.rule_reference(), finder)?;
                let amount = -rule.apply(&booking, Some(new_total_amount));
                let offerer_revenue = -new_total_amount;
                let lines = vec![
                    PricingLine::new(PricingLineCategory::OffererRevenue, offerer_revenue),
                    PricingLine::new(PricingLineCategory::OffererContribution, amount - offerer_revenue),
                ];
                (rule, amount, lines, None)
            }
            FinanceEventMotive::IncidentCommercialGesture => {
                let gesture = require_incident()?.commercial_gesture_amount.ok_or_else(|| {
                    FinanceError::InvalidCommercialGesture(format!("incident of event {} has no amount", event.id))
                })?;
                let amount = -gesture;
                let lines = vec![
                    PricingLine::new(PricingLineCategory::OffererRevenue, amount),
                    PricingLine::new(PricingLineCategory::OffererContribution, 0),
                ];
                (ReimbursementRule::Standard(StandardRule::CommercialGesture), amount, lines, None)
            }
            FinanceEventMotive::BookingUnused | FinanceEventMotive::BookingCancelledAfterUse => {
                return Err(FinanceError::UnexpectedMotive(event.motive));
            }
        };

        Ok(Pricing {
            id: 0,
            event_id: event.id,
            booking_id: pricing_booking_id,
            status: PricingStatus::Validated,
            pricing_point_id,
            venue_id: booking.venue_id,
            value_date: event.value_date,
            amount,
            standard_rule: rule.description().unwrap_or_default().to_string(),
            custom_rule_id: rule.custom_rule_id(),
            revenue,
            lines,
            creation_date: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSubject;
    use chrono::{DateTime, TimeZone};
    use pass_catalog::{Booking, Subcategory, Venue};
    use pass_reimbursement::{CustomReimbursementRule, CustomRuleValue};
    use rust_decimal::Decimal;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, month, day, 12, 0, 0).unwrap()
    }

    struct Fixture {
        ledger: FinanceLedger,
        venue_id: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let venue = Venue::self_priced(Uuid::new_v4(), at(1, 1));
            let venue_id = venue.id;
            let mut ledger = FinanceLedger::default();
            ledger.add_venue(venue);
            Self { ledger, venue_id }
        }

        fn used_booking(&mut self, subcategory: &str, euros: i64, used: DateTime<Utc>) -> Uuid {
            let mut booking = Booking::new(Decimal::new(euros, 0), 1, Subcategory::from_id(subcategory).unwrap());
            booking.venue_id = self.venue_id;
            booking.pricing_point_id = Some(self.venue_id);
            let booking = booking.used_at(used);
            let booking_id = booking.id;
            self.ledger.add_booking(booking);
            booking_id
        }

        fn used_event(&mut self, booking_id: Uuid) -> i64 {
            self.ledger
                .add_event(FinanceEventMotive::BookingUsed, EventSubject::Booking(booking_id), None)
                .unwrap()
                .id
        }

        fn price(&mut self, event_id: i64) -> Pricing {
            let finder = self.ledger.custom_rule_finder();
            self.ledger.price_event(event_id, &finder, &[]).unwrap().unwrap()
        }
    }

    #[test]
    fn test_price_used_booking() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("SEANCE_CINE", 10, at(3, 1));
        let event_id = fixture.used_event(booking_id);

        let pricing = fixture.price(event_id);
        assert_eq!(pricing.status, PricingStatus::Validated);
        assert_eq!(pricing.amount, -1000);
        assert_eq!(pricing.revenue, 1000);
        assert_eq!(pricing.booking_id, Some(booking_id));
        assert_eq!(pricing.standard_rule, StandardRule::PhysicalOffers.description());
        assert_eq!(pricing.custom_rule_id, None);
        assert_eq!(pricing.line_amount(PricingLineCategory::OffererRevenue), Some(-1000));
        assert_eq!(pricing.line_amount(PricingLineCategory::OffererContribution), Some(0));
        assert_eq!(fixture.ledger.event(event_id).unwrap().status, FinanceEventStatus::Priced);
    }

    #[test]
    fn test_price_digital_booking() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("VOD", 14, at(3, 1));
        let event_id = fixture.used_event(booking_id);

        let pricing = fixture.price(event_id);
        assert_eq!(pricing.amount, 0);
        assert_eq!(pricing.revenue, 1400);
        assert_eq!(pricing.line_amount(PricingLineCategory::OffererRevenue), Some(-1400));
        assert_eq!(pricing.line_amount(PricingLineCategory::OffererContribution), Some(1400));
    }

    #[test]
    fn test_price_with_custom_rule() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("SEANCE_CINE", 10, at(3, 1));
        let offer_id = fixture.ledger.booking(&booking_id).unwrap().offer_id;
        let rule = CustomReimbursementRule::for_offer(offer_id, at(1, 1), CustomRuleValue::Amount(600));
        let rule_id = rule.id;
        fixture.ledger.add_custom_rule(rule).unwrap();
        let event_id = fixture.used_event(booking_id);

        let pricing = fixture.price(event_id);
        assert_eq!(pricing.amount, -600);
        assert_eq!(pricing.standard_rule, "");
        assert_eq!(pricing.custom_rule_id, Some(rule_id));
        assert_eq!(pricing.line_amount(PricingLineCategory::OffererContribution), Some(400));
    }

    #[test]
    fn test_price_event_is_idempotent() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("SEANCE_CINE", 10, at(3, 1));
        let event_id = fixture.used_event(booking_id);

        let pricing = fixture.price(event_id);
        let finder = fixture.ledger.custom_rule_finder();
        // Already priced: the event is no longer ready.
        assert_eq!(fixture.ledger.price_event(event_id, &finder, &[]).unwrap(), None);

        fixture.ledger.get_event_mut(event_id).unwrap().status = FinanceEventStatus::Ready;
        assert_eq!(fixture.ledger.price_event(event_id, &finder, &[]).unwrap(), Some(pricing));
        assert_eq!(fixture.ledger.pricings().count(), 1);
    }

    #[test]
    fn test_pending_event_is_not_priced() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("SEANCE_CINE", 10, at(3, 1));
        let event_id = fixture.used_event(booking_id);
        fixture.ledger.get_event_mut(event_id).unwrap().status = FinanceEventStatus::Pending;

        let finder = CustomRuleFinder::default();
        assert_eq!(fixture.ledger.price_event(event_id, &finder, &[]).unwrap(), None);
    }

    #[test]
    fn test_current_revenue_excludes_own_booking_and_cancelled_pricings() {
        let mut fixture = Fixture::new();
        let first = fixture.used_booking("SEANCE_CINE", 10, at(3, 1));
        let second = fixture.used_booking("SEANCE_CINE", 20, at(3, 2));
        let book = fixture.used_booking("LIVRE_PAPIER", 30, at(3, 3));
        let first_event = fixture.used_event(first);
        let second_event = fixture.used_event(second);
        let book_event = fixture.used_event(book);
        fixture.price(first_event);
        fixture.price(second_event);
        fixture.price(book_event);

        let event = fixture.ledger.event(second_event).unwrap().clone();
        assert_eq!(fixture.ledger.current_revenue(&event).unwrap(), 1000 + 3000);

        fixture
            .ledger
            .cancel_event_pricing(book_event, crate::models::PricingLogReason::MarkAsUnused)
            .unwrap();
        assert_eq!(fixture.ledger.current_revenue(&event).unwrap(), 1000);
    }

    #[test]
    fn test_educational_booking_does_not_count() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("SEANCE_CINE", 500, at(3, 1));
        fixture.ledger.booking_mut(&booking_id).unwrap().is_educational = true;
        let event_id = fixture.used_event(booking_id);

        let pricing = fixture.price(event_id);
        assert_eq!(pricing.revenue, 0);
        assert_eq!(pricing.amount, -50_000);
        assert_eq!(pricing.standard_rule, StandardRule::EducationalOffers.description());
    }

    #[test]
    fn test_unused_motive_cannot_be_priced() {
        let mut fixture = Fixture::new();
        let booking_id = fixture.used_booking("SEANCE_CINE", 10, at(3, 1));
        let event_id = fixture.used_event(booking_id);
        fixture.ledger.get_event_mut(event_id).unwrap().motive = FinanceEventMotive::BookingUnused;

        let finder = CustomRuleFinder::default();
        assert!(matches!(
            fixture.ledger.price_event(event_id, &finder, &[]),
            Err(FinanceError::UnexpectedMotive(FinanceEventMotive::BookingUnused))
        ));
        assert_eq!(fixture.ledger.event(event_id).unwrap().status, FinanceEventStatus::Ready);
    }
}
