use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ledger::FinanceLedger;
use crate::models::FinanceEventStatus;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricingFailure {
    pub event_id: i64,
    pub pricing_point_id: Uuid,
    pub error: String,
}

/// Outcome of a `price_events` run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PricingReport {
    pub priced: Vec<i64>,
    /// Events left for a later run because their pricing point failed
    pub skipped: Vec<i64>,
    pub failures: Vec<PricingFailure>,
}

impl PricingReport {
    pub fn errored_pricing_points(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.failures.iter().map(|failure| failure.pricing_point_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl FinanceLedger {
    /// READY events with a pricing point and no active pricing, ordered
    /// within `window`, in pricing order.
    fn events_to_price(&self, window: (DateTime<Utc>, DateTime<Utc>)) -> Vec<(DateTime<Utc>, i64, Uuid)> {
        let mut events: Vec<(DateTime<Utc>, i64, Uuid)> = self
            .events
            .values()
            .filter(|event| event.status == FinanceEventStatus::Ready)
            .filter_map(|event| {
                let pricing_point_id = event.pricing_point_id?;
                let date = event.pricing_ordering_date?;
                Some((date, event.id, pricing_point_id))
            })
            .filter(|(date, _, _)| window.0 <= *date && *date <= window.1)
            .filter(|(_, event_id, _)| self.active_pricing(*event_id).is_none())
            .collect();
        events.sort();
        events
    }

    /// Price every event that is ready, in pricing order.
    ///
    /// Events ordered in the last grace period are left for the next run.
    /// Once an event of a pricing point fails, the remaining events of
    /// that pricing point are skipped until the next run.
    pub fn price_events(&mut self, now: DateTime<Utc>) -> PricingReport {
        let threshold = now - Duration::seconds(self.settings.pricing_grace_period_seconds);
        let window = (self.settings.min_date_to_price, threshold);
        let batch_size = self.settings.price_events_batch_size.max(1);
        let finder = self.custom_rule_finder();

        let mut report = PricingReport::default();
        let mut errored_pricing_points: HashSet<Uuid> = HashSet::new();
        // Re-selected at each loop: pricing an event may put later ones
        // back in the queue.
        let loops = self.events_to_price(window).len().div_ceil(batch_size);
        let mut last_event: Option<(DateTime<Utc>, i64)> = None;

        for _ in 0..loops {
            let batch: Vec<(DateTime<Utc>, i64, Uuid)> = self
                .events_to_price(window)
                .into_iter()
                .filter(|(date, event_id, _)| last_event.map_or(true, |last| (*date, *event_id) > last))
                .take(batch_size)
                .collect();
            tracing::debug!(size = batch.len(), "Fetched batch of events to price");

            for (date, event_id, pricing_point_id) in batch {
                last_event = Some((date, event_id));
                if errored_pricing_points.contains(&pricing_point_id) {
                    report.skipped.push(event_id);
                    continue;
                }
                match self.price_event(event_id, &finder, &[]) {
                    Ok(Some(_)) => report.priced.push(event_id),
                    Ok(None) => {}
                    Err(err) => {
                        errored_pricing_points.insert(pricing_point_id);
                        tracing::info!(pricing_point = %pricing_point_id, "Ignoring further events from pricing point");
                        tracing::error!(
                            event = event_id,
                            pricing_point = %pricing_point_id,
                            error = %err,
                            "Could not price event"
                        );
                        report.failures.push(PricingFailure {
                            event_id,
                            pricing_point_id,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            priced = report.priced.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Priced finance events"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSubject;
    use crate::models::FinanceEventMotive;
    use crate::settings::FinanceSettings;
    use chrono::TimeZone;
    use pass_catalog::{Booking, Subcategory, Venue};
    use rust_decimal::Decimal;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, day, 12, 0, 0).unwrap()
    }

    fn ledger_with_events(settings: FinanceSettings, days: &[u32]) -> (FinanceLedger, Vec<i64>) {
        let venue = Venue::self_priced(Uuid::new_v4(), at(1));
        let venue_id = venue.id;
        let mut ledger = FinanceLedger::new(settings);
        ledger.add_venue(venue);
        let mut event_ids = Vec::new();
        for day in days {
            let mut booking = Booking::new(Decimal::TEN, 1, Subcategory::from_id("SEANCE_CINE").unwrap());
            booking.venue_id = venue_id;
            booking.pricing_point_id = Some(venue_id);
            let booking = booking.used_at(at(*day));
            let booking_id = booking.id;
            ledger.add_booking(booking);
            let event = ledger
                .add_event(FinanceEventMotive::BookingUsed, EventSubject::Booking(booking_id), None)
                .unwrap();
            event_ids.push(event.id);
        }
        (ledger, event_ids)
    }

    #[test]
    fn test_prices_in_ordering_date_order() {
        let settings = FinanceSettings {
            price_events_batch_size: 2,
            ..FinanceSettings::default()
        };
        let (mut ledger, event_ids) = ledger_with_events(settings, &[9, 3, 5, 7, 4]);

        let report = ledger.price_events(at(20));
        assert_eq!(
            report.priced,
            vec![event_ids[1], event_ids[4], event_ids[2], event_ids[3], event_ids[0]]
        );
        assert!(report.failures.is_empty());

        let revenues: Vec<i64> = report
            .priced
            .iter()
            .map(|event_id| ledger.active_pricing(*event_id).unwrap().revenue)
            .collect();
        assert_eq!(revenues, vec![1000, 2000, 3000, 4000, 5000]);
    }

    #[test]
    fn test_grace_period_and_min_date() {
        let settings = FinanceSettings {
            min_date_to_price: at(4),
            ..FinanceSettings::default()
        };
        let (mut ledger, event_ids) = ledger_with_events(settings, &[3, 5, 10]);

        // The last event is within the grace period.
        let report = ledger.price_events(at(10) + Duration::seconds(30));
        assert_eq!(report.priced, vec![event_ids[1]]);

        let report = ledger.price_events(at(10) + Duration::seconds(61));
        assert_eq!(report.priced, vec![event_ids[2]]);
        assert_eq!(ledger.event(event_ids[0]).unwrap().status, FinanceEventStatus::Ready);
    }

    #[test]
    fn test_failing_pricing_point_is_skipped() {
        let (mut ledger, event_ids) = ledger_with_events(FinanceSettings::default(), &[3, 5]);
        let booking_id = ledger.event(event_ids[0]).unwrap().booking_id.unwrap();
        ledger.booking_mut(&booking_id).unwrap().date_used = None;

        let report = ledger.price_events(at(20));
        assert!(report.priced.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].event_id, event_ids[0]);
        assert_eq!(report.skipped, vec![event_ids[1]]);
        assert_eq!(report.errored_pricing_points().len(), 1);
    }
}
