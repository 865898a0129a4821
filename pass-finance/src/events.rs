use chrono::{DateTime, Utc};
use pass_catalog::{Booking, PricingPointLink};
use pass_shared::models::events::EventCancelledEvent;
use pass_shared::FinanceAuditEvent;
use uuid::Uuid;

use crate::ledger::FinanceLedger;
use crate::models::{FinanceEvent, FinanceEventMotive, FinanceEventStatus, PricingLogReason};
use crate::{FinanceError, FinanceResult};

/// What a finance event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Booking(Uuid),
    Incident(Uuid),
}

impl FinanceLedger {
    /// Link between the booking's venue and the pricing point to use for
    /// a booking used at `booking.date_used`.
    pub fn get_pricing_point_link(&self, booking: &Booking) -> FinanceResult<&PricingPointLink> {
        let date_used = booking
            .date_used
            .ok_or_else(|| FinanceError::MissingDate(format!("booking {} has not been used", booking.id)))?;
        let venue = self.get_venue(&booking.venue_id)?;
        Ok(venue.pricing_point_link_at(date_used)?)
    }

    /// Position of a used booking in the pricing order of its pricing
    /// point: the latest of the link start, the event date and the use
    /// date.
    pub fn get_pricing_ordering_date(&self, booking: &Booking) -> FinanceResult<DateTime<Utc>> {
        let link = self.get_pricing_point_link(booking)?;
        let date_used = booking
            .date_used
            .ok_or_else(|| FinanceError::MissingDate(format!("booking {} has not been used", booking.id)))?;
        let event_date = booking.event_datetime.unwrap_or(date_used);
        Ok(link.start.max(event_date).max(date_used))
    }

    pub fn add_event(
        &mut self,
        motive: FinanceEventMotive,
        subject: EventSubject,
        incident_validation_date: Option<DateTime<Utc>>,
    ) -> FinanceResult<FinanceEvent> {
        let (booking_id, incident_id) = match subject {
            EventSubject::Booking(booking_id) if !motive.is_incident() => (booking_id, None),
            EventSubject::Incident(incident_id) if motive.is_incident() => {
                (self.get_incident(&incident_id)?.booking_id, Some(incident_id))
            }
            _ => return Err(FinanceError::UnexpectedMotive(motive)),
        };
        let booking = self.get_booking(&booking_id)?;
        let current_pricing_point_id = self.get_venue(&booking.venue_id)?.current_pricing_point_id();

        let (status, value_date, pricing_point_id, pricing_ordering_date) = match motive {
            FinanceEventMotive::BookingUsed | FinanceEventMotive::BookingUsedAfterCancellation => {
                let date_used = booking
                    .date_used
                    .ok_or_else(|| FinanceError::MissingDate(format!("booking {} has not been used", booking.id)))?;
                match current_pricing_point_id {
                    Some(pricing_point_id) => (
                        FinanceEventStatus::Ready,
                        date_used,
                        Some(pricing_point_id),
                        Some(self.get_pricing_ordering_date(booking)?),
                    ),
                    None => (FinanceEventStatus::Pending, date_used, None, None),
                }
            }
            // Never priced, so the value date does not matter.
            FinanceEventMotive::BookingUnused => (FinanceEventStatus::NotToBePriced, Utc::now(), None, None),
            FinanceEventMotive::BookingCancelledAfterUse => {
                let cancellation_date = booking.cancellation_date.ok_or_else(|| {
                    FinanceError::MissingDate(format!("booking {} has no cancellation date", booking.id))
                })?;
                (FinanceEventStatus::NotToBePriced, cancellation_date, None, None)
            }
            FinanceEventMotive::IncidentReversalOfOriginalEvent
            | FinanceEventMotive::IncidentNewPrice
            | FinanceEventMotive::IncidentCommercialGesture => {
                let validation_date = incident_validation_date.ok_or_else(|| {
                    FinanceError::MissingDate(format!("incident validation date is required for {:?}", motive))
                })?;
                match current_pricing_point_id {
                    Some(pricing_point_id) => (
                        FinanceEventStatus::Ready,
                        validation_date,
                        Some(pricing_point_id),
                        Some(validation_date),
                    ),
                    None => (FinanceEventStatus::Pending, validation_date, None, None),
                }
            }
        };

        let venue_id = booking.venue_id;
        let event = FinanceEvent {
            id: self.next_event_id(),
            motive,
            status,
            value_date,
            pricing_point_id,
            pricing_ordering_date,
            booking_id: incident_id.is_none().then_some(booking_id),
            incident_id,
            venue_id,
        };
        self.events.insert(event.id, event.clone());
        Ok(event)
    }

    /// Cancel the latest use-related event of a booking and its pricing.
    pub fn cancel_latest_event(&mut self, booking_id: &Uuid) -> FinanceResult<Option<FinanceEvent>> {
        let event_id = self
            .events
            .values()
            .filter(|event| {
                event.booking_id == Some(*booking_id) && event.motive.is_booking_used() && event.status.is_cancellable()
            })
            .map(|event| event.id)
            .max();

        let Some(event_id) = event_id else {
            if self.booking(booking_id).and_then(|booking| booking.date_used).is_some() {
                tracing::error!(booking = %booking_id, "No finance event to cancel");
            }
            return Ok(None);
        };

        let pricing = self.cancel_event_pricing(event_id, PricingLogReason::MarkAsUnused)?;
        let event = self.get_event_mut(event_id)?;
        event.status = FinanceEventStatus::Cancelled;
        let event = event.clone();

        let pricing_id = pricing.map(|pricing| pricing.id);
        self.record(FinanceAuditEvent::EventCancelled(EventCancelledEvent {
            event_id,
            booking_id: *booking_id,
            pricing_id,
        }));
        tracing::info!(booking = %booking_id, event = event_id, pricing = ?pricing_id, "Cancelled finance event and its pricing");
        Ok(Some(event))
    }

    /// Move the bookings of a stock to a new event date, recompute the
    /// ordering date of their events and reprice from the oldest one.
    ///
    /// Returns the event that was forced to be priced again.
    pub fn update_finance_event_pricing_date(
        &mut self,
        stock_id: &Uuid,
        new_beginning: Option<DateTime<Utc>>,
    ) -> FinanceResult<Option<i64>> {
        let mut stock_bookings: Vec<Booking> = self
            .bookings
            .values()
            .filter(|booking| booking.stock_id == *stock_id)
            .cloned()
            .collect();
        let Some(first) = stock_bookings.first() else {
            return Ok(None);
        };
        // No event of a venue without pricing point is ever ordered.
        let Some(pricing_point_id) = self.get_venue(&first.venue_id)?.current_pricing_point_id() else {
            for booking in &stock_bookings {
                if let Some(stored) = self.bookings.get_mut(&booking.id) {
                    stored.event_datetime = new_beginning;
                }
            }
            return Ok(None);
        };
        for booking in &mut stock_bookings {
            booking.event_datetime = new_beginning;
        }

        let mut stock_events: Vec<&FinanceEvent> = self
            .events
            .values()
            .filter(|event| {
                event.pricing_point_id == Some(pricing_point_id)
                    && event
                        .booking_id
                        .map_or(false, |id| stock_bookings.iter().any(|booking| booking.id == id))
            })
            .collect();
        stock_events.sort_by_key(|event| event.pricing_ordering_date);

        let mut oldest = stock_events.first().and_then(|event| event.pricing_ordering_date);
        let mut new_dates = Vec::with_capacity(stock_events.len());
        for event in &stock_events {
            let booking = stock_bookings
                .iter()
                .find(|booking| Some(booking.id) == event.booking_id)
                .ok_or_else(|| FinanceError::BookingNotFound(event.booking_id.unwrap_or_default()))?;
            let date = self.get_pricing_ordering_date(booking)?;
            oldest = Some(oldest.map_or(date, |oldest| oldest.min(date)));
            new_dates.push((event.id, event.pricing_ordering_date, date));
        }

        let previous_beginnings: Vec<(Uuid, Option<DateTime<Utc>>)> = stock_bookings
            .iter()
            .filter_map(|booking| self.bookings.get(&booking.id).map(|stored| (booking.id, stored.event_datetime)))
            .collect();
        for booking in &stock_bookings {
            if let Some(stored) = self.bookings.get_mut(&booking.id) {
                stored.event_datetime = new_beginning;
            }
        }
        if new_dates.is_empty() {
            return Ok(None);
        }
        for (event_id, _, date) in &new_dates {
            self.get_event_mut(*event_id)?.pricing_ordering_date = Some(*date);
        }

        let first_event = oldest.and_then(|oldest| {
            self.events
                .values()
                .filter(|event| {
                    event.pricing_point_id == Some(pricing_point_id)
                        && matches!(event.status, FinanceEventStatus::Ready | FinanceEventStatus::Priced)
                        && event.pricing_ordering_date.map_or(false, |date| date >= oldest)
                })
                .filter_map(|event| event.ordering_key())
                .min()
                .map(|(_, id)| id)
        });
        let Some(first_event) = first_event else {
            return Ok(None);
        };

        if let Err(err) = self.force_event_repricing(first_event, PricingLogReason::ChangeDate) {
            for (event_id, previous, _) in new_dates {
                if let Some(event) = self.events.get_mut(&event_id) {
                    event.pricing_ordering_date = previous;
                }
            }
            for (booking_id, previous) in previous_beginnings {
                if let Some(booking) = self.bookings.get_mut(&booking_id) {
                    booking.event_datetime = previous;
                }
            }
            return Err(err);
        }
        Ok(Some(first_event))
    }
}
