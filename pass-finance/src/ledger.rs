use std::collections::{BTreeMap, HashMap};

use pass_catalog::{Booking, Venue};
use pass_reimbursement::{CustomReimbursementRule, CustomRuleFinder};
use pass_shared::FinanceAuditEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BookingFinanceIncident, FinanceEvent, Pricing, PricingLog, PricingStatus};
use crate::settings::FinanceSettings;
use crate::{FinanceError, FinanceResult};

/// In-memory finance state of one or several pricing points.
///
/// Every operation takes `&mut self` for its whole duration, which is
/// what serializes the work done on a pricing point. Operations check
/// everything that can fail before touching any entry, so a returned
/// error always leaves the ledger as it was.
#[derive(Debug, Default)]
pub struct FinanceLedger {
    pub(crate) settings: FinanceSettings,
    pub(crate) venues: HashMap<Uuid, Venue>,
    pub(crate) bookings: HashMap<Uuid, Booking>,
    pub(crate) incidents: HashMap<Uuid, BookingFinanceIncident>,
    pub(crate) events: BTreeMap<i64, FinanceEvent>,
    pub(crate) pricings: BTreeMap<i64, Pricing>,
    pub(crate) pricing_logs: Vec<PricingLog>,
    pub(crate) custom_rules: Vec<CustomReimbursementRule>,
    pub(crate) audit: Vec<FinanceAuditEvent>,
    next_event_id: i64,
    next_pricing_id: i64,
}

/// Flat, serializable form of a ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerSnapshot {
    pub venues: Vec<Venue>,
    pub bookings: Vec<Booking>,
    pub incidents: Vec<BookingFinanceIncident>,
    pub custom_rules: Vec<CustomReimbursementRule>,
    pub events: Vec<FinanceEvent>,
    pub pricings: Vec<Pricing>,
    pub pricing_logs: Vec<PricingLog>,
}

impl FinanceLedger {
    pub fn new(settings: FinanceSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Rebuild a ledger. Fails on the first invalid custom rule.
    pub fn from_snapshot(snapshot: LedgerSnapshot, settings: FinanceSettings) -> FinanceResult<Self> {
        let mut ledger = Self::new(settings);
        for rule in snapshot.custom_rules {
            ledger.add_custom_rule(rule)?;
        }
        for venue in snapshot.venues {
            ledger.add_venue(venue);
        }
        for booking in snapshot.bookings {
            ledger.add_booking(booking);
        }
        for incident in snapshot.incidents {
            ledger.add_incident(incident);
        }
        for event in snapshot.events {
            ledger.next_event_id = ledger.next_event_id.max(event.id);
            ledger.events.insert(event.id, event);
        }
        for pricing in snapshot.pricings {
            ledger.next_pricing_id = ledger.next_pricing_id.max(pricing.id);
            ledger.pricings.insert(pricing.id, pricing);
        }
        ledger.pricing_logs = snapshot.pricing_logs;
        Ok(ledger)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut venues: Vec<Venue> = self.venues.values().cloned().collect();
        venues.sort_by_key(|venue| venue.id);
        let mut bookings: Vec<Booking> = self.bookings.values().cloned().collect();
        bookings.sort_by_key(|booking| booking.id);
        let mut incidents: Vec<BookingFinanceIncident> = self.incidents.values().cloned().collect();
        incidents.sort_by_key(|incident| incident.id);

        LedgerSnapshot {
            venues,
            bookings,
            incidents,
            custom_rules: self.custom_rules.clone(),
            events: self.events.values().cloned().collect(),
            pricings: self.pricings.values().cloned().collect(),
            pricing_logs: self.pricing_logs.clone(),
        }
    }

    pub fn settings(&self) -> &FinanceSettings {
        &self.settings
    }

    pub fn add_venue(&mut self, venue: Venue) {
        self.venues.insert(venue.id, venue);
    }

    pub fn add_booking(&mut self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn add_incident(&mut self, incident: BookingFinanceIncident) {
        self.incidents.insert(incident.id, incident);
    }

    pub fn add_custom_rule(&mut self, rule: CustomReimbursementRule) -> FinanceResult<()> {
        rule.validate()?;
        self.custom_rules.push(rule);
        Ok(())
    }

    pub fn venue(&self, venue_id: &Uuid) -> Option<&Venue> {
        self.venues.get(venue_id)
    }

    pub fn booking(&self, booking_id: &Uuid) -> Option<&Booking> {
        self.bookings.get(booking_id)
    }

    pub fn booking_mut(&mut self, booking_id: &Uuid) -> Option<&mut Booking> {
        self.bookings.get_mut(booking_id)
    }

    pub fn incident(&self, incident_id: &Uuid) -> Option<&BookingFinanceIncident> {
        self.incidents.get(incident_id)
    }

    pub fn event(&self, event_id: i64) -> Option<&FinanceEvent> {
        self.events.get(&event_id)
    }

    pub fn events(&self) -> impl Iterator<Item = &FinanceEvent> {
        self.events.values()
    }

    pub fn pricing(&self, pricing_id: i64) -> Option<&Pricing> {
        self.pricings.get(&pricing_id)
    }

    pub fn pricings(&self) -> impl Iterator<Item = &Pricing> {
        self.pricings.values()
    }

    /// The pricing of an event that has not been cancelled, if any.
    pub fn active_pricing(&self, event_id: i64) -> Option<&Pricing> {
        self.pricings
            .values()
            .find(|pricing| pricing.event_id == event_id && pricing.status != PricingStatus::Cancelled)
    }

    pub fn pricing_logs(&self) -> &[PricingLog] {
        &self.pricing_logs
    }

    pub fn audit_trail(&self) -> &[FinanceAuditEvent] {
        &self.audit
    }

    /// Index of the custom rules known to the ledger. Build it once per
    /// batch.
    pub fn custom_rule_finder(&self) -> CustomRuleFinder {
        CustomRuleFinder::new(self.custom_rules.iter().cloned())
    }

    /// Change the status of a pricing, typically once it has been paid.
    pub fn set_pricing_status(&mut self, pricing_id: i64, status: PricingStatus) -> FinanceResult<()> {
        let pricing = self
            .pricings
            .get_mut(&pricing_id)
            .ok_or(FinanceError::PricingNotFound(pricing_id))?;
        pricing.status = status;
        Ok(())
    }

    pub(crate) fn get_event(&self, event_id: i64) -> FinanceResult<&FinanceEvent> {
        self.events.get(&event_id).ok_or(FinanceError::EventNotFound(event_id))
    }

    pub(crate) fn get_event_mut(&mut self, event_id: i64) -> FinanceResult<&mut FinanceEvent> {
        self.events.get_mut(&event_id).ok_or(FinanceError::EventNotFound(event_id))
    }

    pub(crate) fn get_booking(&self, booking_id: &Uuid) -> FinanceResult<&Booking> {
        self.bookings
            .get(booking_id)
            .ok_or(FinanceError::BookingNotFound(*booking_id))
    }

    pub(crate) fn get_incident(&self, incident_id: &Uuid) -> FinanceResult<&BookingFinanceIncident> {
        self.incidents
            .get(incident_id)
            .ok_or(FinanceError::IncidentNotFound(*incident_id))
    }

    pub(crate) fn get_venue(&self, venue_id: &Uuid) -> FinanceResult<&Venue> {
        self.venues.get(venue_id).ok_or(FinanceError::VenueNotFound(*venue_id))
    }

    pub(crate) fn next_event_id(&mut self) -> i64 {
        self.next_event_id += 1;
        self.next_event_id
    }

    pub(crate) fn next_pricing_id(&mut self) -> i64 {
        self.next_pricing_id += 1;
        self.next_pricing_id
    }

    pub(crate) fn record(&mut self, event: FinanceAuditEvent) {
        self.audit.push(event);
    }
}
