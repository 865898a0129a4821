use chrono::Utc;
use pass_core::revenue_period;
use pass_shared::models::events::{DependentPricingsDeletedEvent, PricingCancelledEvent};
use pass_shared::FinanceAuditEvent;
use uuid::Uuid;

use crate::ledger::FinanceLedger;
use crate::models::{FinanceEvent, FinanceEventStatus, Pricing, PricingLog, PricingLogReason, PricingStatus};
use crate::{FinanceError, FinanceResult};

/// Pricings that were computed too early relative to an event.
#[derive(Debug, Default)]
pub(crate) struct DependentPricings {
    pub(crate) pricing_ids: Vec<i64>,
    pub(crate) event_ids: Vec<i64>,
}

impl FinanceLedger {
    /// Collect the pricings of the event's pricing point and revenue
    /// period that come after the event in pricing order.
    ///
    /// Fails on the first one that can no longer be deleted, unless the
    /// pricing point is allowed to keep them. `overrides` replaces the
    /// configured list when it is not empty.
    pub(crate) fn find_dependent_pricings(
        &self,
        event: &FinanceEvent,
        overrides: &[Uuid],
    ) -> FinanceResult<DependentPricings> {
        let pricing_point_id = event
            .pricing_point_id
            .ok_or_else(|| FinanceError::PricingPointNotFound(format!("event {} has no pricing point", event.id)))?;
        let key = event
            .ordering_key()
            .ok_or_else(|| FinanceError::MissingDate(format!("event {} has no pricing ordering date", event.id)))?;
        let period = revenue_period(event.value_date)?;
        let overriding = if overrides.is_empty() {
            self.settings.override_pricing_ordering_on_pricing_points.as_slice()
        } else {
            overrides
        };

        let mut dependents = DependentPricings::default();
        for pricing in self.pricings.values() {
            if pricing.pricing_point_id != pricing_point_id || !period.contains(pricing.value_date) {
                continue;
            }
            let Some(pricing_key) = self.events.get(&pricing.event_id).and_then(FinanceEvent::ordering_key) else {
                continue;
            };
            if pricing_key <= key {
                continue;
            }
            if !pricing.status.is_deletable() {
                if overriding.contains(&pricing_point_id) {
                    tracing::info!(
                        event_being_priced_or_cancelled = event.id,
                        older_pricing = pricing.id,
                        older_pricing_status = ?pricing.status,
                        pricing_point = %pricing_point_id,
                        "Found non-deletable pricing for a pricing point that has an older event to price or cancel (special case for problematic pricing points)"
                    );
                    continue;
                }
                tracing::error!(
                    event_being_priced_or_cancelled = event.id,
                    older_pricing = pricing.id,
                    older_pricing_status = ?pricing.status,
                    pricing_point = %pricing_point_id,
                    "Found non-deletable pricing for a pricing point that has an older event to price or cancel"
                );
                return Err(FinanceError::NonCancellablePricing { pricing_id: pricing.id });
            }
            dependents.pricing_ids.push(pricing.id);
            dependents.event_ids.push(pricing.event_id);
        }
        Ok(dependents)
    }

    pub(crate) fn remove_dependent_pricings(
        &mut self,
        event: &FinanceEvent,
        dependents: DependentPricings,
        log_message: &str,
    ) {
        if dependents.pricing_ids.is_empty() {
            return;
        }
        let DependentPricings { pricing_ids, event_ids } = dependents;

        self.pricing_logs.retain(|log| !pricing_ids.contains(&log.pricing_id));
        for pricing_id in &pricing_ids {
            self.pricings.remove(pricing_id);
        }
        for event_id in &event_ids {
            if let Some(owner) = self.events.get_mut(event_id) {
                if owner.status == FinanceEventStatus::Priced {
                    owner.status = FinanceEventStatus::Ready;
                }
            }
        }

        let pricing_point_id = event.pricing_point_id.unwrap_or_default();
        tracing::info!(
            event_being_priced_or_cancelled = event.id,
            events_already_priced = ?event_ids,
            pricing_point = %pricing_point_id,
            "{}",
            log_message
        );
        self.record(FinanceAuditEvent::DependentPricingsDeleted(DependentPricingsDeletedEvent {
            event_being_priced_or_cancelled: event.id,
            pricing_point_id,
            deleted_pricing_ids: pricing_ids,
            events_already_priced: event_ids,
            message: log_message.to_string(),
        }));
    }

    /// Delete the pricings that were computed after `event` should have
    /// been, and put their events back in the queue.
    ///
    /// Returns the ids of the deleted pricings. Nothing is deleted when a
    /// [`FinanceError::NonCancellablePricing`] is returned.
    pub fn delete_dependent_pricings(
        &mut self,
        event_id: i64,
        log_message: &str,
        overrides: &[Uuid],
    ) -> FinanceResult<Vec<i64>> {
        let event = self.get_event(event_id)?.clone();
        let dependents = self.find_dependent_pricings(&event, overrides)?;
        let deleted = dependents.pricing_ids.clone();
        self.remove_dependent_pricings(&event, dependents, log_message);
        Ok(deleted)
    }

    /// Cancel the active pricing of an event, and delete everything that
    /// was priced after it.
    pub fn cancel_event_pricing(&mut self, event_id: i64, reason: PricingLogReason) -> FinanceResult<Option<Pricing>> {
        let event = self.get_event(event_id)?.clone();
        if event.pricing_point_id.is_none() {
            return Ok(None);
        }
        let Some(pricing_id) = self.active_pricing(event_id).map(|pricing| pricing.id) else {
            return Ok(None);
        };
        let status_before = self
            .pricings
            .get(&pricing_id)
            .map(|pricing| pricing.status)
            .ok_or(FinanceError::PricingNotFound(pricing_id))?;
        if !status_before.is_cancellable() {
            return Err(FinanceError::NonCancellablePricing { pricing_id });
        }

        let dependents = self.find_dependent_pricings(&event, &[])?;
        self.remove_dependent_pricings(&event, dependents, "Deleted pricings that depended on cancelled pricing");

        self.pricing_logs.push(PricingLog {
            pricing_id,
            status_before,
            status_after: PricingStatus::Cancelled,
            reason,
            timestamp: Utc::now(),
        });
        let pricing = self
            .pricings
            .get_mut(&pricing_id)
            .ok_or(FinanceError::PricingNotFound(pricing_id))?;
        pricing.status = PricingStatus::Cancelled;
        let pricing = pricing.clone();

        self.record(FinanceAuditEvent::PricingCancelled(PricingCancelledEvent {
            event_id,
            pricing_id,
            reason: format!("{:?}", reason),
        }));
        tracing::info!(event = event_id, pricing = pricing_id, "Cancelled pricing");
        Ok(Some(pricing))
    }

    /// Cancel the pricing of an event so that the next batch prices it
    /// again, e.g. after its amount or date changed.
    pub fn force_event_repricing(&mut self, event_id: i64, reason: PricingLogReason) -> FinanceResult<()> {
        self.cancel_event_pricing(event_id, reason)?;
        self.get_event_mut(event_id)?.status = FinanceEventStatus::Ready;
        tracing::info!(event = event_id, reason = ?reason, "Forced event repricing");
        Ok(())
    }
}
