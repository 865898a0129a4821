use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tunables of the pricing engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FinanceSettings {
    /// Pricing points on which already processed pricings may be left in
    /// place when an older event is priced or cancelled.
    pub override_pricing_ordering_on_pricing_points: Vec<Uuid>,
    pub price_events_batch_size: usize,
    /// Events ordered before this instant are never priced.
    pub min_date_to_price: DateTime<Utc>,
    /// Most recent events are left for the next run, in case an older
    /// one is still being written.
    pub pricing_grace_period_seconds: i64,
}

impl Default for FinanceSettings {
    fn default() -> Self {
        Self {
            override_pricing_ordering_on_pricing_points: Vec::new(),
            price_events_batch_size: 100,
            min_date_to_price: Utc
                .with_ymd_and_hms(2021, 12, 31, 23, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            pricing_grace_period_seconds: 60,
        }
    }
}
