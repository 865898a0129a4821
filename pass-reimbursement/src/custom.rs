use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pass_catalog::Booking;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::apply_rate;
use crate::{ReimbursementError, ReimbursementResult};

/// What a custom rule pays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomRuleValue {
    /// Eurocents paid per booked unit
    Amount(i64),
    Rate(Decimal),
}

/// A negotiated rule targeting one offer, one venue or every venue of an
/// offerer. It either pays a fixed amount per unit or applies a rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomReimbursementRule {
    pub id: Uuid,
    #[serde(default)]
    pub offer_id: Option<Uuid>,
    #[serde(default)]
    pub venue_id: Option<Uuid>,
    #[serde(default)]
    pub offerer_id: Option<Uuid>,
    /// Subcategory ids. Empty means every subcategory.
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub value: CustomRuleValue,
    pub timespan_start: DateTime<Utc>,
    #[serde(default)]
    pub timespan_end: Option<DateTime<Utc>>,
}

impl CustomReimbursementRule {
    fn blank(timespan_start: DateTime<Utc>, value: CustomRuleValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            offer_id: None,
            venue_id: None,
            offerer_id: None,
            subcategories: Vec::new(),
            value,
            timespan_start,
            timespan_end: None,
        }
    }

    pub fn for_offer(offer_id: Uuid, timespan_start: DateTime<Utc>, value: CustomRuleValue) -> Self {
        Self {
            offer_id: Some(offer_id),
            ..Self::blank(timespan_start, value)
        }
    }

    pub fn for_venue(venue_id: Uuid, timespan_start: DateTime<Utc>, value: CustomRuleValue) -> Self {
        Self {
            venue_id: Some(venue_id),
            ..Self::blank(timespan_start, value)
        }
    }

    pub fn for_offerer(offerer_id: Uuid, timespan_start: DateTime<Utc>, value: CustomRuleValue) -> Self {
        Self {
            offerer_id: Some(offerer_id),
            ..Self::blank(timespan_start, value)
        }
    }

    pub fn with_amount(mut self, cents_per_unit: i64) -> Self {
        self.value = CustomRuleValue::Amount(cents_per_unit);
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.value = CustomRuleValue::Rate(rate);
        self
    }

    /// `None` for rules that pay a fixed amount.
    pub fn rate(&self) -> Option<Decimal> {
        match self.value {
            CustomRuleValue::Amount(_) => None,
            CustomRuleValue::Rate(rate) => Some(rate),
        }
    }

    pub fn until(mut self, timespan_end: DateTime<Utc>) -> Self {
        self.timespan_end = Some(timespan_end);
        self
    }

    pub fn restricted_to<I, S>(mut self, subcategories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subcategories = subcategories.into_iter().map(Into::into).collect();
        self
    }

    /// Check the invariants the database used to enforce.
    pub fn validate(&self) -> ReimbursementResult<()> {
        let invalid = |reason: &str| ReimbursementError::InvalidCustomRule {
            id: self.id,
            reason: reason.to_string(),
        };

        let targets = [self.offer_id, self.venue_id, self.offerer_id]
            .iter()
            .filter(|target| target.is_some())
            .count();
        if targets != 1 {
            return Err(invalid("exactly one of offer, venue or offerer must be set"));
        }
        if let CustomRuleValue::Rate(rate) = self.value {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(invalid("rate must be between 0 and 1"));
            }
        }
        if let Some(end) = self.timespan_end {
            if end <= self.timespan_start {
                return Err(invalid("timespan must end after it starts"));
            }
        }
        Ok(())
    }

    pub fn is_active(&self, booking: &Booking) -> ReimbursementResult<bool> {
        let date_used = booking
            .date_used
            .ok_or(ReimbursementError::MissingDateUsed(booking.id))?;
        Ok(self.timespan_start <= date_used && self.timespan_end.map_or(true, |end| date_used < end))
    }

    pub fn is_relevant(&self, booking: &Booking) -> bool {
        if self.offer_id == Some(booking.offer_id) {
            return true;
        }
        if !self.subcategories.is_empty() && !self.subcategories.contains(&booking.subcategory.id) {
            return false;
        }
        if self.venue_id.is_some() && self.venue_id == booking.pricing_point_id {
            return true;
        }
        self.offerer_id == Some(booking.offerer_id)
    }

    pub fn matches(&self, booking: &Booking) -> ReimbursementResult<bool> {
        Ok(self.is_active(booking)? && self.is_relevant(booking))
    }

    /// Reimbursed amount in eurocents.
    pub fn apply(&self, booking: &Booking, custom_total_amount: Option<i64>) -> i64 {
        match self.value {
            CustomRuleValue::Amount(amount) => amount * i64::from(booking.quantity),
            CustomRuleValue::Rate(rate) => {
                apply_rate(rate, custom_total_amount.unwrap_or_else(|| booking.total_amount_cents()))
            }
        }
    }
}

/// Index of custom rules, bucketed by the entity they target so that
/// a booking only looks at the handful of rules that can concern it.
///
/// Build one per batch and pass it to every lookup of that batch.
#[derive(Debug, Default, Clone)]
pub struct CustomRuleFinder {
    by_offer: HashMap<Uuid, Vec<CustomReimbursementRule>>,
    by_venue: HashMap<Uuid, Vec<CustomReimbursementRule>>,
    by_offerer: HashMap<Uuid, Vec<CustomReimbursementRule>>,
}

impl CustomRuleFinder {
    pub fn new(rules: impl IntoIterator<Item = CustomReimbursementRule>) -> Self {
        let mut finder = Self::default();
        for rule in rules {
            if let Some(offer_id) = rule.offer_id {
                finder.by_offer.entry(offer_id).or_default().push(rule);
            } else if let Some(venue_id) = rule.venue_id {
                finder.by_venue.entry(venue_id).or_default().push(rule);
            } else if let Some(offerer_id) = rule.offerer_id {
                finder.by_offerer.entry(offerer_id).or_default().push(rule);
            } else {
                tracing::warn!(rule = %rule.id, "Ignoring custom reimbursement rule without target");
            }
        }
        finder
    }

    /// Offer rules first, then venue rules, then offerer rules. Within a
    /// bucket the first matching rule in load order wins.
    pub fn get_rule(&self, booking: &Booking) -> ReimbursementResult<Option<&CustomReimbursementRule>> {
        let candidates = [
            self.by_offer.get(&booking.offer_id),
            booking.pricing_point_id.and_then(|id| self.by_venue.get(&id)),
            self.by_offerer.get(&booking.offerer_id),
        ];
        for bucket in candidates.into_iter().flatten() {
            for rule in bucket {
                if rule.matches(booking)? {
                    return Ok(Some(rule));
                }
            }
        }
        Ok(None)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&CustomReimbursementRule> {
        self.rules().find(|rule| rule.id == id)
    }

    pub fn rules(&self) -> impl Iterator<Item = &CustomReimbursementRule> {
        self.by_offer
            .values()
            .chain(self.by_venue.values())
            .chain(self.by_offerer.values())
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pass_catalog::subcategory::{FESTIVAL_CINE, SEANCE_CINE};
    use pass_catalog::Subcategory;

    const FULL: CustomRuleValue = CustomRuleValue::Rate(Decimal::ONE);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 10, 9, 0, 0).unwrap()
    }

    fn booking() -> Booking {
        Booking::new(Decimal::new(12, 0), 2, Subcategory::from_id(SEANCE_CINE).unwrap()).used_at(now())
    }

    #[test]
    fn test_is_active() {
        let booking = booking();
        let yesterday = now() - Duration::days(1);
        let tomorrow = now() + Duration::days(1);

        let rule = CustomReimbursementRule::for_offer(booking.offer_id, yesterday, FULL);
        assert!(rule.is_active(&booking).unwrap());
        assert!(rule.clone().until(tomorrow).is_active(&booking).unwrap());
        assert!(!rule.clone().until(now()).is_active(&booking).unwrap());

        let starts_now = CustomReimbursementRule::for_offer(booking.offer_id, now(), FULL);
        assert!(starts_now.is_active(&booking).unwrap());

        let future = CustomReimbursementRule::for_offer(booking.offer_id, tomorrow, FULL);
        assert!(!future.is_active(&booking).unwrap());
    }

    #[test]
    fn test_is_relevant() {
        let booking = booking();
        let start = now() - Duration::days(1);

        assert!(CustomReimbursementRule::for_offer(booking.offer_id, start, FULL).is_relevant(&booking));
        assert!(!CustomReimbursementRule::for_offer(Uuid::new_v4(), start, FULL).is_relevant(&booking));

        let offerer_rule = CustomReimbursementRule::for_offerer(booking.offerer_id, start, FULL);
        assert!(offerer_rule.is_relevant(&booking));
        assert!(offerer_rule.clone().restricted_to([SEANCE_CINE]).is_relevant(&booking));
        assert!(!offerer_rule.restricted_to([FESTIVAL_CINE]).is_relevant(&booking));

        let venue_rule = CustomReimbursementRule::for_venue(booking.pricing_point_id.unwrap(), start, FULL);
        assert!(venue_rule.is_relevant(&booking));
        assert!(!CustomReimbursementRule::for_venue(Uuid::new_v4(), start, FULL).is_relevant(&booking));
    }

    #[test]
    fn test_apply() {
        let booking = booking();
        let start = now() - Duration::days(1);

        let amount_rule = CustomReimbursementRule::for_offer(booking.offer_id, start, CustomRuleValue::Amount(1000));
        assert_eq!(amount_rule.apply(&booking, None), 2000);
        assert_eq!(amount_rule.apply(&booking, Some(100)), 2000);
        assert_eq!(amount_rule.rate(), None);

        let rate_rule = amount_rule.with_rate(Decimal::new(8, 1));
        assert_eq!(rate_rule.apply(&booking, None), 1920);
        assert_eq!(rate_rule.apply(&booking, Some(1001)), 801);
        assert_eq!(rate_rule.rate(), Some(Decimal::new(8, 1)));
    }

    #[test]
    fn test_validate() {
        let start = now();
        let half = CustomRuleValue::Rate(Decimal::new(5, 1));
        assert!(CustomReimbursementRule::for_offer(Uuid::new_v4(), start, half).validate().is_ok());

        let mut two_targets = CustomReimbursementRule::for_offer(Uuid::new_v4(), start, half);
        two_targets.venue_id = Some(Uuid::new_v4());
        assert!(two_targets.validate().is_err());

        let mut no_target = CustomReimbursementRule::for_offer(Uuid::new_v4(), start, half);
        no_target.offer_id = None;
        assert!(no_target.validate().is_err());

        assert!(CustomReimbursementRule::for_offer(Uuid::new_v4(), start, CustomRuleValue::Rate(Decimal::new(15, 1)))
            .validate()
            .is_err());
        assert!(CustomReimbursementRule::for_offer(Uuid::new_v4(), start, half)
            .until(start)
            .validate()
            .is_err());
    }

    #[test]
    fn test_rule_without_value_does_not_deserialize() {
        let json = format!(
            r#"{{"id": "{}", "offer_id": "{}", "timespan_start": "2023-01-01T00:00:00Z"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<CustomReimbursementRule>(&json).is_err());

        let json = json.replacen('{', r#"{"value": {"AMOUNT": 500}, "#, 1);
        let rule: CustomReimbursementRule = serde_json::from_str(&json).unwrap();
        assert_eq!(rule.value, CustomRuleValue::Amount(500));
    }

    #[test]
    fn test_finder_precedence() {
        let booking = booking();
        let start = now() - Duration::days(1);
        let offerer_rule =
            CustomReimbursementRule::for_offerer(booking.offerer_id, start, CustomRuleValue::Amount(100));
        let venue_rule = CustomReimbursementRule::for_venue(
            booking.pricing_point_id.unwrap(),
            start,
            CustomRuleValue::Amount(200),
        );
        let offer_rule = CustomReimbursementRule::for_offer(booking.offer_id, start, CustomRuleValue::Amount(300));

        let finder = CustomRuleFinder::new([offerer_rule.clone(), venue_rule.clone(), offer_rule.clone()]);
        assert_eq!(finder.rules().count(), 3);
        assert_eq!(finder.get_rule(&booking).unwrap(), Some(&offer_rule));

        let finder = CustomRuleFinder::new([offerer_rule.clone(), venue_rule.clone()]);
        assert_eq!(finder.get_rule(&booking).unwrap(), Some(&venue_rule));

        let finder = CustomRuleFinder::new([offerer_rule.clone()]);
        assert_eq!(finder.get_rule(&booking).unwrap(), Some(&offerer_rule));
        assert_eq!(finder.find_by_id(offerer_rule.id), Some(&offerer_rule));
    }

    #[test]
    fn test_finder_skips_inactive_and_irrelevant_rules() {
        let booking = booking();
        let start = now() - Duration::days(10);
        let expired = CustomReimbursementRule::for_offer(booking.offer_id, start, CustomRuleValue::Amount(100))
            .until(now() - Duration::days(5));
        let other_subcategory =
            CustomReimbursementRule::for_offerer(booking.offerer_id, start, CustomRuleValue::Amount(100))
                .restricted_to([FESTIVAL_CINE]);

        let finder = CustomRuleFinder::new([expired, other_subcategory]);
        assert_eq!(finder.get_rule(&booking).unwrap(), None);
        assert_eq!(CustomRuleFinder::default().rules().count(), 0);
    }
}
