use pass_catalog::Booking;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::custom::{CustomReimbursementRule, CustomRuleFinder};
use crate::rules::{RuleGroup, StandardRule, REGULAR_RULES};
use crate::{ReimbursementError, ReimbursementResult};

/// The rule a booking ends up being reimbursed with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "rule", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReimbursementRule {
    Standard(StandardRule),
    Custom(CustomReimbursementRule),
}

impl ReimbursementRule {
    pub fn apply(&self, booking: &Booking, custom_total_amount: Option<i64>) -> i64 {
        match self {
            ReimbursementRule::Standard(rule) => rule.apply(booking, custom_total_amount),
            ReimbursementRule::Custom(rule) => rule.apply(booking, custom_total_amount),
        }
    }

    /// `None` for custom rules that pay a fixed amount.
    pub fn rate(&self) -> Option<Decimal> {
        match self {
            ReimbursementRule::Standard(rule) => Some(rule.rate()),
            ReimbursementRule::Custom(rule) => rule.rate(),
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        match self {
            ReimbursementRule::Standard(rule) => Some(rule.description()),
            ReimbursementRule::Custom(_) => None,
        }
    }

    pub fn group(&self) -> RuleGroup {
        match self {
            ReimbursementRule::Standard(rule) => rule.group(),
            ReimbursementRule::Custom(_) => RuleGroup::Custom,
        }
    }

    pub fn custom_rule_id(&self) -> Option<Uuid> {
        match self {
            ReimbursementRule::Standard(_) => None,
            ReimbursementRule::Custom(rule) => Some(rule.id),
        }
    }

    /// How a pricing remembers which rule it was computed with.
    pub fn reference(&self) -> RuleReference {
        match self {
            ReimbursementRule::Standard(rule) => RuleReference::Standard(rule.description().to_string()),
            ReimbursementRule::Custom(rule) => RuleReference::Custom(rule.id),
        }
    }
}

/// Persisted pointer to a rule: a standard rule is known by its
/// description, a custom rule by its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleReference {
    Standard(String),
    Custom(Uuid),
}

/// Pick the rule for a used booking given the cumulative revenue of its
/// pricing point, this booking included.
///
/// A matching custom rule always wins. Otherwise the catalog is scanned:
/// the book rule above 20 000 € stops the scan, else the rule yielding the
/// smallest amount is kept, ties going to the first declared.
pub fn get_reimbursement_rule(
    booking: &Booking,
    finder: &CustomRuleFinder,
    cumulative_revenue: i64,
) -> ReimbursementResult<ReimbursementRule> {
    if let Some(rule) = finder.get_rule(booking)? {
        return Ok(ReimbursementRule::Custom(rule.clone()));
    }

    let mut best: Option<(StandardRule, i64)> = None;
    for rule in REGULAR_RULES {
        if !rule.matches(booking, cumulative_revenue)? {
            continue;
        }
        if rule == StandardRule::BookAbove20000 {
            return Ok(ReimbursementRule::Standard(rule));
        }
        let amount = rule.apply(booking, None);
        match best {
            Some((_, best_amount)) if best_amount <= amount => {}
            _ => best = Some((rule, amount)),
        }
    }

    best.map(|(rule, _)| ReimbursementRule::Standard(rule))
        .ok_or(ReimbursementError::NoApplicableRule(booking.id))
}

/// Resolve a rule reference stored on a pricing.
pub fn find_reimbursement_rule(
    reference: &RuleReference,
    finder: &CustomRuleFinder,
) -> ReimbursementResult<ReimbursementRule> {
    match reference {
        RuleReference::Standard(description) => StandardRule::from_description(description)
            .map(ReimbursementRule::Standard)
            .ok_or_else(|| ReimbursementError::UnknownRule(description.clone())),
        RuleReference::Custom(id) => finder
            .find_by_id(*id)
            .cloned()
            .map(ReimbursementRule::Custom)
            .ok_or_else(|| ReimbursementError::UnknownRule(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::CustomRuleValue;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pass_catalog::subcategory::{LIVRE_PAPIER, SEANCE_CINE, VOD};
    use pass_catalog::Subcategory;

    fn used_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 6, 1, 12, 0, 0).unwrap()
    }

    fn booking(subcategory: &str) -> Booking {
        Booking::new(Decimal::new(40, 0), 1, Subcategory::from_id(subcategory).unwrap()).used_at(used_at())
    }

    fn rule_for(booking: &Booking, revenue: i64) -> ReimbursementRule {
        get_reimbursement_rule(booking, &CustomRuleFinder::default(), revenue).unwrap()
    }

    #[test]
    fn test_standard_scan_keeps_smallest_amount() {
        let booking = booking(SEANCE_CINE);
        assert_eq!(rule_for(&booking, 100), ReimbursementRule::Standard(StandardRule::PhysicalOffers));
        assert_eq!(rule_for(&booking, 20_000_01), ReimbursementRule::Standard(StandardRule::Between20000And40000));
        assert_eq!(rule_for(&booking, 40_000_01), ReimbursementRule::Standard(StandardRule::Between40000And150000));
        assert_eq!(rule_for(&booking, 150_000_01), ReimbursementRule::Standard(StandardRule::Above150000));
    }

    #[test]
    fn test_legacy_tiers_before_cutoff() {
        let booking = booking(SEANCE_CINE).used_at(Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap());
        assert_eq!(
            rule_for(&booking, 150_000_01),
            ReimbursementRule::Standard(StandardRule::LegacyPreSeptember2021Above150000)
        );
    }

    #[test]
    fn test_books_and_digital() {
        let book = booking(LIVRE_PAPIER);
        assert_eq!(rule_for(&book, 100), ReimbursementRule::Standard(StandardRule::BookBelow20000));
        assert_eq!(rule_for(&book, 20_000_01), ReimbursementRule::Standard(StandardRule::BookAbove20000));

        let digital = booking(VOD);
        assert_eq!(rule_for(&digital, 20_000_01), ReimbursementRule::Standard(StandardRule::DigitalThings));
        assert_eq!(rule_for(&booking(SEANCE_CINE).educational(), 150_000_01).group(), RuleGroup::Standard);
    }

    #[test]
    fn test_custom_rule_wins_even_when_more_generous() {
        let booking = booking(SEANCE_CINE);
        let custom = CustomReimbursementRule::for_offer(
            booking.offer_id,
            used_at() - Duration::days(1),
            CustomRuleValue::Rate(Decimal::ONE),
        );
        let finder = CustomRuleFinder::new([custom.clone()]);

        let rule = get_reimbursement_rule(&booking, &finder, 150_000_01).unwrap();
        assert_eq!(rule, ReimbursementRule::Custom(custom.clone()));
        assert_eq!(rule.apply(&booking, None), 40_00);
        assert_eq!(rule.group(), RuleGroup::Custom);
        assert_eq!(rule.description(), None);
        assert_eq!(rule.custom_rule_id(), Some(custom.id));
    }

    #[test]
    fn test_missing_date_used() {
        let mut booking = booking(SEANCE_CINE);
        booking.date_used = None;
        assert!(matches!(
            get_reimbursement_rule(&booking, &CustomRuleFinder::default(), 0),
            Err(ReimbursementError::MissingDateUsed(_))
        ));
    }

    #[test]
    fn test_find_reimbursement_rule() {
        let custom = CustomReimbursementRule::for_offerer(Uuid::new_v4(), used_at(), CustomRuleValue::Amount(10));
        let finder = CustomRuleFinder::new([custom.clone()]);

        let standard = ReimbursementRule::Standard(StandardRule::Between40000And150000);
        assert_eq!(find_reimbursement_rule(&standard.reference(), &finder).unwrap(), standard);
        assert_eq!(
            find_reimbursement_rule(&RuleReference::Custom(custom.id), &finder).unwrap(),
            ReimbursementRule::Custom(custom)
        );
        assert!(matches!(
            find_reimbursement_rule(&RuleReference::Custom(Uuid::new_v4()), &finder),
            Err(ReimbursementError::UnknownRule(_))
        ));
        assert!(matches!(
            find_reimbursement_rule(&RuleReference::Standard("Remboursement mystère".into()), &finder),
            Err(ReimbursementError::UnknownRule(_))
        ));
    }
}
