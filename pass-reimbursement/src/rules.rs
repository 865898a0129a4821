use chrono::{DateTime, Utc};
use pass_catalog::{Booking, ReimbursementRuleChoice};
use pass_core::reimbursement_rate_cutoff;
use pass_shared::money::round_to_integer;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ReimbursementError, ReimbursementResult};

/// Revenue thresholds of the degressive rates, in eurocents.
pub const REVENUE_THRESHOLD_20000: i64 = 20_000_00;
pub const REVENUE_THRESHOLD_40000: i64 = 40_000_00;
pub const REVENUE_THRESHOLD_150000: i64 = 150_000_00;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleGroup {
    Standard,
    Book,
    NotReimbursed,
    Custom,
    Deprecated,
}

impl RuleGroup {
    pub fn label(&self) -> &'static str {
        match self {
            RuleGroup::Standard => "Barème général",
            RuleGroup::Book => "Barème livres",
            RuleGroup::NotReimbursed => "Barème non remboursé",
            RuleGroup::Custom => "Barème dérogatoire",
            RuleGroup::Deprecated => "Barème désuet",
        }
    }
}

/// Built-in reimbursement rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardRule {
    EducationalOffers,
    DigitalThings,
    PhysicalOffers,
    LegacyPreSeptember2021Between20000And40000,
    LegacyPreSeptember2021Between40000And150000,
    LegacyPreSeptember2021Above150000,
    Between20000And40000,
    Between40000And150000,
    Above150000,
    BookBelow20000,
    BookAbove20000,
    /// Only used to price commercial gestures, never selected by the scan.
    CommercialGesture,
}

/// The catalog, in the order it is scanned.
pub const REGULAR_RULES: [StandardRule; 11] = [
    StandardRule::EducationalOffers,
    StandardRule::DigitalThings,
    StandardRule::PhysicalOffers,
    StandardRule::LegacyPreSeptember2021Between20000And40000,
    StandardRule::LegacyPreSeptember2021Between40000And150000,
    StandardRule::LegacyPreSeptember2021Above150000,
    StandardRule::Between20000And40000,
    StandardRule::Between40000And150000,
    StandardRule::Above150000,
    StandardRule::BookBelow20000,
    StandardRule::BookAbove20000,
];

const ALL_RULES: [StandardRule; 12] = [
    StandardRule::EducationalOffers,
    StandardRule::DigitalThings,
    StandardRule::PhysicalOffers,
    StandardRule::LegacyPreSeptember2021Between20000And40000,
    StandardRule::LegacyPreSeptember2021Between40000And150000,
    StandardRule::LegacyPreSeptember2021Above150000,
    StandardRule::Between20000And40000,
    StandardRule::Between40000And150000,
    StandardRule::Above150000,
    StandardRule::BookBelow20000,
    StandardRule::BookAbove20000,
    StandardRule::CommercialGesture,
];

impl StandardRule {
    /// Fraction of the booking total paid back to the offerer.
    pub fn rate(&self) -> Decimal {
        match self {
            StandardRule::EducationalOffers
            | StandardRule::PhysicalOffers
            | StandardRule::BookBelow20000
            | StandardRule::CommercialGesture => Decimal::ONE,
            StandardRule::DigitalThings => Decimal::ZERO,
            StandardRule::LegacyPreSeptember2021Between20000And40000
            | StandardRule::Between20000And40000
            | StandardRule::BookAbove20000 => Decimal::new(95, 2),
            StandardRule::LegacyPreSeptember2021Between40000And150000 => Decimal::new(85, 2),
            StandardRule::LegacyPreSeptember2021Above150000 => Decimal::new(70, 2),
            StandardRule::Between40000And150000 => Decimal::new(92, 2),
            StandardRule::Above150000 => Decimal::new(90, 2),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StandardRule::EducationalOffers => "Remboursement total pour les offres éducationnelles",
            StandardRule::DigitalThings => "Pas de remboursement pour les offres digitales",
            StandardRule::PhysicalOffers => "Remboursement total pour les offres physiques",
            StandardRule::LegacyPreSeptember2021Between20000And40000 => {
                "Remboursement à 95% entre 20 000 € et 40 000 € par lieu (<= 2021-08-31)"
            }
            StandardRule::LegacyPreSeptember2021Between40000And150000 => {
                "Remboursement à 85% entre 40 000 € et 150 000 € par lieu (<= 2021-08-31)"
            }
            StandardRule::LegacyPreSeptember2021Above150000 => {
                "Remboursement à 70% au dessus de 150 000 € par lieu (<= 2021-08-31)"
            }
            StandardRule::Between20000And40000 => {
                "Remboursement à 95% entre 20 000 € et 40 000 € par lieu (>= 2021-09-01)"
            }
            StandardRule::Between40000And150000 => {
                "Remboursement à 92% entre 40 000 € et 150 000 € par lieu (>= 2021-09-01)"
            }
            StandardRule::Above150000 => "Remboursement à 90% au dessus de 150 000 € par lieu (>= 2021-09-01)",
            StandardRule::BookBelow20000 => "Remboursement total pour les livres jusqu'à 20 000 € par lieu",
            StandardRule::BookAbove20000 => "Remboursement à 95% pour les livres au dessus de 20 000 € par lieu",
            StandardRule::CommercialGesture => "Remboursement total pour les gestes commerciaux",
        }
    }

    pub fn group(&self) -> RuleGroup {
        match self {
            StandardRule::EducationalOffers
            | StandardRule::PhysicalOffers
            | StandardRule::Between20000And40000
            | StandardRule::Between40000And150000
            | StandardRule::Above150000
            | StandardRule::CommercialGesture => RuleGroup::Standard,
            StandardRule::DigitalThings => RuleGroup::NotReimbursed,
            StandardRule::BookBelow20000 | StandardRule::BookAbove20000 => RuleGroup::Book,
            StandardRule::LegacyPreSeptember2021Between20000And40000
            | StandardRule::LegacyPreSeptember2021Between40000And150000
            | StandardRule::LegacyPreSeptember2021Above150000 => RuleGroup::Deprecated,
        }
    }

    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        match self {
            StandardRule::Between20000And40000
            | StandardRule::Between40000And150000
            | StandardRule::Above150000 => Some(reimbursement_rate_cutoff()),
            _ => None,
        }
    }

    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        match self {
            StandardRule::LegacyPreSeptember2021Between20000And40000
            | StandardRule::LegacyPreSeptember2021Between40000And150000
            | StandardRule::LegacyPreSeptember2021Above150000 => Some(reimbursement_rate_cutoff()),
            _ => None,
        }
    }

    /// `valid_from <= date_used < valid_until`, missing bounds are open.
    pub fn is_active(&self, booking: &Booking) -> ReimbursementResult<bool> {
        let date_used = booking
            .date_used
            .ok_or(ReimbursementError::MissingDateUsed(booking.id))?;
        let after_start = self.valid_from().map_or(true, |from| from <= date_used);
        let before_end = self.valid_until().map_or(true, |until| date_used < until);
        Ok(after_start && before_end)
    }

    pub fn is_relevant(&self, booking: &Booking, cumulative_revenue: i64) -> bool {
        let gradual = booking.is_relevant_for_gradual_decreasing();
        let is_book = !booking.is_educational && booking.reimbursement_rule() == ReimbursementRuleChoice::Book;
        match self {
            StandardRule::EducationalOffers => booking.is_educational,
            StandardRule::DigitalThings => {
                !booking.is_educational && booking.reimbursement_rule() == ReimbursementRuleChoice::NotReimbursed
            }
            StandardRule::PhysicalOffers => gradual,
            StandardRule::LegacyPreSeptember2021Between20000And40000 | StandardRule::Between20000And40000 => {
                gradual && REVENUE_THRESHOLD_20000 < cumulative_revenue && cumulative_revenue <= REVENUE_THRESHOLD_40000
            }
            StandardRule::LegacyPreSeptember2021Between40000And150000 | StandardRule::Between40000And150000 => {
                gradual
                    && REVENUE_THRESHOLD_40000 < cumulative_revenue
                    && cumulative_revenue <= REVENUE_THRESHOLD_150000
            }
            StandardRule::LegacyPreSeptember2021Above150000 | StandardRule::Above150000 => {
                gradual && cumulative_revenue > REVENUE_THRESHOLD_150000
            }
            StandardRule::BookBelow20000 => is_book && cumulative_revenue <= REVENUE_THRESHOLD_20000,
            StandardRule::BookAbove20000 => is_book && cumulative_revenue > REVENUE_THRESHOLD_20000,
            StandardRule::CommercialGesture => false,
        }
    }

    pub fn matches(&self, booking: &Booking, cumulative_revenue: i64) -> ReimbursementResult<bool> {
        Ok(self.is_active(booking)? && self.is_relevant(booking, cumulative_revenue))
    }

    /// Reimbursed amount in eurocents. `custom_total_amount` replaces the
    /// booking total, e.g. after a price incident.
    pub fn apply(&self, booking: &Booking, custom_total_amount: Option<i64>) -> i64 {
        apply_rate(self.rate(), custom_total_amount.unwrap_or_else(|| booking.total_amount_cents()))
    }

    pub fn from_description(description: &str) -> Option<Self> {
        ALL_RULES.iter().copied().find(|rule| rule.description() == description)
    }
}

pub(crate) fn apply_rate(rate: Decimal, base_cents: i64) -> i64 {
    round_to_integer(Decimal::from(base_cents) * rate)
}
