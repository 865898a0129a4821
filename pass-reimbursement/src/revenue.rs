use std::collections::BTreeMap;

use pass_catalog::Booking;
use pass_core::revenue_year;
use serde::Serialize;
use uuid::Uuid;

use crate::custom::CustomRuleFinder;
use crate::resolver::{get_reimbursement_rule, ReimbursementRule};
use crate::{ReimbursementError, ReimbursementResult};

/// Running revenue per accounting year, in eurocents.
///
/// A booking's year is the year of its use date in the accounting
/// timezone (+01:00), not in UTC: a booking used on December 31st at
/// 23:30 UTC counts towards the next year.
#[derive(Debug, Default, Clone)]
pub struct RevenueAccumulator {
    totals: BTreeMap<i32, i64>,
}

impl RevenueAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, year: i32) -> i64 {
        self.totals.get(&year).copied().unwrap_or(0)
    }

    /// Add to the year's total and return the new total.
    pub fn add(&mut self, year: i32, cents: i64) -> i64 {
        let total = self.totals.entry(year).or_insert(0);
        *total += cents;
        *total
    }

    /// Cumulative revenue to use for `booking`: bookings subject to the
    /// degressive rates count towards it, the others only read it.
    pub fn revenue_for(&mut self, booking: &Booking) -> ReimbursementResult<i64> {
        let date_used = booking
            .date_used
            .ok_or(ReimbursementError::MissingDateUsed(booking.id))?;
        let year = revenue_year(date_used);
        if booking.is_relevant_for_gradual_decreasing() {
            Ok(self.add(year, booking.total_amount_cents()))
        } else {
            Ok(self.current(year))
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingReimbursement {
    pub booking_id: Uuid,
    pub rule: ReimbursementRule,
    /// Eurocents
    pub reimbursed_amount: i64,
}

#[derive(Debug)]
pub struct ReimbursementOutcome<'a> {
    pub booking: &'a Booking,
    pub result: ReimbursementResult<BookingReimbursement>,
}

/// Compute the reimbursement of each booking, in the given order.
///
/// Bookings are expected to belong to a single pricing point and to be
/// sorted by use date. A failing booking is reported and does not stop
/// the others.
pub fn find_all_booking_reimbursements<'a>(
    bookings: &'a [Booking],
    finder: &CustomRuleFinder,
) -> Vec<ReimbursementOutcome<'a>> {
    let mut accumulator = RevenueAccumulator::new();
    bookings
        .iter()
        .map(|booking| {
            let result = reimburse(booking, finder, &mut accumulator);
            if let Err(err) = &result {
                tracing::warn!(booking = %booking.id, error = %err, "Could not compute booking reimbursement");
            }
            ReimbursementOutcome { booking, result }
        })
        .collect()
}

fn reimburse(
    booking: &Booking,
    finder: &CustomRuleFinder,
    accumulator: &mut RevenueAccumulator,
) -> ReimbursementResult<BookingReimbursement> {
    let revenue = accumulator.revenue_for(booking)?;
    let rule = get_reimbursement_rule(booking, finder, revenue)?;
    Ok(BookingReimbursement {
        booking_id: booking.id,
        reimbursed_amount: rule.apply(booking, None),
        rule,
    })
}
