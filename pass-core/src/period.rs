//! Accounting calendar.
//!
//! Revenue is tracked per calendar year in the accounting timezone
//! (Europe/Paris). Year boundaries always fall in winter time, so the
//! boundaries are computed with the fixed CET offset.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

const ACCOUNTING_UTC_OFFSET_SECONDS: i32 = 3600;

fn accounting_offset() -> FixedOffset {
    FixedOffset::east_opt(ACCOUNTING_UTC_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// First and last instants (UTC) of an accounting year, both inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenuePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RevenuePeriod {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

pub fn revenue_year(value_date: DateTime<Utc>) -> i32 {
    value_date.with_timezone(&accounting_offset()).year()
}

pub fn revenue_period(value_date: DateTime<Utc>) -> CoreResult<RevenuePeriod> {
    let year = revenue_year(value_date);
    let first_second = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CoreError::InvalidDate(format!("January 1st of {}", year)))?;
    let last_second = NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|day| day.and_hms_micro_opt(23, 59, 59, 999_999))
        .ok_or_else(|| CoreError::InvalidDate(format!("December 31st of {}", year)))?;

    let offset = accounting_offset();
    let start = offset
        .from_local_datetime(&first_second)
        .single()
        .ok_or_else(|| CoreError::InvalidDate(first_second.to_string()))?;
    let end = offset
        .from_local_datetime(&last_second)
        .single()
        .ok_or_else(|| CoreError::InvalidDate(last_second.to_string()))?;

    Ok(RevenuePeriod {
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
    })
}

/// Midnight on 2021-09-01 in the accounting timezone (summer time).
/// Degressive rates changed on that date.
pub fn reimbursement_rate_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 8, 31, 22, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_period_after_midnight() {
        // 2021 in CET
        let value_date = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let period = revenue_period(value_date).unwrap();

        assert_eq!(period.start, Utc.with_ymd_and_hms(2020, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(
            period.end,
            Utc.with_ymd_and_hms(2021, 12, 31, 22, 59, 59).unwrap() + chrono::Duration::microseconds(999_999)
        );
    }

    #[test]
    fn test_revenue_period_before_midnight() {
        // Already 2022 in CET
        let value_date = Utc.with_ymd_and_hms(2021, 12, 31, 23, 30, 0).unwrap();
        let period = revenue_period(value_date).unwrap();

        assert_eq!(period.start, Utc.with_ymd_and_hms(2021, 12, 31, 23, 0, 0).unwrap());
        assert_eq!(revenue_year(value_date), 2022);
        assert!(period.contains(value_date));
    }

    #[test]
    fn test_cutoff() {
        let cutoff = reimbursement_rate_cutoff();
        assert_eq!(cutoff.to_rfc3339(), "2021-08-31T22:00:00+00:00");
    }
}
