use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use shared::{PeriodKind, Result, SharedError};

/// Canonical identifier and inclusive UTC bounds of one period instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeriod {
    pub period_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Sentinel period id for all-time snapshots.
pub const ALL_TIME_PERIOD_ID: &str = "all-time";

/// Maps a period kind and reference date to the canonical period id and
/// its inclusive date bounds, all in UTC. Weeks are ISO Monday-start
/// weeks; the all-time end bound is the instant of resolution, so it
/// advances on every regeneration.
///
/// `Custom` periods carry explicit bounds and cannot be resolved from a
/// reference date; hitting that arm is a configuration error.
pub fn resolve(kind: PeriodKind, reference: DateTime<Utc>) -> Result<ResolvedPeriod> {
    let date = reference.date_naive();
    match kind {
        PeriodKind::Daily => Ok(ResolvedPeriod {
            period_id: date.format("%Y-%m-%d").to_string(),
            start: start_of_day(date),
            end: end_of_day(date),
        }),
        PeriodKind::Weekly => {
            let iso = date.iso_week();
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            Ok(ResolvedPeriod {
                period_id: format!("{}-W{:02}", iso.year(), iso.week()),
                start: start_of_day(monday),
                end: end_of_day(monday + Duration::days(6)),
            })
        }
        PeriodKind::Monthly => {
            let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .ok_or_else(|| SharedError::Internal(format!("invalid month for {}", date)))?;
            let last = last_day_of_month(date.year(), date.month())?;
            Ok(ResolvedPeriod {
                period_id: format!("{}-{}", date.year(), date.month()),
                start: start_of_day(first),
                end: end_of_day(last),
            })
        }
        PeriodKind::Yearly => {
            let first = NaiveDate::from_ymd_opt(date.year(), 1, 1)
                .ok_or_else(|| SharedError::Internal(format!("invalid year for {}", date)))?;
            let last = NaiveDate::from_ymd_opt(date.year(), 12, 31)
                .ok_or_else(|| SharedError::Internal(format!("invalid year for {}", date)))?;
            Ok(ResolvedPeriod {
                period_id: date.year().to_string(),
                start: start_of_day(first),
                end: end_of_day(last),
            })
        }
        PeriodKind::AllTime => Ok(ResolvedPeriod {
            period_id: ALL_TIME_PERIOD_ID.to_string(),
            start: Utc.timestamp_opt(0, 0).single().unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: Utc::now(),
        }),
        PeriodKind::Custom => Err(SharedError::Internal(
            "custom periods require explicit bounds and cannot be resolved from a reference date"
                .to_string(),
        )),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is valid on every calendar day")
        .and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .expect("23:59:59.999 is valid on every calendar day")
        .and_utc()
}

fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| SharedError::Internal(format!("invalid month {}-{}", year, month)))?;
    Ok(first_of_next - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn daily_covers_the_full_utc_day() {
        let resolved = resolve(PeriodKind::Daily, utc(2024, 5, 15, 13, 45, 12)).unwrap();
        assert_eq!(resolved.period_id, "2024-05-15");
        assert_eq!(resolved.start, utc(2024, 5, 15, 0, 0, 0));
        assert_eq!(resolved.end.to_rfc3339(), "2024-05-15T23:59:59.999+00:00");
    }

    #[test]
    fn weekly_resolves_iso_monday_week() {
        // 2024-05-15 is a Wednesday in ISO week 20.
        let resolved = resolve(PeriodKind::Weekly, utc(2024, 5, 15, 10, 0, 0)).unwrap();
        assert_eq!(resolved.period_id, "2024-W20");
        assert_eq!(resolved.start, utc(2024, 5, 13, 0, 0, 0));
        assert_eq!(resolved.end.to_rfc3339(), "2024-05-19T23:59:59.999+00:00");
    }

    #[rstest]
    #[case::monday(utc(2024, 5, 13, 0, 0, 0))]
    #[case::sunday_last_instant(utc(2024, 5, 19, 23, 59, 59))]
    fn weekly_is_stable_across_the_week(#[case] reference: DateTime<Utc>) {
        let resolved = resolve(PeriodKind::Weekly, reference).unwrap();
        assert_eq!(resolved.period_id, "2024-W20");
        assert_eq!(resolved.start, utc(2024, 5, 13, 0, 0, 0));
    }

    #[test]
    fn weekly_period_id_uses_iso_year_at_boundary() {
        // 2024-12-30 is a Monday belonging to ISO week 1 of 2025.
        let resolved = resolve(PeriodKind::Weekly, utc(2024, 12, 30, 12, 0, 0)).unwrap();
        assert_eq!(resolved.period_id, "2025-W01");
        assert_eq!(resolved.start, utc(2024, 12, 30, 0, 0, 0));
    }

    #[test]
    fn monthly_handles_leap_february() {
        let resolved = resolve(PeriodKind::Monthly, utc(2024, 2, 10, 8, 0, 0)).unwrap();
        assert_eq!(resolved.period_id, "2024-2");
        assert_eq!(resolved.start, utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(resolved.end.to_rfc3339(), "2024-02-29T23:59:59.999+00:00");
    }

    #[test]
    fn monthly_december_rolls_into_next_year() {
        let resolved = resolve(PeriodKind::Monthly, utc(2023, 12, 25, 0, 0, 0)).unwrap();
        assert_eq!(resolved.period_id, "2023-12");
        assert_eq!(resolved.end.to_rfc3339(), "2023-12-31T23:59:59.999+00:00");
    }

    #[test]
    fn yearly_covers_the_calendar_year() {
        let resolved = resolve(PeriodKind::Yearly, utc(2024, 7, 4, 12, 0, 0)).unwrap();
        assert_eq!(resolved.period_id, "2024");
        assert_eq!(resolved.start, utc(2024, 1, 1, 0, 0, 0));
        assert_eq!(resolved.end.to_rfc3339(), "2024-12-31T23:59:59.999+00:00");
    }

    #[test]
    fn all_time_end_bound_advances_with_resolution() {
        let before = Utc::now();
        let resolved = resolve(PeriodKind::AllTime, utc(2020, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(resolved.period_id, ALL_TIME_PERIOD_ID);
        assert_eq!(resolved.start, Utc.timestamp_opt(0, 0).unwrap());
        assert!(resolved.end >= before);
    }

    #[test]
    fn custom_cannot_be_resolved_from_a_reference_date() {
        assert!(resolve(PeriodKind::Custom, Utc::now()).is_err());
    }
}
