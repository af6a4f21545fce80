//! Reporting periods
//!
//! The unit reports on fixed administrative cycles: the week runs Wednesday
//! to Tuesday and the month runs from the 16th to the 15th.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Weekly,
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
    Custom,
}

impl ReportPeriod {
    pub const ALL: [ReportPeriod; 6] = [
        ReportPeriod::Weekly,
        ReportPeriod::Monthly,
        ReportPeriod::Quarterly,
        ReportPeriod::HalfYearly,
        ReportPeriod::Yearly,
        ReportPeriod::Custom,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
            ReportPeriod::Quarterly => "quarterly",
            ReportPeriod::HalfYearly => "halfYearly",
            ReportPeriod::Yearly => "yearly",
            ReportPeriod::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportPeriod::Weekly => "Hàng Tuần",
            ReportPeriod::Monthly => "Hàng Tháng",
            ReportPeriod::Quarterly => "Hàng Quý",
            ReportPeriod::HalfYearly => "6 Tháng",
            ReportPeriod::Yearly => "Hàng Năm",
            ReportPeriod::Custom => "Tùy Chọn",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.value() == value)
    }
}

/// Inclusive date bounds. A missing side means "do not filter".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.from?, self.to?))
    }

    pub fn is_bounded(&self) -> bool {
        self.bounds().is_some()
    }

    /// Whether a stored `YYYY-MM-DD` date falls inside the range.
    /// Unparseable dates never match a bounded range.
    pub fn contains(&self, date: &str) -> bool {
        match self.bounds() {
            None => true,
            Some((from, to)) => parse_date(date).map(|d| d >= from && d <= to).unwrap_or(false),
        }
    }

    /// Like [`contains`](Self::contains) but each side filters on its own,
    /// so a range with only `from` set still excludes earlier dates.
    /// Unparseable dates are never filtered out.
    pub fn admits(&self, date: &str) -> bool {
        let Some(d) = parse_date(date) else {
            return true;
        };
        self.from.map_or(true, |from| d >= from) && self.to.map_or(true, |to| d <= to)
    }

    /// Both bounds, with a missing `from` read as the Unix epoch and a
    /// missing `to` as `today`
    pub fn bounds_until(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = self.from.unwrap_or(NaiveDate::default());
        (from, self.to.unwrap_or(today))
    }

    /// Whether `[start, end]` touches the range at all
    pub fn overlaps(&self, start: &str, end: &str) -> bool {
        let Some((from, to)) = self.bounds() else {
            return true;
        };
        let start = parse_date(start);
        let end = parse_date(end);
        let inside = |d: Option<NaiveDate>| d.map(|d| d >= from && d <= to).unwrap_or(false);
        inside(start)
            || inside(end)
            || matches!((start, end), (Some(s), Some(e)) if s <= from && e >= to)
    }
}

/// Parses `YYYY-MM-DD`, tolerating a trailing ISO time part
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // Callers only pass months already normalised to 1..=12
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

fn last_of_month(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    first_of_month(ny, nm) - Duration::days(1)
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn day_of(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| first_of_month(year, month))
}

/// Bounds of a non-custom period around `reference`
pub fn period_bounds(period: ReportPeriod, reference: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let (year, month) = (reference.year(), reference.month());
    let bounds = match period {
        ReportPeriod::Weekly => {
            let weekday = reference.weekday().num_days_from_sunday() as i64;
            let tuesday = Weekday::Tue.num_days_from_sunday() as i64;
            let ahead = (tuesday - weekday).rem_euclid(7);
            let end = reference + Duration::days(ahead);
            (end - Duration::days(6), end)
        }
        ReportPeriod::Monthly => {
            if reference.day() <= 15 {
                let (py, pm) = shift_month(year, month, -1);
                (day_of(py, pm, 16), day_of(year, month, 15))
            } else {
                let (ny, nm) = shift_month(year, month, 1);
                (day_of(year, month, 16), day_of(ny, nm, 15))
            }
        }
        ReportPeriod::Quarterly => {
            let start_month = (month - 1) / 3 * 3 + 1;
            (first_of_month(year, start_month), last_of_month(year, start_month + 2))
        }
        ReportPeriod::HalfYearly => {
            if month <= 6 {
                (first_of_month(year, 1), last_of_month(year, 6))
            } else {
                (first_of_month(year, 7), last_of_month(year, 12))
            }
        }
        ReportPeriod::Yearly => (first_of_month(year, 1), last_of_month(year, 12)),
        ReportPeriod::Custom => return None,
    };
    Some(bounds)
}

/// Resolves the range shown on the report pages.
/// A malformed reference date falls back to `today`; custom bounds are taken
/// as given and may be left open.
pub fn resolve_range(
    period: ReportPeriod,
    reference: &str,
    custom_from: &str,
    custom_to: &str,
    today: NaiveDate,
) -> DateRange {
    match period {
        ReportPeriod::Custom => DateRange {
            from: parse_date(custom_from),
            to: parse_date(custom_to),
        },
        _ => {
            let reference = parse_date(reference).unwrap_or(today);
            period_bounds(period, reference)
                .map(|(from, to)| DateRange::new(from, to))
                .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_week_from_wednesday() {
        // 2024-05-15 is a Wednesday
        assert_eq!(
            period_bounds(ReportPeriod::Weekly, d("2024-05-15")),
            Some((d("2024-05-15"), d("2024-05-21")))
        );
    }

    #[test]
    fn test_week_on_tuesday_ends_same_day() {
        assert_eq!(
            period_bounds(ReportPeriod::Weekly, d("2024-05-14")),
            Some((d("2024-05-08"), d("2024-05-14")))
        );
    }

    #[test]
    fn test_week_from_sunday() {
        assert_eq!(
            period_bounds(ReportPeriod::Weekly, d("2024-05-12")),
            Some((d("2024-05-08"), d("2024-05-14")))
        );
    }

    #[test]
    fn test_month_first_half() {
        assert_eq!(
            period_bounds(ReportPeriod::Monthly, d("2024-05-10")),
            Some((d("2024-04-16"), d("2024-05-15")))
        );
        assert_eq!(
            period_bounds(ReportPeriod::Monthly, d("2024-05-15")),
            Some((d("2024-04-16"), d("2024-05-15")))
        );
    }

    #[test]
    fn test_month_second_half() {
        assert_eq!(
            period_bounds(ReportPeriod::Monthly, d("2024-05-16")),
            Some((d("2024-05-16"), d("2024-06-15")))
        );
    }

    #[test]
    fn test_month_crosses_year() {
        assert_eq!(
            period_bounds(ReportPeriod::Monthly, d("2024-01-03")),
            Some((d("2023-12-16"), d("2024-01-15")))
        );
        assert_eq!(
            period_bounds(ReportPeriod::Monthly, d("2024-12-20")),
            Some((d("2024-12-16"), d("2025-01-15")))
        );
    }

    #[test]
    fn test_calendar_aligned_periods() {
        assert_eq!(
            period_bounds(ReportPeriod::Quarterly, d("2024-08-09")),
            Some((d("2024-07-01"), d("2024-09-30")))
        );
        assert_eq!(
            period_bounds(ReportPeriod::Quarterly, d("2024-02-29")),
            Some((d("2024-01-01"), d("2024-03-31")))
        );
        assert_eq!(
            period_bounds(ReportPeriod::HalfYearly, d("2024-06-30")),
            Some((d("2024-01-01"), d("2024-06-30")))
        );
        assert_eq!(
            period_bounds(ReportPeriod::HalfYearly, d("2024-07-01")),
            Some((d("2024-07-01"), d("2024-12-31")))
        );
        assert_eq!(
            period_bounds(ReportPeriod::Yearly, d("2024-07-01")),
            Some((d("2024-01-01"), d("2024-12-31")))
        );
        assert_eq!(period_bounds(ReportPeriod::Custom, d("2024-07-01")), None);
    }

    #[test]
    fn test_resolve_range_custom_and_fallback() {
        let today = d("2024-05-20");
        let custom = resolve_range(ReportPeriod::Custom, "", "2024-01-01", "", today);
        assert_eq!(custom.from, Some(d("2024-01-01")));
        assert_eq!(custom.to, None);
        assert!(custom.contains("1999-01-01"));

        let fallback = resolve_range(ReportPeriod::Monthly, "không phải ngày", "", "", today);
        assert_eq!(fallback, DateRange::new(d("2024-05-16"), d("2024-06-15")));
    }

    #[test]
    fn test_contains_and_overlaps() {
        let range = DateRange::new(d("2024-05-01"), d("2024-05-31"));
        assert!(range.contains("2024-05-01"));
        assert!(range.contains("2024-05-31T10:00:00.000Z"));
        assert!(!range.contains("2024-06-01"));
        assert!(!range.contains(""));

        let open = DateRange { from: Some(d("2024-05-01")), to: None };
        assert!(open.contains("2020-01-01"));
        assert!(!open.admits("2020-01-01"));
        assert!(open.admits("2030-01-01"));
        assert!(open.admits("không rõ"));
        assert!(open.admits(""));

        let today = d("2024-06-10");
        assert_eq!(open.bounds_until(today), (d("2024-05-01"), today));
        let until = DateRange { from: None, to: Some(d("2024-05-31")) };
        assert_eq!(until.bounds_until(today), (d("1970-01-01"), d("2024-05-31")));

        assert!(range.overlaps("2024-04-20", "2024-05-02"));
        assert!(range.overlaps("2024-05-30", "2024-06-10"));
        assert!(range.overlaps("2024-04-01", "2024-07-01"));
        assert!(!range.overlaps("2024-06-02", "2024-06-10"));
    }

    #[test]
    fn test_period_value_round_trip() {
        for p in ReportPeriod::ALL {
            assert_eq!(ReportPeriod::from_value(p.value()), Some(p));
        }
        assert_eq!(ReportPeriod::from_value("daily"), None);
    }

    fn any_date() -> impl Strategy<Value = NaiveDate> {
        (1990i32..2100, 1u32..=366).prop_filter_map("valid ordinal", |(y, o)| NaiveDate::from_yo_opt(y, o))
    }

    proptest! {
        #[test]
        fn prop_week_is_seven_days_ending_tuesday(reference in any_date()) {
            let (from, to) = period_bounds(ReportPeriod::Weekly, reference).unwrap();
            prop_assert_eq!(to.weekday(), Weekday::Tue);
            prop_assert_eq!((to - from).num_days(), 6);
            prop_assert!(from <= reference && reference <= to);
        }

        #[test]
        fn prop_month_runs_16th_to_15th(reference in any_date()) {
            let (from, to) = period_bounds(ReportPeriod::Monthly, reference).unwrap();
            prop_assert_eq!(from.day(), 16);
            prop_assert_eq!(to.day(), 15);
            prop_assert!(from <= reference && reference <= to);
            let (ny, nm) = shift_month(from.year(), from.month(), 1);
            prop_assert_eq!((to.year(), to.month()), (ny, nm));
            if reference.day() <= 15 {
                prop_assert_eq!(to.month(), reference.month());
            } else {
                prop_assert_eq!(from.month(), reference.month());
            }
        }
    }
}
