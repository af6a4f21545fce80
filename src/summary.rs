//! Aggregates shown on the dashboard, the list pages and the report page

use chrono::NaiveDate;

use crate::models::*;
use crate::utils::period::{parse_date, DateRange};
use crate::utils::template::{format_date, DEFAULT_DATE_FORMAT};

// ============================================
// Building blocks
// ============================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccidentStats {
    pub count: usize,
    pub deaths: i64,
    pub injuries: i64,
    pub damage_vnd: i64,
    /// Accidents with a positive alcohol test
    pub alcohol: usize,
}

pub fn accident_stats<'a>(accidents: impl IntoIterator<Item = &'a TrafficAccident>) -> AccidentStats {
    accidents.into_iter().fold(AccidentStats::default(), |mut s, a| {
        s.count += 1;
        s.deaths += a.deaths;
        s.injuries += a.injuries;
        s.damage_vnd += a.estimated_damage_vnd;
        if a.alcohol_level == AlcoholLevel::Yes {
            s.alcohol += 1;
        }
        s
    })
}

/// One row of the registration table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegistrationStat {
    pub label: &'static str,
    pub first: i64,
    pub transfer: i64,
    pub recall: i64,
    pub renewal: i64,
    pub total: i64,
}

impl RegistrationStat {
    fn add(&mut self, reg: &VehicleRegistration) {
        self.first += reg.first_time_count;
        self.transfer += reg.transfer_count;
        self.recall += reg.recall_count;
        self.renewal += reg.renewal_count;
        self.total += reg.total();
    }
}

pub const GRAND_TOTAL_LABEL: &str = "Tổng cộng";

/// Rows for cars, motorbikes and the grand total, in that order
pub fn registration_stats<'a>(
    registrations: impl IntoIterator<Item = &'a VehicleRegistration>,
) -> [RegistrationStat; 3] {
    let mut rows = [
        RegistrationStat { label: VehicleType::Car.label(), ..Default::default() },
        RegistrationStat { label: VehicleType::Motorbike.label(), ..Default::default() },
        RegistrationStat { label: GRAND_TOTAL_LABEL, ..Default::default() },
    ];
    for reg in registrations {
        let idx = match reg.vehicle_type {
            VehicleType::Car => 0,
            VehicleType::Motorbike => 1,
        };
        rows[idx].add(reg);
        rows[2].add(reg);
    }
    rows
}

/// Counts by label, keeping the order labels were first seen
pub fn count_by<'a, T: 'a>(
    items: impl IntoIterator<Item = &'a T>,
    label: impl Fn(&T) -> String,
) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for item in items {
        let key = label(item);
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    counts
}

// ============================================
// Dashboard
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct EventProgress {
    pub name: String,
    /// Percent, rounded to two decimals, uncapped
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    pub total_accidents: usize,
    pub total_deaths: i64,
    pub total_injuries: i64,
    /// First-time, transfer and renewal registrations dated today
    pub registrations_today: i64,
    pub active_events: usize,
    pub tasks_today: usize,
    /// `(YYYY-MM, count)` sorted by month
    pub accidents_per_month: Vec<(String, usize)>,
    pub registration_stats: [RegistrationStat; 3],
    pub event_progress: Vec<EventProgress>,
}

pub fn dashboard(data: &AppData, today: &str) -> DashboardMetrics {
    let accidents = accident_stats(&data.traffic_accidents);

    let registrations_today = data
        .vehicle_registrations
        .iter()
        .filter(|r| r.date == today)
        .map(|r| r.first_time_count + r.transfer_count + r.renewal_count)
        .sum();

    let active_events = data
        .events
        .iter()
        .filter(|e| e.from_date.as_str() <= today && e.to_date.as_str() >= today)
        .count();

    let mut accidents_per_month = count_by(&data.traffic_accidents, |a: &TrafficAccident| {
        a.date.chars().take(7).collect()
    });
    accidents_per_month.sort_by(|a, b| a.0.cmp(&b.0));

    let event_progress = data
        .events
        .iter()
        .map(|e| EventProgress {
            name: e.name.clone(),
            progress: (e.progress() * 100.0).round() / 100.0,
        })
        .collect();

    DashboardMetrics {
        total_accidents: accidents.count,
        total_deaths: accidents.deaths,
        total_injuries: accidents.injuries,
        registrations_today,
        active_events,
        tasks_today: data.daily_tasks.iter().filter(|t| t.date == today).count(),
        accidents_per_month,
        registration_stats: registration_stats(&data.vehicle_registrations),
        event_progress,
    }
}

// ============================================
// Period report
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub range: DateRange,
    pub accidents: AccidentStats,
    pub registration_stats: [RegistrationStat; 3],
    pub total_registrations: i64,
    pub event_count: usize,
    /// e.g. `"42.5%"`, `"0%"` when nothing has a goal
    pub goal_achievement: String,
    pub task_count: usize,
    pub task_categories: Vec<(String, usize)>,
    pub verification_count: usize,
    /// Fixed order: verified, in progress, not started, undetermined
    pub verification_statuses: [(VerificationStatus, usize); 4],
    pub advisory_count: usize,
    pub advisory_types: Vec<(String, usize)>,
}

/// Figures for a reporting window. Target results are counted between the
/// range bounds, with an open side running from the epoch or up to `today`.
pub fn report_summary(data: &AppData, range: &DateRange, today: NaiveDate) -> ReportSummary {
    let accidents: Vec<_> = data.traffic_accidents.iter().filter(|a| range.contains(&a.date)).collect();
    let registrations: Vec<_> = data.vehicle_registrations.iter().filter(|r| range.contains(&r.date)).collect();
    let events: Vec<_> = data.events.iter().filter(|e| range.overlaps(&e.from_date, &e.to_date)).collect();
    let tasks: Vec<_> = data.daily_tasks.iter().filter(|t| range.contains(&t.date)).collect();
    let requests: Vec<_> = data.verification_requests.iter().filter(|r| range.contains(&r.doc_date)).collect();
    let advisories: Vec<_> = data.advisory_documents.iter().filter(|d| range.contains(&d.doc_date)).collect();

    let registration_stats = registration_stats(registrations.iter().copied());
    let total_registrations = registration_stats[2].total;

    let (result_from, result_to) = range.bounds_until(today);
    let (goal, achieved) = events
        .iter()
        .flat_map(|e| e.targets.iter())
        .fold((0.0_f64, 0.0_f64), |(goal, achieved), target| {
            let in_range: f64 = target
                .results
                .iter()
                .filter(|r| parse_date(&r.date).is_some_and(|d| d >= result_from && d <= result_to))
                .map(|r| r.result)
                .sum();
            (goal + target.goal, achieved + in_range)
        });
    let goal_achievement = if goal == 0.0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", achieved / goal * 100.0)
    };

    let status_count = |status: VerificationStatus| {
        let n = requests.iter().filter(|r| r.verification_result == status).count();
        (status, n)
    };

    ReportSummary {
        range: *range,
        accidents: accident_stats(accidents.iter().copied()),
        registration_stats,
        total_registrations,
        event_count: events.len(),
        goal_achievement,
        task_count: tasks.len(),
        task_categories: count_by(tasks.iter().copied(), |t: &DailyTask| t.category.label().to_string()),
        verification_count: requests.len(),
        verification_statuses: [
            status_count(VerificationStatus::Verified),
            status_count(VerificationStatus::InProgress),
            status_count(VerificationStatus::NotStarted),
            status_count(VerificationStatus::Undetermined),
        ],
        advisory_count: advisories.len(),
        advisory_types: count_by(advisories.iter().copied(), |d: &AdvisoryDocument| d.doc_type.label().to_string()),
    }
}

/// Sorts by an ISO date key, latest first; the sort is stable for equal dates
pub fn newest_first<T>(mut items: Vec<T>, date: impl Fn(&T) -> &str) -> Vec<T> {
    items.sort_by(|a, b| date(b).cmp(date(a)));
    items
}

// ============================================
// Formatting
// ============================================

/// `YYYY-MM-DD` as `DD/MM/YYYY`
pub fn display_date(date: &str) -> String {
    format_date(date, DEFAULT_DATE_FORMAT)
}

/// Vietnamese currency style: `1.234.567 ₫`
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}{} ₫", sign, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::period::parse_date;

    #[test]
    fn test_newest_first_keeps_ties_in_order() {
        let tasks: Vec<DailyTask> = [("a", "2024-01-02"), ("b", "2024-03-01"), ("c", "2024-01-02")]
            .iter()
            .map(|(id, date)| DailyTask { id: id.to_string(), date: date.to_string(), ..Default::default() })
            .collect();
        let sorted = newest_first(tasks, |t| t.date.as_str());
        let ids: Vec<_> = sorted.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    fn accident(date: &str, deaths: i64, alcohol: AlcoholLevel) -> TrafficAccident {
        TrafficAccident {
            id: date.to_string(),
            date: date.to_string(),
            deaths,
            injuries: 1,
            estimated_damage_vnd: 1_000_000,
            alcohol_level: alcohol,
            ..Default::default()
        }
    }

    fn registration(date: &str, vehicle_type: VehicleType, first: i64) -> VehicleRegistration {
        VehicleRegistration {
            id: format!("{}-{:?}", date, vehicle_type),
            date: date.to_string(),
            vehicle_type,
            first_time_count: first,
            transfer_count: 1,
            recall_count: 1,
            renewal_count: 1,
        }
    }

    fn sample() -> AppData {
        let mut data = AppData::default();
        data.traffic_accidents = vec![
            accident("2024-05-02", 1, AlcoholLevel::Yes),
            accident("2024-04-20", 0, AlcoholLevel::No),
            accident("2024-05-20", 2, AlcoholLevel::Unknown),
        ];
        data.vehicle_registrations = vec![
            registration("2024-05-20", VehicleType::Car, 3),
            registration("2024-05-20", VehicleType::Motorbike, 10),
            registration("2024-03-01", VehicleType::Motorbike, 5),
        ];
        data.events = vec![Event {
            id: "e".into(),
            name: "Cao điểm".into(),
            from_date: "2024-05-01".into(),
            to_date: "2024-06-30".into(),
            targets: vec![EventTarget {
                goal: 40.0,
                results: vec![
                    EventTargetResult { date: "2024-05-10".into(), result: 10.0 },
                    EventTargetResult { date: "2024-06-20".into(), result: 7.0 },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }];
        data.daily_tasks = vec![
            DailyTask { id: "1".into(), date: "2024-05-20".into(), category: TaskCategory::Propaganda, ..Default::default() },
            DailyTask { id: "2".into(), date: "2024-05-21".into(), category: TaskCategory::Patrol, ..Default::default() },
            DailyTask { id: "3".into(), date: "2024-05-22".into(), category: TaskCategory::Propaganda, ..Default::default() },
        ];
        data.verification_requests = vec![
            VerificationRequest { id: "v".into(), doc_date: "2024-05-03".into(), verification_result: VerificationStatus::Verified, ..Default::default() },
            VerificationRequest { id: "w".into(), doc_date: "2024-05-04".into(), ..Default::default() },
        ];
        data
    }

    #[test]
    fn test_dashboard_metrics() {
        let m = dashboard(&sample(), "2024-05-20");
        assert_eq!(m.total_accidents, 3);
        assert_eq!(m.total_deaths, 3);
        assert_eq!(m.total_injuries, 3);
        // recall counts are excluded from today's figure
        assert_eq!(m.registrations_today, (3 + 1 + 1) + (10 + 1 + 1));
        assert_eq!(m.active_events, 1);
        assert_eq!(m.tasks_today, 1);
        assert_eq!(
            m.accidents_per_month,
            vec![("2024-04".to_string(), 1), ("2024-05".to_string(), 2)]
        );
        assert_eq!(m.event_progress[0].progress, 42.5);
    }

    #[test]
    fn test_registration_stats_rows() {
        let data = sample();
        let rows = registration_stats(&data.vehicle_registrations);
        assert_eq!(rows[0].label, "Ô tô");
        assert_eq!(rows[0].total, 6);
        assert_eq!(rows[1].first, 15);
        assert_eq!(rows[2].label, GRAND_TOTAL_LABEL);
        assert_eq!(rows[2].total, rows[0].total + rows[1].total);
    }

    #[test]
    fn test_report_summary_for_month() {
        let range = DateRange::new(parse_date("2024-05-01").unwrap(), parse_date("2024-05-31").unwrap());
        let s = report_summary(&sample(), &range, parse_date("2024-06-01").unwrap());
        assert_eq!(s.accidents.count, 2);
        assert_eq!(s.accidents.alcohol, 1);
        assert_eq!(s.accidents.damage_vnd, 2_000_000);
        assert_eq!(s.total_registrations, 6 + 13);
        assert_eq!(s.event_count, 1);
        // only the May result counts against the full goal
        assert_eq!(s.goal_achievement, "25.0%");
        assert_eq!(
            s.task_categories,
            vec![("Tuyên truyền".to_string(), 2), ("Tuần tra xử lý".to_string(), 1)]
        );
        assert_eq!(s.verification_statuses[0], (VerificationStatus::Verified, 1));
        assert_eq!(s.verification_statuses[2], (VerificationStatus::NotStarted, 1));
        assert_eq!(s.advisory_count, 0);
    }

    #[test]
    fn test_goal_achievement_with_only_from_set() {
        let range = DateRange { from: parse_date("2024-06-01"), to: None };
        let s = report_summary(&sample(), &range, parse_date("2024-06-25").unwrap());
        assert_eq!(s.goal_achievement, "17.5%");
        // results after today are not counted yet
        let s = report_summary(&sample(), &range, parse_date("2024-06-15").unwrap());
        assert_eq!(s.goal_achievement, "0.0%");
    }

    #[test]
    fn test_goal_achievement_without_goals() {
        let range = DateRange::new(parse_date("2020-01-01").unwrap(), parse_date("2020-01-31").unwrap());
        assert_eq!(report_summary(&AppData::default(), &range, range.to.unwrap()).goal_achievement, "0%");
    }

    #[test]
    fn test_format_vnd() {
        assert_eq!(format_vnd(0), "0 ₫");
        assert_eq!(format_vnd(950), "950 ₫");
        assert_eq!(format_vnd(1_234_567), "1.234.567 ₫");
        assert_eq!(format_vnd(-12_000), "-12.000 ₫");
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("2024-01-09"), "09/01/2024");
        assert_eq!(display_date(""), "");
    }
}
