//! Intake aggregation: per-day totals, streaks and the dashboard statistics.
//!
//! Everything here is pure. Callers load the entries, pick the user's
//! timezone and "today", and these functions do the arithmetic. Totals are
//! always in millilitres regardless of the unit each entry was logged in.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::entry::WaterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn parse(s: &str) -> Option<Period> {
        match s {
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "year" => Some(Period::Year),
            _ => None,
        }
    }

    /// Length of the window ending today, inclusive.
    pub fn days(&self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Year => 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    pub date: NaiveDate,
    pub total: f64,
    pub goal: f64,
    pub percentage: f64,
    pub remaining: f64,
    pub entry_count: usize,
    pub goal_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAmount {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub amount: f64,
    pub goal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    pub amount: f64,
    pub goal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsData {
    pub period: Period,
    pub goal: f64,
    pub daily_average: f64,
    pub weekly_average: f64,
    pub monthly_average: f64,
    pub best_day: Option<DayAmount>,
    pub worst_day: Option<DayAmount>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_intake: f64,
    pub goal_achievement_rate: f64,
    pub peak_hours: Vec<HourCount>,
    pub weekly_data: Vec<DailyPoint>,
    pub monthly_data: Vec<MonthlyPoint>,
}

impl StatisticsData {
    fn empty(period: Period, goal: f64, current_streak: u32, longest_streak: u32) -> Self {
        StatisticsData {
            period,
            goal,
            daily_average: 0.0,
            weekly_average: 0.0,
            monthly_average: 0.0,
            best_day: None,
            worst_day: None,
            current_streak,
            longest_streak,
            total_intake: 0.0,
            goal_achievement_rate: 0.0,
            peak_hours: Vec::new(),
            weekly_data: Vec::new(),
            monthly_data: Vec::new(),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn local_date(ts: &DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// The UTC instant a local calendar day begins.
pub fn local_day_start(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    // Some zones skip midnight on DST change; that day starts an hour later
    [midnight, midnight + Duration::hours(1)]
        .iter()
        .find_map(|t| tz.from_local_datetime(t).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// `[start of from, start of the day after to)` in UTC.
pub fn local_range(from: NaiveDate, to: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        local_day_start(from, tz),
        local_day_start(to + Duration::days(1), tz),
    )
}

/// Millilitres per local calendar day. Days without entries are absent.
pub fn daily_totals(entries: &[WaterEntry], tz: Tz) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for e in entries {
        *totals.entry(local_date(&e.timestamp, tz)).or_insert(0.0) += e.amount_ml();
    }
    totals
}

/// `entries` are the ones already selected for `today`.
pub fn today_summary(entries: &[WaterEntry], goal_ml: f64, today: NaiveDate) -> TodaySummary {
    let total: f64 = entries.iter().map(|e| e.amount_ml()).sum();
    let percentage = if goal_ml > 0.0 {
        (total / goal_ml * 100.0).round()
    } else {
        0.0
    };
    TodaySummary {
        date: today,
        total: round1(total),
        goal: goal_ml,
        percentage,
        remaining: round1((goal_ml - total).max(0.0)),
        entry_count: entries.len(),
        goal_met: total >= goal_ml,
    }
}

fn goal_met(totals: &BTreeMap<NaiveDate, f64>, day: NaiveDate, goal_ml: f64) -> bool {
    totals.get(&day).is_some_and(|t| *t >= goal_ml)
}

/// Consecutive goal-met days ending today. A today that is not met yet
/// does not break the run ending yesterday.
pub fn current_streak(totals: &BTreeMap<NaiveDate, f64>, goal_ml: f64, today: NaiveDate) -> u32 {
    let mut day = if goal_met(totals, today, goal_ml) {
        today
    } else {
        match today.pred_opt() {
            Some(d) => d,
            None => return 0,
        }
    };
    let mut streak = 0;
    while goal_met(totals, day, goal_ml) {
        streak += 1;
        day = match day.pred_opt() {
            Some(d) => d,
            None => break,
        };
    }
    streak
}

pub fn longest_streak(totals: &BTreeMap<NaiveDate, f64>, goal_ml: f64) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for (day, total) in totals {
        if *total < goal_ml {
            run = 0;
            prev = None;
            continue;
        }
        run = match prev {
            Some(p) if p.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(*day);
    }
    best
}

/// Dashboard statistics for the window of `period` days ending `today`.
///
/// The window is clipped to start no earlier than the user's first logged
/// day, so a new user is not averaged over days before they signed up.
/// Within that span every day counts, including days with nothing logged.
/// Streaks look at the whole history.
pub fn detailed(
    entries: &[WaterEntry],
    goal_ml: f64,
    period: Period,
    today: NaiveDate,
    tz: Tz,
) -> StatisticsData {
    let totals = daily_totals(entries, tz);
    let current = current_streak(&totals, goal_ml, today);
    let longest = longest_streak(&totals, goal_ml);

    let first_day = match totals.keys().next() {
        Some(d) => *d,
        None => return StatisticsData::empty(period, goal_ml, current, longest),
    };
    let window_start = today - Duration::days(period.days() - 1);
    let start = window_start.max(first_day);
    if start > today {
        return StatisticsData::empty(period, goal_ml, current, longest);
    }

    let days: Vec<(NaiveDate, f64)> = start
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, totals.get(&d).copied().unwrap_or(0.0)))
        .collect();
    let span = days.len() as f64;

    let total: f64 = days.iter().map(|(_, t)| t).sum();
    let daily_average = total / span;
    let met = days.iter().filter(|(_, t)| *t >= goal_ml).count();

    // Earliest day wins ties
    let mut best = days[0];
    let mut worst = days[0];
    for &(d, t) in &days[1..] {
        if t > best.1 {
            best = (d, t);
        }
        if t < worst.1 {
            worst = (d, t);
        }
    }

    let mut hours = [0usize; 24];
    for e in entries {
        let local = e.timestamp.with_timezone(&tz);
        let day = local.date_naive();
        if day >= start && day <= today {
            hours[local.hour() as usize] += 1;
        }
    }
    let mut peak_hours: Vec<HourCount> = hours
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > 0)
        .map(|(h, c)| HourCount {
            hour: h as u32,
            count: *c,
        })
        .collect();
    peak_hours.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));

    let weekly_data = days
        .iter()
        .map(|(d, t)| DailyPoint {
            date: *d,
            amount: round1(*t),
            goal: goal_ml,
        })
        .collect();

    let mut months: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for (d, t) in &days {
        let key = format!("{:04}-{:02}", d.year(), d.month());
        let slot = months.entry(key).or_insert((0.0, 0));
        slot.0 += t;
        slot.1 += 1;
    }
    let monthly_data = months
        .into_iter()
        .map(|(month, (amount, n))| MonthlyPoint {
            month,
            amount: round1(amount),
            goal: goal_ml * n as f64,
        })
        .collect();

    StatisticsData {
        period,
        goal: goal_ml,
        daily_average: round1(daily_average),
        weekly_average: round1(daily_average * 7.0),
        monthly_average: round1(daily_average * 30.0),
        best_day: Some(DayAmount {
            date: best.0,
            amount: round1(best.1),
        }),
        worst_day: Some(DayAmount {
            date: worst.0,
            amount: round1(worst.1),
        }),
        current_streak: current,
        longest_streak: longest,
        total_intake: round1(total),
        goal_achievement_rate: round1(met as f64 / span * 100.0),
        peak_hours,
        weekly_data,
        monthly_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(id: i64, amount: f64, unit: Unit, ts: DateTime<Utc>) -> WaterEntry {
        WaterEntry {
            id,
            user_id: 1,
            amount,
            unit,
            timestamp: ts,
            created_at: ts,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn totals(days: &[(NaiveDate, f64)]) -> BTreeMap<NaiveDate, f64> {
        days.iter().copied().collect()
    }

    #[test]
    fn totals_mix_units_and_group_by_local_day() {
        let entries = vec![
            entry(1, 500.0, Unit::Ml, utc(2024, 5, 10, 9)),
            entry(2, 8.0, Unit::Oz, utc(2024, 5, 10, 11)),
            // 23:30 UTC on the 10th is already the 11th in Auckland
            entry(3, 300.0, Unit::Ml, Utc.with_ymd_and_hms(2024, 5, 10, 23, 30, 0).unwrap()),
        ];
        let utc_totals = daily_totals(&entries, chrono_tz::UTC);
        assert_eq!(utc_totals.len(), 1);
        assert!((utc_totals[&day(2024, 5, 10)] - 1036.588).abs() < 1e-6);

        let nz = daily_totals(&entries, chrono_tz::Pacific::Auckland);
        assert_eq!(nz.len(), 2);
        assert_eq!(nz[&day(2024, 5, 11)], 300.0);
    }

    #[test]
    fn today_summary_reports_progress() {
        let entries = vec![
            entry(1, 750.0, Unit::Ml, utc(2024, 5, 10, 9)),
            entry(2, 250.0, Unit::Ml, utc(2024, 5, 10, 10)),
        ];
        let s = today_summary(&entries, 2000.0, day(2024, 5, 10));
        assert_eq!(s.total, 1000.0);
        assert_eq!(s.percentage, 50.0);
        assert_eq!(s.remaining, 1000.0);
        assert_eq!(s.entry_count, 2);
        assert!(!s.goal_met);

        let over = today_summary(&[entry(1, 2500.0, Unit::Ml, utc(2024, 5, 10, 9))], 2000.0, day(2024, 5, 10));
        assert_eq!(over.percentage, 125.0);
        assert_eq!(over.remaining, 0.0);
        assert!(over.goal_met);
    }

    #[test]
    fn today_summary_serializes_camel_case() {
        let s = today_summary(&[], 2000.0, day(2024, 5, 10));
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["date"], "2024-05-10");
        assert_eq!(v["entryCount"], 0);
        assert_eq!(v["goalMet"], false);
    }

    #[test]
    fn current_streak_tolerates_unfinished_today() {
        let t = totals(&[
            (day(2024, 5, 7), 2100.0),
            (day(2024, 5, 8), 2000.0),
            (day(2024, 5, 9), 2500.0),
            (day(2024, 5, 10), 400.0),
        ]);
        assert_eq!(current_streak(&t, 2000.0, day(2024, 5, 10)), 3);

        let mut t2 = t.clone();
        t2.insert(day(2024, 5, 10), 2000.0);
        assert_eq!(current_streak(&t2, 2000.0, day(2024, 5, 10)), 4);

        // a missed yesterday ends it
        assert_eq!(current_streak(&t, 2000.0, day(2024, 5, 11)), 0);
    }

    #[test]
    fn current_streak_is_zero_without_history() {
        assert_eq!(current_streak(&BTreeMap::new(), 2000.0, day(2024, 5, 10)), 0);
    }

    #[test]
    fn longest_streak_needs_consecutive_days() {
        let t = totals(&[
            (day(2024, 5, 1), 2000.0),
            (day(2024, 5, 2), 2000.0),
            // gap on the 3rd
            (day(2024, 5, 4), 2000.0),
            (day(2024, 5, 5), 2000.0),
            (day(2024, 5, 6), 2000.0),
            (day(2024, 5, 7), 1999.0),
            (day(2024, 5, 8), 3000.0),
        ]);
        assert_eq!(longest_streak(&t, 2000.0), 3);
        assert_eq!(longest_streak(&BTreeMap::new(), 2000.0), 0);
    }

    #[test]
    fn longest_streak_crosses_month_boundaries() {
        let t = totals(&[
            (day(2024, 2, 28), 2000.0),
            (day(2024, 2, 29), 2000.0),
            (day(2024, 3, 1), 2000.0),
        ]);
        assert_eq!(longest_streak(&t, 2000.0), 3);
    }

    #[test]
    fn no_entries_gives_empty_statistics() {
        let s = detailed(&[], 2000.0, Period::Week, day(2024, 5, 10), chrono_tz::UTC);
        assert_eq!(s.daily_average, 0.0);
        assert_eq!(s.total_intake, 0.0);
        assert!(s.best_day.is_none());
        assert!(s.worst_day.is_none());
        assert!(s.weekly_data.is_empty());
        assert!(s.monthly_data.is_empty());
        let v = serde_json::to_value(&s).unwrap();
        assert!(v["bestDay"].is_null());
        assert_eq!(v["period"], "week");
    }

    #[test]
    fn week_averages_over_active_span_only() {
        // First entry three days ago: the span is 4 days, not 7
        let entries = vec![
            entry(1, 2000.0, Unit::Ml, utc(2024, 5, 7, 8)),
            entry(2, 1000.0, Unit::Ml, utc(2024, 5, 8, 8)),
            entry(3, 1000.0, Unit::Ml, utc(2024, 5, 8, 14)),
            entry(4, 2400.0, Unit::Ml, utc(2024, 5, 10, 20)),
        ];
        let s = detailed(&entries, 2000.0, Period::Week, day(2024, 5, 10), chrono_tz::UTC);
        assert_eq!(s.weekly_data.len(), 4);
        assert_eq!(s.total_intake, 6400.0);
        assert_eq!(s.daily_average, 1600.0);
        assert_eq!(s.weekly_average, 11200.0);
        assert_eq!(s.monthly_average, 48000.0);
        assert_eq!(s.goal_achievement_rate, 75.0);
        assert_eq!(
            s.best_day,
            Some(DayAmount {
                date: day(2024, 5, 10),
                amount: 2400.0
            })
        );
        assert_eq!(
            s.worst_day,
            Some(DayAmount {
                date: day(2024, 5, 9),
                amount: 0.0
            })
        );
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 2);
        assert_eq!(s.weekly_data[2].amount, 0.0);
        assert_eq!(s.weekly_data[0].goal, 2000.0);
    }

    #[test]
    fn window_excludes_older_entries_but_streaks_do_not() {
        let mut entries = Vec::new();
        // ten goal-met days ending today
        for (i, d) in (1..=10).enumerate() {
            entries.push(entry(i as i64, 2000.0, Unit::Ml, utc(2024, 5, d, 9)));
        }
        let s = detailed(&entries, 2000.0, Period::Week, day(2024, 5, 10), chrono_tz::UTC);
        assert_eq!(s.weekly_data.len(), 7);
        assert_eq!(s.weekly_data[0].date, day(2024, 5, 4));
        assert_eq!(s.total_intake, 14000.0);
        assert_eq!(s.goal_achievement_rate, 100.0);
        assert_eq!(s.current_streak, 10);
        assert_eq!(s.longest_streak, 10);
    }

    #[test]
    fn peak_hours_sorted_by_count_then_hour() {
        let entries = vec![
            entry(1, 100.0, Unit::Ml, utc(2024, 5, 10, 14)),
            entry(2, 100.0, Unit::Ml, utc(2024, 5, 9, 9)),
            entry(3, 100.0, Unit::Ml, utc(2024, 5, 10, 9)),
            entry(4, 100.0, Unit::Ml, utc(2024, 5, 10, 7)),
        ];
        let s = detailed(&entries, 2000.0, Period::Week, day(2024, 5, 10), chrono_tz::UTC);
        let got: Vec<(u32, usize)> = s.peak_hours.iter().map(|h| (h.hour, h.count)).collect();
        assert_eq!(got, vec![(9, 2), (7, 1), (14, 1)]);
    }

    #[test]
    fn monthly_data_splits_span_by_calendar_month() {
        let entries = vec![
            entry(1, 1000.0, Unit::Ml, utc(2024, 4, 20, 9)),
            entry(2, 3000.0, Unit::Ml, utc(2024, 5, 2, 9)),
        ];
        let s = detailed(&entries, 2000.0, Period::Month, day(2024, 5, 10), chrono_tz::UTC);
        assert_eq!(s.weekly_data.len(), 21);
        assert_eq!(s.monthly_data.len(), 2);
        assert_eq!(s.monthly_data[0].month, "2024-04");
        assert_eq!(s.monthly_data[0].amount, 1000.0);
        assert_eq!(s.monthly_data[0].goal, 2000.0 * 11.0);
        assert_eq!(s.monthly_data[1].month, "2024-05");
        assert_eq!(s.monthly_data[1].goal, 2000.0 * 10.0);
    }

    #[test]
    fn future_only_entries_yield_empty_window() {
        let entries = vec![entry(1, 500.0, Unit::Ml, utc(2024, 5, 11, 0))];
        let s = detailed(&entries, 2000.0, Period::Week, day(2024, 5, 10), chrono_tz::UTC);
        assert!(s.weekly_data.is_empty());
        assert_eq!(s.total_intake, 0.0);
    }

    #[test]
    fn local_day_bounds_follow_timezone() {
        let (from, to) = local_range(day(2024, 5, 10), day(2024, 5, 10), chrono_tz::UTC);
        assert_eq!(from, utc(2024, 5, 10, 0));
        assert_eq!(to, utc(2024, 5, 11, 0));

        // Dublin is UTC+1 in summer
        let start = local_day_start(day(2024, 5, 10), chrono_tz::Europe::Dublin);
        assert_eq!(start, utc(2024, 5, 9, 23));
    }

    #[test]
    fn skipped_midnight_starts_the_day_an_hour_later() {
        // Santiago jumps from 00:00 to 01:00 on 2024-09-08 (UTC-4 to UTC-3)
        let tz = chrono_tz::America::Santiago;
        assert_eq!(local_day_start(day(2024, 9, 7), tz), utc(2024, 9, 7, 4));
        assert_eq!(local_day_start(day(2024, 9, 8), tz), utc(2024, 9, 8, 4));

        let (from, to) = local_range(day(2024, 9, 8), day(2024, 9, 8), tz);
        assert_eq!(to, utc(2024, 9, 9, 3));
        assert_eq!(to - from, Duration::hours(23));
    }

    #[test]
    fn period_parsing() {
        assert_eq!(Period::parse("week"), Some(Period::Week));
        assert_eq!(Period::parse("year").map(|p| p.days()), Some(365));
        assert_eq!(Period::parse("decade"), None);
    }
}
