use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::settings::{parse_hhmm, NotificationSettings};

/// True when `now` falls inside `[start, end]`. An end before the start
/// means the window runs past midnight.
pub fn within_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        now >= start && now <= end
    } else {
        now >= start || now <= end
    }
}

/// Reminder slots for the window opening on `day`, as UTC instants.
/// Local times skipped by a DST jump produce no slot.
fn slots_for_day(
    day: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    interval: Duration,
    tz: Tz,
) -> Vec<DateTime<Utc>> {
    let first = day.and_time(start);
    let last = if end < start {
        (day + Duration::days(1)).and_time(end)
    } else {
        day.and_time(end)
    };

    let mut slots = Vec::new();
    let mut at = first;
    while at <= last {
        if let Some(t) = tz.from_local_datetime(&at).earliest() {
            slots.push(t.with_timezone(&Utc));
        }
        at += interval;
    }
    slots
}

/// The first reminder strictly after `now`, or None when reminders are off
/// or the settings cannot produce a slot.
pub fn next_reminder(
    now: DateTime<Utc>,
    settings: &NotificationSettings,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    if !settings.enabled || settings.interval == 0 {
        return None;
    }
    let start = parse_hhmm(&settings.start_time)?;
    let end = parse_hhmm(&settings.end_time)?;
    let interval = Duration::minutes(settings.interval as i64);

    let today = now.with_timezone(&tz).date_naive();
    // Yesterday's window may still be open when it wraps past midnight
    (-1..=1)
        .map(|offset| today + Duration::days(offset))
        .flat_map(|day| slots_for_day(day, start, end, interval, tz))
        .filter(|slot| *slot > now)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn settings(start: &str, end: &str, interval: u32) -> NotificationSettings {
        NotificationSettings {
            enabled: true,
            interval,
            start_time: start.to_string(),
            end_time: end.to_string(),
            ..NotificationSettings::default()
        }
    }

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, m, 0).unwrap()
    }

    #[test]
    fn window_membership() {
        assert!(within_window(t(8, 0), t(8, 0), t(22, 0)));
        assert!(within_window(t(22, 0), t(8, 0), t(22, 0)));
        assert!(!within_window(t(7, 59), t(8, 0), t(22, 0)));
        assert!(!within_window(t(23, 0), t(8, 0), t(22, 0)));
    }

    #[test]
    fn wrapped_window_membership() {
        assert!(within_window(t(23, 0), t(22, 0), t(6, 0)));
        assert!(within_window(t(2, 0), t(22, 0), t(6, 0)));
        assert!(!within_window(t(12, 0), t(22, 0), t(6, 0)));
    }

    #[test]
    fn next_slot_within_the_day() {
        let s = settings("08:00", "22:00", 60);
        let got = next_reminder(utc(10, 9, 15), &s, chrono_tz::UTC);
        assert_eq!(got, Some(utc(10, 10, 0)));
        // exactly on a slot moves to the following one
        let got = next_reminder(utc(10, 10, 0), &s, chrono_tz::UTC);
        assert_eq!(got, Some(utc(10, 11, 0)));
    }

    #[test]
    fn before_and_after_window() {
        let s = settings("08:00", "22:00", 90);
        assert_eq!(next_reminder(utc(10, 6, 0), &s, chrono_tz::UTC), Some(utc(10, 8, 0)));
        // 08:00 + 9 * 90min = 21:30 is the last slot
        assert_eq!(next_reminder(utc(10, 21, 0), &s, chrono_tz::UTC), Some(utc(10, 21, 30)));
        assert_eq!(next_reminder(utc(10, 21, 45), &s, chrono_tz::UTC), Some(utc(11, 8, 0)));
    }

    #[test]
    fn wrapped_window_continues_after_midnight() {
        let s = settings("22:00", "02:00", 120);
        assert_eq!(next_reminder(utc(10, 23, 0), &s, chrono_tz::UTC), Some(utc(11, 0, 0)));
        assert_eq!(next_reminder(utc(11, 1, 0), &s, chrono_tz::UTC), Some(utc(11, 2, 0)));
        assert_eq!(next_reminder(utc(11, 3, 0), &s, chrono_tz::UTC), Some(utc(11, 22, 0)));
    }

    #[test]
    fn uses_local_time() {
        // New York is UTC-4 in May
        let s = settings("08:00", "22:00", 60);
        let got = next_reminder(utc(10, 11, 30), &s, chrono_tz::America::New_York);
        assert_eq!(got, Some(utc(10, 12, 0)));
        let got = next_reminder(utc(10, 3, 0), &s, chrono_tz::America::New_York);
        assert_eq!(got, Some(utc(10, 12, 0)));
    }

    #[test]
    fn disabled_or_broken_settings() {
        let mut s = settings("08:00", "22:00", 60);
        s.enabled = false;
        assert_eq!(next_reminder(utc(10, 9, 0), &s, chrono_tz::UTC), None);

        let s = settings("8am", "22:00", 60);
        assert_eq!(next_reminder(utc(10, 9, 0), &s, chrono_tz::UTC), None);
    }
}
