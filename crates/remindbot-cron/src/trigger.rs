//! Weekly trigger evaluation in a named timezone.

use chrono::offset::LocalResult;
use chrono::{DateTime, Datelike, Days, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use remindbot_types::{ReminderTime, WeekdayCode};

/// Fires at `time` local wall-clock on `day` (or every day), in `timezone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSpec {
    day: WeekdayCode,
    time: ReminderTime,
    timezone: Tz,
}

impl TriggerSpec {
    pub fn new(day: WeekdayCode, time: ReminderTime, timezone: Tz) -> Self {
        Self {
            day,
            time,
            timezone,
        }
    }

    pub fn day(&self) -> WeekdayCode {
        self.day
    }

    pub fn time(&self) -> ReminderTime {
        self.time
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn matches(&self, weekday: Weekday) -> bool {
        match to_chrono(self.day) {
            Some(day) => day == weekday,
            None => true,
        }
    }

    /// The first occurrence strictly after `after`.
    ///
    /// A local time skipped by a DST jump does not fire that day; a local
    /// time repeated by a DST fall-back fires once, at its first instance.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.with_timezone(&self.timezone).date_naive();

        // Eight days covers a full week plus a skipped occurrence.
        for offset in 0..=8 {
            let date = start.checked_add_days(Days::new(offset))?;
            if !self.matches(date.weekday()) {
                continue;
            }
            let naive = date.and_hms_opt(self.time.hour(), self.time.minute(), 0)?;
            let local = match self.timezone.from_local_datetime(&naive) {
                LocalResult::Single(t) => t,
                LocalResult::Ambiguous(earliest, _) => earliest,
                LocalResult::None => continue,
            };
            let candidate = local.with_timezone(&Utc);
            if candidate > after {
                return Some(candidate);
            }
        }
        None
    }
}

fn to_chrono(day: WeekdayCode) -> Option<Weekday> {
    match day {
        WeekdayCode::Mon => Some(Weekday::Mon),
        WeekdayCode::Tue => Some(Weekday::Tue),
        WeekdayCode::Wed => Some(Weekday::Wed),
        WeekdayCode::Thu => Some(Weekday::Thu),
        WeekdayCode::Fri => Some(Weekday::Fri),
        WeekdayCode::Sat => Some(Weekday::Sat),
        WeekdayCode::Sun => Some(Weekday::Sun),
        WeekdayCode::Every => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Rome;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn spec(day: WeekdayCode, h: u32, m: u32, tz: Tz) -> TriggerSpec {
        TriggerSpec::new(day, ReminderTime::new(h, m).unwrap(), tz)
    }

    #[test]
    fn test_next_same_week() {
        // 2024-01-01 is a Monday
        let t = spec(WeekdayCode::Wed, 22, 30, Tz::UTC);
        assert_eq!(
            t.next_after(utc(2024, 1, 1, 9, 0)),
            Some(utc(2024, 1, 3, 22, 30))
        );
    }

    #[test]
    fn test_next_later_today() {
        let t = spec(WeekdayCode::Mon, 22, 30, Tz::UTC);
        assert_eq!(
            t.next_after(utc(2024, 1, 1, 9, 0)),
            Some(utc(2024, 1, 1, 22, 30))
        );
    }

    #[test]
    fn test_exact_time_rolls_to_next_week() {
        let t = spec(WeekdayCode::Mon, 22, 30, Tz::UTC);
        assert_eq!(
            t.next_after(utc(2024, 1, 1, 22, 30)),
            Some(utc(2024, 1, 8, 22, 30))
        );
    }

    #[test]
    fn test_every_day() {
        let t = spec(WeekdayCode::Every, 7, 5, Tz::UTC);
        assert_eq!(
            t.next_after(utc(2024, 1, 1, 8, 0)),
            Some(utc(2024, 1, 2, 7, 5))
        );
        assert_eq!(
            t.next_after(utc(2024, 1, 1, 6, 0)),
            Some(utc(2024, 1, 1, 7, 5))
        );
    }

    #[test]
    fn test_timezone_offset_applied() {
        // Rome is UTC+1 in January
        let t = spec(WeekdayCode::Mon, 9, 0, Rome);
        assert_eq!(
            t.next_after(utc(2024, 1, 1, 0, 0)),
            Some(utc(2024, 1, 1, 8, 0))
        );
    }

    #[test]
    fn test_local_date_used_for_weekday() {
        // 23:30 UTC on Sunday is already Monday 00:30 in Rome
        let t = spec(WeekdayCode::Mon, 1, 0, Rome);
        assert_eq!(
            t.next_after(utc(2024, 1, 7, 23, 30)),
            Some(utc(2024, 1, 8, 0, 0))
        );
    }

    #[test]
    fn test_dst_gap_skips_that_day() {
        // 2024-03-31 02:30 does not exist in Rome
        let t = spec(WeekdayCode::Every, 2, 30, Rome);
        assert_eq!(
            t.next_after(utc(2024, 3, 30, 12, 0)),
            Some(utc(2024, 4, 1, 0, 30))
        );
    }

    #[test]
    fn test_dst_overlap_fires_once() {
        // 2024-10-27 02:30 happens twice in Rome; first instance is UTC+2
        let t = spec(WeekdayCode::Sun, 2, 30, Rome);
        let first = t.next_after(utc(2024, 10, 26, 12, 0)).unwrap();
        assert_eq!(first, utc(2024, 10, 27, 0, 30));
        assert_eq!(t.next_after(first), Some(utc(2024, 11, 3, 1, 30)));
    }
}
