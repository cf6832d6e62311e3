//! The two recurring window shapes: midnight-to-now and past-N-hours-to-now.

use chrono::{DateTime, Duration, TimeZone, Utc};
use harms_core::{Clock, TimeWindow};

/// `[local midnight, now)` in the clock's zone.
pub fn midnight_to_now<C: Clock>(clock: &C) -> TimeWindow {
    let now = clock.now();
    TimeWindow::ending_at(local_midnight(now, &clock.zone()), now)
}

/// `[now - hours, now)`, clamped to the earliest representable instant.
pub fn past_hours_to_now<C: Clock>(clock: &C, hours: u32) -> TimeWindow {
    let now = clock.now();
    let start = now
        .checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    TimeWindow::ending_at(start, now)
}

/// Past `hours`, widened to start at midnight when midnight is earlier.
pub fn since_earlier_of<C: Clock>(clock: &C, hours: u32) -> TimeWindow {
    let midnight = midnight_to_now(clock).start();
    past_hours_to_now(clock, hours).reaching_back_to(midnight)
}

/// Start of the local calendar day containing `now`.
///
/// Zones that skip midnight for DST resolve to the first valid local instant.
fn local_midnight<Tz: TimeZone>(now: DateTime<Utc>, zone: &Tz) -> DateTime<Utc> {
    let date = now.with_timezone(zone).date_naive();
    let Some(mut candidate) = date.and_hms_opt(0, 0, 0) else {
        return now;
    };

    // DST gaps are at most a few hours; step until the local time exists.
    for _ in 0..(4 * 24) {
        if let Some(start) = zone.from_local_datetime(&candidate).earliest() {
            return start.with_timezone(&Utc).min(now);
        }
        candidate += Duration::minutes(15);
    }
    now
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use harms_core::FixedClock;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn midnight_window_in_utc() {
        let clock = FixedClock::utc(utc(2024, 3, 10, 14, 30));
        let window = midnight_to_now(&clock);
        assert_eq!(window.start(), utc(2024, 3, 10, 0, 0));
        assert_eq!(window.end(), utc(2024, 3, 10, 14, 30));
    }

    #[test]
    fn midnight_follows_the_clock_zone() {
        // 02:00 UTC is 12:00 on the 10th in UTC+10, so midnight is 14:00 UTC on the 9th.
        let zone = FixedOffset::east_opt(10 * 3600).unwrap();
        let clock = FixedClock::new(utc(2024, 3, 10, 2, 0), zone);
        let window = midnight_to_now(&clock);
        assert_eq!(window.start(), utc(2024, 3, 9, 14, 0));
    }

    #[test]
    fn midnight_west_of_utc_can_be_previous_utc_day() {
        // 03:00 UTC is 22:00 on the 9th in UTC-5.
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let clock = FixedClock::new(utc(2024, 3, 10, 3, 0), zone);
        assert_eq!(midnight_to_now(&clock).start(), utc(2024, 3, 9, 5, 0));
    }

    #[test]
    fn past_hours_window() {
        let clock = FixedClock::utc(utc(2024, 3, 10, 14, 0));
        let window = past_hours_to_now(&clock, 24);
        assert_eq!(window.start(), utc(2024, 3, 9, 14, 0));
        assert_eq!(window.end(), utc(2024, 3, 10, 14, 0));
    }

    #[test]
    fn huge_lookback_clamps_instead_of_overflowing() {
        let clock = FixedClock::utc(utc(2024, 3, 10, 14, 0));
        let window = past_hours_to_now(&clock, u32::MAX);
        assert_eq!(window.start(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window.end(), utc(2024, 3, 10, 14, 0));
    }

    #[test]
    fn earlier_of_uses_midnight_late_in_the_day() {
        let clock = FixedClock::utc(utc(2024, 3, 10, 20, 0));
        assert_eq!(since_earlier_of(&clock, 7).start(), utc(2024, 3, 10, 0, 0));
    }

    #[test]
    fn earlier_of_uses_lookback_early_in_the_day() {
        let clock = FixedClock::utc(utc(2024, 3, 10, 3, 0));
        assert_eq!(since_earlier_of(&clock, 7).start(), utc(2024, 3, 9, 20, 0));
    }
}
