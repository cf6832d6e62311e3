use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::{EngineError, EngineResult};

/// Injected time source. Resolvers never read the wall clock directly.
///
/// `zone` decides where "midnight" falls for the daily windows.
pub trait Clock {
    type Zone: TimeZone;

    fn now(&self) -> DateTime<Utc>;
    fn zone(&self) -> Self::Zone;
}

/// Clock pinned to one instant. Used for replay and tests.
#[derive(Debug, Clone)]
pub struct FixedClock<Tz: TimeZone = Utc> {
    instant: DateTime<Utc>,
    zone: Tz,
}

impl<Tz: TimeZone> FixedClock<Tz> {
    pub fn new(instant: DateTime<Utc>, zone: Tz) -> Self {
        Self { instant, zone }
    }
}

impl FixedClock<Utc> {
    pub fn utc(instant: DateTime<Utc>) -> Self {
        Self::new(instant, Utc)
    }
}

impl<Tz: TimeZone> Clock for FixedClock<Tz> {
    type Zone = Tz;

    fn now(&self) -> DateTime<Utc> {
        self.instant
    }

    fn zone(&self) -> Tz {
        self.zone.clone()
    }
}

/// Wall clock in a configured zone.
#[derive(Debug, Clone)]
pub struct SystemClock<Tz: TimeZone = Utc> {
    zone: Tz,
}

impl<Tz: TimeZone> SystemClock<Tz> {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }
}

impl<Tz: TimeZone> Clock for SystemClock<Tz> {
    type Zone = Tz;

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn zone(&self) -> Tz {
        self.zone.clone()
    }
}

/// How the end instant of a window is treated.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndBound {
    #[default]
    Exclusive,
    Inclusive,
}

/// `[start, end)` instant pair, or `[start, end]` when built with an inclusive end.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    end_bound: EndBound,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> EngineResult<Self> {
        if start > end {
            return Err(EngineError::InvalidWindow { start, end });
        }
        Ok(Self {
            start,
            end,
            end_bound: EndBound::Exclusive,
        })
    }

    /// Window ending at `end`; a `start` after `end` collapses to an empty window.
    pub fn ending_at(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: start.min(end),
            end,
            end_bound: EndBound::Exclusive,
        }
    }

    pub fn with_inclusive_end(self) -> Self {
        Self {
            end_bound: EndBound::Inclusive,
            ..self
        }
    }

    /// Same end, start moved back to `earlier` when that is earlier.
    pub fn reaching_back_to(self, earlier: DateTime<Utc>) -> Self {
        Self {
            start: self.start.min(earlier),
            ..self
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn end_bound(&self) -> EndBound {
        self.end_bound
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if at < self.start {
            return false;
        }
        match self.end_bound {
            EndBound::Exclusive => at < self.end,
            EndBound::Inclusive => at <= self.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_window() {
        let err = TimeWindow::new(at(10), at(9)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWindow { .. }));
    }

    #[test]
    fn membership_is_half_open_by_default() {
        let window = TimeWindow::new(at(0), at(12)).unwrap();
        assert!(window.contains(at(0)));
        assert!(window.contains(at(12) - Duration::seconds(1)));
        assert!(!window.contains(at(12)));
        assert!(!window.contains(at(0) - Duration::seconds(1)));
    }

    #[test]
    fn inclusive_end_admits_the_end_instant() {
        let window = TimeWindow::new(at(0), at(12)).unwrap().with_inclusive_end();
        assert!(window.contains(at(12)));
    }

    #[test]
    fn reaching_back_only_moves_start_earlier() {
        let window = TimeWindow::new(at(6), at(12)).unwrap();
        assert_eq!(window.reaching_back_to(at(2)).start(), at(2));
        assert_eq!(window.reaching_back_to(at(8)).start(), at(6));
    }

    #[test]
    fn fixed_clock_reports_its_instant_and_zone() {
        let clock = FixedClock::utc(at(5));
        assert_eq!(clock.now(), at(5));
        assert_eq!(clock.zone(), Utc);
    }
}
