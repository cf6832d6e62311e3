//! One resolver per indicator family. Resolvers never fail: malformed records are
//! logged and skipped, and missing data resolves to the indicator default.

pub mod anticoagulation;
pub mod goals;
pub mod mobility;
pub mod scores;
pub mod vte;

use chrono::{DateTime, Utc};
use harms_core::{Clock, EncounterRecords, TimeWindow};

use crate::config::EngineConfig;
use crate::dose::DoseMatcher;
use crate::windows::{midnight_to_now, past_hours_to_now, since_earlier_of};

/// Records, configuration and the evaluation instant shared by every resolver.
///
/// Windows are computed once from the clock so all indicators in a snapshot
/// agree on `now`.
#[derive(Debug)]
pub struct ResolveContext<'a, C: Clock> {
    pub records: &'a EncounterRecords,
    pub config: &'a EngineConfig,
    clock: &'a C,
    pub now: DateTime<Utc>,
    /// Local midnight to now.
    pub today: TimeWindow,
    /// Current-score lookback, widened to midnight when that is earlier.
    pub current: TimeWindow,
}

impl<'a, C: Clock> ResolveContext<'a, C> {
    pub fn new(records: &'a EncounterRecords, config: &'a EngineConfig, clock: &'a C) -> Self {
        Self {
            records,
            config,
            clock,
            now: clock.now(),
            today: midnight_to_now(clock),
            current: since_earlier_of(clock, config.current_lookback_hours),
        }
    }

    pub fn past_hours(&self, hours: u32) -> TimeWindow {
        past_hours_to_now(self.clock, hours)
    }

    pub fn dose_matcher(&self) -> DoseMatcher<'a> {
        DoseMatcher::new(
            &self.config.tables.drug_names,
            self.records.patient_weight_kg,
            self.now,
        )
    }
}

/// First whole number in free text, keeping a directly preceding minus sign.
///
/// `"Goal RASS -2 to 0"` reads as `-2`.
pub(crate) fn first_integer(text: &str) -> Option<i32> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let end = bytes[start..]
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .map_or(bytes.len(), |len| start + len);
    let value: i32 = text[start..end].parse().ok()?;
    if start > 0 && bytes[start - 1] == b'-' {
        Some(-value)
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_integer_in_notes() {
        assert_eq!(first_integer("Goal RASS -2 to 0"), Some(-2));
        assert_eq!(first_integer("pain goal: 3"), Some(3));
        assert_eq!(first_integer("RASS-GOAL 0"), Some(0));
        assert_eq!(first_integer("light sedation"), None);
        assert_eq!(first_integer(""), None);
    }
}
