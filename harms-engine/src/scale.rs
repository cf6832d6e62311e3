//! Score scales and their reserved raw values.

use harms_core::{IndicatorValue, SpecialValue};
use serde::{Deserialize, Serialize};

/// Raw value a charting system uses to mean something other than a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sentinel {
    pub raw: i32,
    pub meaning: SpecialValue,
}

/// A raw number decoded against its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleReading {
    Score(i32),
    Special(SpecialValue),
}

impl From<ScaleReading> for IndicatorValue {
    fn from(reading: ScaleReading) -> Self {
        match reading {
            ScaleReading::Score(score) => IndicatorValue::score(score),
            ScaleReading::Special(special) => special.into(),
        }
    }
}

/// Inclusive score range plus the sentinel table for one instrument.
///
/// Sentinels are checked before the range: a BPS scale (3..=12) cannot use 11
/// or 12 as sentinels, a RASS scale can.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreScale {
    pub min: i32,
    pub max: i32,
    #[serde(default)]
    pub sentinels: Vec<Sentinel>,
}

impl ScoreScale {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            sentinels: Vec::new(),
        }
    }

    pub fn with_sentinel(mut self, raw: i32, meaning: SpecialValue) -> Self {
        self.sentinels.push(Sentinel { raw, meaning });
        self
    }

    /// `None` when the value is neither a sentinel nor on the scale.
    pub fn read(&self, raw: i32) -> Option<ScaleReading> {
        if let Some(sentinel) = self.sentinels.iter().find(|sentinel| sentinel.raw == raw) {
            return Some(ScaleReading::Special(sentinel.meaning));
        }
        (self.min..=self.max)
            .contains(&raw)
            .then_some(ScaleReading::Score(raw))
    }

    pub fn is_sentinel(&self, raw: i32) -> bool {
        self.sentinels.iter().any(|sentinel| sentinel.raw == raw)
    }

    pub fn sentinel_values(&self) -> Vec<i32> {
        self.sentinels.iter().map(|sentinel| sentinel.raw).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harms_core::NotApplicableReason;

    fn rass() -> ScoreScale {
        ScoreScale::new(-5, 4)
            .with_sentinel(11, SpecialValue::NotDocumented)
            .with_sentinel(12, SpecialValue::NotApplicable(NotApplicableReason::Paralytic))
    }

    #[test]
    fn reads_scores_and_sentinels() {
        let scale = rass();
        assert_eq!(scale.read(-5), Some(ScaleReading::Score(-5)));
        assert_eq!(scale.read(4), Some(ScaleReading::Score(4)));
        assert_eq!(
            scale.read(11),
            Some(ScaleReading::Special(SpecialValue::NotDocumented))
        );
        assert_eq!(scale.read(7), None);
        assert_eq!(scale.sentinel_values(), vec![11, 12]);
    }

    #[test]
    fn sentinel_reading_becomes_indicator_value() {
        let value: IndicatorValue = rass().read(12).unwrap().into();
        assert_eq!(
            value,
            IndicatorValue::NotApplicable(NotApplicableReason::Paralytic)
        );
    }
}
