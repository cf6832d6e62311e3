//! Sedation and pain scores: current, daily minimum and daily maximum.

use harms_core::{
    ClinicalRecord, Clock, Indicator, IndicatorResult, IndicatorValue, Observation,
    ObservationValue,
};

use super::ResolveContext;
use crate::config::{EngineConfig, IndicatorCodes, ScoreScales};
use crate::filter::{in_window, relevant};
use crate::scale::ScoreScale;
use crate::selection::{extremum, freshest_by, Extreme};

/// Instruments that produce a current/min/max triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreIndicator {
    Rass,
    Cpot,
    NumericPain,
    VerbalPain,
    BehavioralPain,
}

impl ScoreIndicator {
    pub const ALL: [ScoreIndicator; 5] = [
        ScoreIndicator::Rass,
        ScoreIndicator::Cpot,
        ScoreIndicator::NumericPain,
        ScoreIndicator::VerbalPain,
        ScoreIndicator::BehavioralPain,
    ];

    /// Snapshot keys in `[current, min, max]` order.
    pub fn indicators(self) -> [Indicator; 3] {
        match self {
            ScoreIndicator::Rass => [
                Indicator::RassCurrent,
                Indicator::RassMin,
                Indicator::RassMax,
            ],
            ScoreIndicator::Cpot => [
                Indicator::CpotCurrent,
                Indicator::CpotMin,
                Indicator::CpotMax,
            ],
            ScoreIndicator::NumericPain => [
                Indicator::NumericPainCurrent,
                Indicator::NumericPainMin,
                Indicator::NumericPainMax,
            ],
            ScoreIndicator::VerbalPain => [
                Indicator::VerbalPainCurrent,
                Indicator::VerbalPainMin,
                Indicator::VerbalPainMax,
            ],
            ScoreIndicator::BehavioralPain => [
                Indicator::BehavioralPainCurrent,
                Indicator::BehavioralPainMin,
                Indicator::BehavioralPainMax,
            ],
        }
    }

    fn code(self, codes: &IndicatorCodes) -> &str {
        match self {
            ScoreIndicator::Rass => &codes.rass,
            ScoreIndicator::Cpot => &codes.cpot,
            ScoreIndicator::NumericPain => &codes.numeric_pain,
            ScoreIndicator::VerbalPain => &codes.verbal_pain,
            ScoreIndicator::BehavioralPain => &codes.behavioral_pain,
        }
    }

    fn scale(self, scales: &ScoreScales) -> &ScoreScale {
        match self {
            ScoreIndicator::Rass => &scales.rass,
            ScoreIndicator::Cpot => &scales.cpot,
            ScoreIndicator::NumericPain => &scales.numeric_pain,
            ScoreIndicator::VerbalPain => &scales.verbal_pain,
            ScoreIndicator::BehavioralPain => &scales.behavioral_pain,
        }
    }

    /// Raw value before scale checks. Verbal descriptors go through the
    /// verbal pain table; everything else must be a whole number.
    fn raw_value(self, value: &ObservationValue, config: &EngineConfig) -> Option<i32> {
        match (self, value) {
            (ScoreIndicator::VerbalPain, ObservationValue::Text(text)) => {
                match text.trim().parse::<i32>() {
                    Ok(raw) => Some(raw),
                    Err(_) => *config.tables.verbal_pain.classify_text(text),
                }
            }
            _ => value.as_integer(),
        }
    }
}

/// All score indicators, three results per instrument.
pub fn resolve_scores<C: Clock>(ctx: &ResolveContext<'_, C>) -> Vec<(Indicator, IndicatorResult)> {
    ScoreIndicator::ALL
        .iter()
        .flat_map(|score| resolve_score(ctx, *score))
        .collect()
}

pub fn resolve_score<C: Clock>(
    ctx: &ResolveContext<'_, C>,
    score: ScoreIndicator,
) -> [(Indicator, IndicatorResult); 3] {
    let scale = score.scale(&ctx.config.scales);
    let readings = readings(ctx, score);
    let [current_key, min_key, max_key] = score.indicators();

    let current = freshest_by(
        readings
            .iter()
            .copied()
            .filter(|(_, raw)| !scale.is_sentinel(*raw)),
        |(observation, _)| observation.record_time(),
    );

    let sentinels = scale.sentinel_values();
    let today = readings
        .iter()
        .copied()
        .filter(|(observation, _)| in_window(*observation, &ctx.today));
    let min = extremum(today.clone(), Extreme::Min, |(_, raw)| Some(*raw), &sentinels)
        .map(|(reading, _)| reading);
    let max = extremum(today, Extreme::Max, |(_, raw)| Some(*raw), &sentinels)
        .map(|(reading, _)| reading);

    let to_result = |selected: Option<(&Observation, i32)>| match selected {
        Some((observation, raw)) => {
            IndicatorResult::from_record(IndicatorValue::score(raw), observation, ctx.now)
        }
        None => IndicatorResult::not_documented(ctx.now),
    };

    [
        (current_key, to_result(current).within(&ctx.current)),
        (min_key, to_result(min).within(&ctx.today)),
        (max_key, to_result(max).within(&ctx.today)),
    ]
}

/// Well-formed readings in the current window, which always covers today.
fn readings<'r, C: Clock>(
    ctx: &ResolveContext<'r, C>,
    score: ScoreIndicator,
) -> Vec<(&'r Observation, i32)> {
    let (records, config) = (ctx.records, ctx.config);
    let code = score.code(&config.codes);
    let scale = score.scale(&config.scales);

    relevant(&records.observations, code, ctx.current)
        .filter_map(|observation| {
            let raw = observation
                .value
                .as_ref()
                .and_then(|value| score.raw_value(value, config))
                .filter(|raw| scale.read(*raw).is_some());
            if raw.is_none() {
                tracing::warn!(
                    record_id = %observation.id,
                    code,
                    value = ?observation.value,
                    "skipping malformed score"
                );
            }
            raw.map(|raw| (observation, raw))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use harms_core::{EncounterRecords, FixedClock};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap()
    }

    fn obs(id: &str, code: &str, hours_ago: i64, value: ObservationValue) -> Observation {
        Observation {
            id: id.into(),
            code: code.into(),
            value: Some(value),
            effective_time: Some(now() - Duration::hours(hours_ago)),
            issued_time: None,
        }
    }

    fn numeric(id: &str, code: &str, hours_ago: i64, value: f64) -> Observation {
        obs(id, code, hours_ago, ObservationValue::Numeric(value))
    }

    fn resolve(records: &EncounterRecords, score: ScoreIndicator) -> [Option<i32>; 3] {
        let config = EngineConfig::default();
        let clock = FixedClock::utc(now());
        let ctx = ResolveContext::new(records, &config, &clock);
        resolve_score(&ctx, score).map(|(_, result)| result.score())
    }

    #[test]
    fn rass_scenario() {
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![
            numeric("a", "RASS", 2, -2.0),
            numeric("b", "RASS", 9, -5.0),
            numeric("c", "RASS", 1, 11.0),
        ];
        let [current, min, max] = resolve(&records, ScoreIndicator::Rass);
        assert_eq!(current, Some(-2));
        assert_eq!(min, Some(-5));
        assert_eq!(max, Some(-2));
    }

    #[test]
    fn current_window_reaches_back_seven_hours_before_midnight() {
        // 03:00 local; midnight was 3h ago, the 7h lookback is earlier.
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap();
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![Observation {
            effective_time: Some(now - Duration::hours(6)),
            ..numeric("a", "CPOT", 0, 2.0)
        }];
        let config = EngineConfig::default();
        let clock = FixedClock::utc(now);
        let ctx = ResolveContext::new(&records, &config, &clock);
        let [(_, current), (_, min), _] = resolve_score(&ctx, ScoreIndicator::Cpot);
        assert_eq!(current.score(), Some(2));
        // Yesterday's reading does not count towards today's extremes.
        assert_eq!(min.value, IndicatorValue::NotDocumented);
    }

    #[test]
    fn out_of_range_and_fractional_values_are_skipped() {
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![
            numeric("a", "CPOT", 1, 9.0),
            numeric("b", "CPOT", 2, 2.5),
            numeric("c", "CPOT", 3, 4.0),
            obs("d", "CPOT", 4, ObservationValue::Text("pending".into())),
        ];
        let [current, min, max] = resolve(&records, ScoreIndicator::Cpot);
        assert_eq!(current, Some(4));
        assert_eq!((min, max), (Some(4), Some(4)));
    }

    #[test]
    fn behavioral_pain_treats_eleven_as_a_score() {
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![
            numeric("a", "PAIN_BPS", 1, 11.0),
            numeric("b", "PAIN_BPS", 2, -6.0),
            numeric("c", "PAIN_BPS", 3, 4.0),
        ];
        let [current, min, max] = resolve(&records, ScoreIndicator::BehavioralPain);
        assert_eq!(current, Some(11));
        assert_eq!((min, max), (Some(4), Some(11)));
    }

    #[test]
    fn verbal_descriptors_map_to_scores() {
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![
            obs("a", "PAIN_VERBAL", 1, ObservationValue::Text("Mild".into())),
            obs("b", "PAIN_VERBAL", 2, ObservationValue::Text("Severe pain".into())),
            obs("c", "PAIN_VERBAL", 3, ObservationValue::Text("Unable to rate".into())),
            obs("d", "PAIN_VERBAL", 4, ObservationValue::Text("grimacing".into())),
        ];
        let [current, min, max] = resolve(&records, ScoreIndicator::VerbalPain);
        assert_eq!(current, Some(2));
        assert_eq!((min, max), (Some(2), Some(8)));
    }

    #[test]
    fn only_sentinels_resolve_to_not_documented() {
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![
            numeric("a", "PAIN_NRS", 1, 11.0),
            numeric("b", "PAIN_NRS", 2, 99_999_999.0),
        ];
        let config = EngineConfig::default();
        let clock = FixedClock::utc(now());
        let ctx = ResolveContext::new(&records, &config, &clock);
        for (_, result) in resolve_score(&ctx, ScoreIndicator::NumericPain) {
            assert_eq!(result.value, IndicatorValue::NotDocumented);
            assert!(result.source.is_none());
            assert_eq!(result.calculated_at, now());
        }
    }

    #[test]
    fn results_carry_provenance_and_window() {
        let mut records = EncounterRecords::new("enc-1");
        records.observations = vec![numeric("rass-7", "RASS", 2, 0.0)];
        let config = EngineConfig::default();
        let clock = FixedClock::utc(now());
        let ctx = ResolveContext::new(&records, &config, &clock);
        let [(key, current), ..] = resolve_score(&ctx, ScoreIndicator::Rass);
        assert_eq!(key, Indicator::RassCurrent);
        assert_eq!(current.source.map(|source| source.id), Some("rass-7".to_string()));
        assert_eq!(current.recorded_at, Some(now() - Duration::hours(2)));
        assert_eq!(current.window_end, Some(now()));
    }
}
