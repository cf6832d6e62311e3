//! Daily mobility per clinician type.
//!
//! Values are encoded as `"<TYPE>_<LEVEL>:<details>"`, e.g. `"RN_4:Walker; 2 person assist"`.

use std::collections::{btree_map::Entry, BTreeMap};

use chrono::{DateTime, Utc};
use harms_core::{
    ClinicalRecord, ClinicianType, Clock, IndicatorResult, IndicatorValue, Measure,
    MobilityEntry, Observation,
};

use super::ResolveContext;
use crate::config::EngineConfig;
use crate::filter::relevant;
use crate::scale::ScaleReading;

const DEVICE_NOT_DOCUMENTED: &str = "Not Documented";

/// One decoded mobility value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobilityReading<'a> {
    pub clinician: ClinicianType,
    pub level: i32,
    pub details: &'a str,
}

/// Splits an encoded value. Level range checks happen against the scale.
pub fn parse_mobility(text: &str) -> Option<MobilityReading<'_>> {
    let (head, details) = text.split_once(':').unwrap_or((text, ""));
    let (tag, level) = head.trim().split_once('_')?;
    Some(MobilityReading {
        clinician: ClinicianType::from_tag(tag)?,
        level: level.trim().parse().ok()?,
        details: details.trim(),
    })
}

struct Accumulator<'r> {
    level: i32,
    latest: &'r Observation,
    latest_at: DateTime<Utc>,
    details: &'r str,
}

pub fn mobility<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    let config = ctx.config;
    let mut readings: Vec<(&Observation, DateTime<Utc>, MobilityReading<'_>)> =
        relevant(&ctx.records.observations, &config.codes.mobility, ctx.today)
            .filter_map(|observation| {
                let recorded_at = observation.record_time()?;
                read_level(observation, config)
                    .map(|reading| (observation, recorded_at, reading))
            })
            .collect();
    // Stable, so equal timestamps keep input order.
    readings.sort_by_key(|(_, recorded_at, _)| *recorded_at);

    let mut by_clinician: BTreeMap<ClinicianType, Accumulator<'_>> = BTreeMap::new();
    for (observation, recorded_at, reading) in readings {
        match by_clinician.entry(reading.clinician) {
            Entry::Vacant(slot) => {
                slot.insert(Accumulator {
                    level: reading.level,
                    latest: observation,
                    latest_at: recorded_at,
                    details: reading.details,
                });
            }
            Entry::Occupied(mut slot) => {
                let accumulator = slot.get_mut();
                accumulator.level = accumulator.level.max(reading.level);
                if recorded_at > accumulator.latest_at {
                    accumulator.latest = observation;
                    accumulator.latest_at = recorded_at;
                    accumulator.details = reading.details;
                }
            }
        }
    }

    let freshest = by_clinician
        .values()
        .fold(None::<&Accumulator<'_>>, |best, candidate| match best {
            Some(best) if best.latest_at >= candidate.latest_at => Some(best),
            _ => Some(candidate),
        })
        .map(|accumulator| accumulator.latest);
    let Some(freshest) = freshest else {
        return IndicatorResult::not_documented(ctx.now).within(&ctx.today);
    };

    let entries = by_clinician
        .iter()
        .map(|(clinician, accumulator)| entry(*clinician, accumulator, config))
        .collect();
    IndicatorResult::from_record(
        IndicatorValue::Documented(Measure::Mobility(entries)),
        freshest,
        ctx.now,
    )
    .within(&ctx.today)
}

fn read_level<'r>(
    observation: &'r Observation,
    config: &EngineConfig,
) -> Option<MobilityReading<'r>> {
    let reading = observation
        .value
        .as_ref()
        .and_then(|value| value.as_text())
        .and_then(parse_mobility);
    let Some(reading) = reading else {
        tracing::warn!(
            record_id = %observation.id,
            value = ?observation.value,
            "skipping malformed mobility entry"
        );
        return None;
    };
    match config.scales.mobility.read(reading.level) {
        Some(ScaleReading::Score(_)) => Some(reading),
        Some(ScaleReading::Special(_)) => None,
        None => {
            tracing::warn!(
                record_id = %observation.id,
                level = reading.level,
                "skipping mobility level outside the scale"
            );
            None
        }
    }
}

fn entry(
    clinician: ClinicianType,
    accumulator: &Accumulator<'_>,
    config: &EngineConfig,
) -> MobilityEntry {
    let (assist_device, assist_count) = match clinician {
        ClinicianType::Nurse => {
            let tables = &config.tables;
            let device = if accumulator.details.is_empty() {
                DEVICE_NOT_DOCUMENTED.to_string()
            } else {
                tables.rn_assist_device.classify_text(accumulator.details).clone()
            };
            let count = tables.rn_assist_count.classify_text(accumulator.details).clone();
            (Some(device), Some(count))
        }
        ClinicianType::OccupationalTherapist | ClinicianType::PhysicalTherapist => (None, None),
    };

    MobilityEntry {
        clinician,
        level: accumulator.level,
        recorded_at: accumulator.latest_at,
        assist_device,
        assist_count,
        source: accumulator.latest.reference(),
    }
}
