//! Clinician-set RASS and pain goals, read from in-progress procedure requests.

use harms_core::{
    ClinicalRecord, Clock, IndicatorResult, IndicatorValue, ProcedureStatus, SpecialValue,
};

use super::{first_integer, ResolveContext};
use crate::config::EngineConfig;
use crate::filter::relevant;
use crate::scale::ScaleReading;
use crate::selection::freshest_by;

/// Freshest in-progress RASS goal. Paralytic and seizure goals resolve to
/// not applicable rather than a score.
pub fn rass_goal<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    resolve_goal(ctx, &ctx.config.codes.rass_goal, parse_rass_goal)
}

pub fn pain_goal<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    resolve_goal(ctx, &ctx.config.codes.pain_goal, parse_pain_goal)
}

fn resolve_goal<C, F>(ctx: &ResolveContext<'_, C>, code: &str, parse: F) -> IndicatorResult
where
    C: Clock,
    F: Fn(&str, &EngineConfig) -> Option<IndicatorValue>,
{
    // Goals scheduled for exactly now still count.
    let window = ctx
        .past_hours(ctx.config.goal_lookback_hours)
        .with_inclusive_end();

    let goals = relevant(&ctx.records.procedure_requests, code, window)
        .filter(|request| request.status == ProcedureStatus::InProgress)
        .filter_map(|request| {
            let notes = request.notes_text.as_deref().unwrap_or_default();
            let value = parse(notes, ctx.config);
            if value.is_none() {
                tracing::warn!(record_id = %request.id, code, notes, "skipping unreadable goal");
            }
            value.map(|value| (request, value))
        });

    match freshest_by(goals, |(request, _)| request.record_time()) {
        Some((request, value)) => {
            IndicatorResult::from_record(value, request, ctx.now).within(&window)
        }
        None => IndicatorResult::not_documented(ctx.now).within(&window),
    }
}

fn parse_rass_goal(notes: &str, config: &EngineConfig) -> Option<IndicatorValue> {
    if let Some(special) = *config.tables.rass_goal.classify_text(notes) {
        return Some(special.into());
    }
    match config.scales.rass.read(first_integer(notes)?)? {
        ScaleReading::Score(score) => Some(IndicatorValue::score(score)),
        // A charted "not documented" sentinel is no goal at all.
        ScaleReading::Special(SpecialValue::NotDocumented) => None,
        ScaleReading::Special(special) => Some(special.into()),
    }
}

fn parse_pain_goal(notes: &str, config: &EngineConfig) -> Option<IndicatorValue> {
    match config.scales.pain_goal.read(first_integer(notes)?)? {
        ScaleReading::Score(score) => Some(IndicatorValue::score(score)),
        ScaleReading::Special(_) => None,
    }
}
