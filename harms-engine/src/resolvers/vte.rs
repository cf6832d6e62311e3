//! VTE prophylaxis: mechanical devices and pharmacologic orders/administrations.

use chrono::{DateTime, Utc};
use harms_core::{
    ClinicalRecord, Clock, IndicatorResult, IndicatorValue, ProcedureRequest, ProcedureStatus,
    TimeWindow,
};

use super::ResolveContext;
use crate::filter::{in_window, is_relevant_to_any};
use crate::selection::freshest;

/// Device currently in place: the freshest placement is newer than the freshest removal.
///
/// Looks over the whole encounter history. A removal at the same instant as the
/// placement wins.
pub fn mechanical_ordered<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    let codes = &ctx.config.codes;
    let history = TimeWindow::ending_at(DateTime::<Utc>::MIN_UTC, ctx.now);
    let requests = &ctx.records.procedure_requests;

    let Some(place) = latest_live(requests, &codes.mechanical_place, &history) else {
        return IndicatorResult::not_documented(ctx.now).within(&history);
    };
    let result = match latest_live(requests, &codes.mechanical_remove, &history) {
        Some(remove) if remove.record_time() >= place.record_time() => {
            IndicatorResult::from_record(IndicatorValue::flag(false), remove, ctx.now)
        }
        _ => IndicatorResult::from_record(IndicatorValue::flag(true), place, ctx.now),
    };
    result.within(&history)
}

fn latest_live<'r>(
    requests: &'r [ProcedureRequest],
    codes: &[String],
    window: &TimeWindow,
) -> Option<&'r ProcedureRequest> {
    freshest(requests.iter().filter(|request| {
        !matches!(
            request.status,
            ProcedureStatus::Cancelled | ProcedureStatus::EnteredInError
        ) && is_relevant_to_any(*request, codes, window)
    }))
}

/// Latest prophylactic administration in the VTE window that matches a regimen.
pub fn pharmacologic_administered<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    let window = ctx.past_hours(ctx.config.vte_window_hours);
    let matcher = ctx.dose_matcher();
    let rules = &ctx.config.vte_prophylaxis;

    let qualifying = ctx
        .records
        .medication_administrations
        .iter()
        .filter(|administration| in_window(*administration, &window))
        .filter(|administration| match matcher.match_administration(administration, rules) {
            Ok(_) => true,
            Err(reason) => {
                tracing::debug!(
                    record_id = %administration.id,
                    drug = %administration.drug_identifier,
                    ?reason,
                    "administration is not VTE prophylaxis"
                );
                false
            }
        });

    match freshest(qualifying) {
        Some(administration) => {
            IndicatorResult::from_record(IndicatorValue::flag(true), administration, ctx.now)
                .within(&window)
        }
        None => IndicatorResult::not_documented(ctx.now).within(&window),
    }
}

/// Latest still-valid prophylactic order, by written time.
pub fn pharmacologic_ordered<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    let window = ctx.past_hours(ctx.config.vte_window_hours);
    let matcher = ctx.dose_matcher();
    let rules = &ctx.config.vte_prophylaxis;

    let qualifying = ctx
        .records
        .medication_orders
        .iter()
        .filter(|order| match matcher.match_order(order, &window, rules) {
            Ok(_) => true,
            Err(reason) => {
                tracing::debug!(
                    record_id = %order.id,
                    drug = %order.drug_identifier,
                    ?reason,
                    "order is not VTE prophylaxis"
                );
                false
            }
        });

    match freshest(qualifying) {
        Some(order) => {
            IndicatorResult::from_record(IndicatorValue::flag(true), order, ctx.now)
                .within(&window)
        }
        None => IndicatorResult::not_documented(ctx.now).within(&window),
    }
}
