//! Therapeutic anticoagulation class from recent administrations.

use harms_core::{
    ClinicalRecord, Clock, IndicatorResult, IndicatorValue, Measure, ObservationValue,
};

use super::ResolveContext;
use crate::bands::{BandPredicate, Bands};
use crate::filter::{in_window, relevant};
use crate::selection::{freshest, freshest_by};

/// Class of the most recent administration matching an anticoagulant regimen.
///
/// INR-gated regimens (warfarin) are dropped before the latest is chosen when
/// the freshest INR in the lookback is missing or not above the threshold.
pub fn anticoagulation<C: Clock>(ctx: &ResolveContext<'_, C>) -> IndicatorResult {
    let config = ctx.config;
    let window = ctx.past_hours(config.anticoagulation_window_hours);
    let inr_elevated = inr_elevated(ctx);
    let matcher = ctx.dose_matcher();

    let candidates = ctx
        .records
        .medication_administrations
        .iter()
        .filter(|administration| in_window(*administration, &window))
        .filter_map(|administration| {
            match matcher.match_administration(administration, &config.anticoagulants) {
                Ok(rule) if rule.inr_gated && !inr_elevated => {
                    tracing::debug!(
                        record_id = %administration.id,
                        drug = %administration.drug_identifier,
                        "INR not above threshold, administration vetoed"
                    );
                    None
                }
                Ok(rule) => Some((administration, rule.class)),
                Err(reason) => {
                    tracing::debug!(
                        record_id = %administration.id,
                        drug = %administration.drug_identifier,
                        ?reason,
                        "administration is not therapeutic anticoagulation"
                    );
                    None
                }
            }
        });

    match freshest_by(candidates, |(administration, _)| administration.record_time()) {
        Some((administration, class)) => IndicatorResult::from_record(
            IndicatorValue::Documented(Measure::Anticoagulation(class)),
            administration,
            ctx.now,
        )
        .within(&window),
        None => IndicatorResult::not_documented(ctx.now).within(&window),
    }
}

/// Freshest readable INR in the lookback is above the configured threshold.
fn inr_elevated<C: Clock>(ctx: &ResolveContext<'_, C>) -> bool {
    let config = ctx.config;
    let window = ctx.past_hours(config.inr_lookback_hours);
    let gate = Bands::new(false).with(BandPredicate::Above(config.inr_threshold), true);

    let readable = relevant(&ctx.records.observations, &config.codes.inr, window).filter(
        |observation| {
            let readable = observation
                .value
                .as_ref()
                .and_then(ObservationValue::as_f64)
                .is_some();
            if !readable {
                tracing::warn!(record_id = %observation.id, "skipping unreadable INR");
            }
            readable
        },
    );

    freshest(readable)
        .and_then(|observation| observation.value.as_ref())
        .and_then(ObservationValue::as_f64)
        .is_some_and(|inr| *gate.classify_number(inr))
}
