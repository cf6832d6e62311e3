//! Runs every resolver for one encounter at one instant.

use harms_core::{
    empty_snapshot, AggregateSnapshot, Clock, EncounterRecords, EngineError, EngineResult,
    Indicator, RepositoryError, TimeWindow,
};

use crate::config::EngineConfig;
use crate::repository::ClinicalRepository;
use crate::resolvers::{anticoagulation, goals, mobility, scores, vte, ResolveContext};
use crate::windows::since_earlier_of;

/// Resolves all indicators from records already in memory.
///
/// Pure in `(records, clock.now())`. The snapshot always carries every
/// [`Indicator`] key; anything unresolved stays not documented.
pub fn resolve_snapshot<C: Clock>(
    records: &EncounterRecords,
    clock: &C,
    config: &EngineConfig,
) -> AggregateSnapshot {
    let ctx = ResolveContext::new(records, config, clock);
    let mut snapshot = empty_snapshot(records.encounter_id.as_str(), ctx.now);

    let mut resolved = scores::resolve_scores(&ctx);
    resolved.extend([
        (Indicator::RassGoal, goals::rass_goal(&ctx)),
        (Indicator::PainGoal, goals::pain_goal(&ctx)),
        (Indicator::Mobility, mobility::mobility(&ctx)),
        (Indicator::VteMechanicalOrdered, vte::mechanical_ordered(&ctx)),
        (
            Indicator::VtePharmacologicAdministered,
            vte::pharmacologic_administered(&ctx),
        ),
        (
            Indicator::VtePharmacologicOrdered,
            vte::pharmacologic_ordered(&ctx),
        ),
        (
            Indicator::Anticoagulation,
            anticoagulation::anticoagulation(&ctx),
        ),
    ]);
    snapshot.indicators.extend(resolved);

    tracing::info!(
        encounter_id = %records.encounter_id,
        records = records.record_count(),
        documented = snapshot.documented_count(),
        "resolved harm indicators"
    );
    snapshot
}

/// Gathers records through a repository, then resolves them.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder<R> {
    repository: R,
    config: EngineConfig,
}

impl<R: ClinicalRepository> SnapshotBuilder<R> {
    pub fn new(repository: R, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { repository, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Builds the snapshot for one encounter. Only repository failures are errors.
    pub fn build_snapshot<C: Clock>(
        &self,
        encounter_id: &str,
        clock: &C,
    ) -> EngineResult<AggregateSnapshot> {
        let records = self
            .gather(encounter_id, clock)
            .map_err(|source| EngineError::Repository {
                encounter_id: encounter_id.to_string(),
                source,
            })?;
        Ok(resolve_snapshot(&records, clock, &self.config))
    }

    fn gather<C: Clock>(
        &self,
        encounter_id: &str,
        clock: &C,
    ) -> Result<EncounterRecords, RepositoryError> {
        let config = &self.config;
        let codes = &config.codes;
        let repository = &self.repository;

        let window = self.observation_window(clock);
        let mut records = EncounterRecords::new(encounter_id);
        for code in [
            &codes.rass,
            &codes.cpot,
            &codes.numeric_pain,
            &codes.verbal_pain,
            &codes.behavioral_pain,
            &codes.mobility,
            &codes.inr,
        ] {
            records
                .observations
                .extend(repository.observations(encounter_id, code, &window)?);
        }

        let drug_names = &config.tables.drug_names;
        let known_drug = |identifier: &str| drug_names.classify_text(identifier).is_some();
        records.medication_orders = repository.medication_orders(encounter_id, &known_drug)?;
        records.medication_administrations =
            repository.medication_administrations(encounter_id, &known_drug)?;

        let procedure_codes = [&codes.rass_goal, &codes.pain_goal]
            .into_iter()
            .chain(&codes.mechanical_place)
            .chain(&codes.mechanical_remove);
        for code in procedure_codes {
            records
                .procedure_requests
                .extend(repository.procedure_requests(encounter_id, code)?);
        }

        records.patient_weight_kg = repository.patient_weight(encounter_id)?;

        tracing::debug!(
            encounter_id,
            records = records.record_count(),
            from = %window.start(),
            "gathered encounter records"
        );
        Ok(records)
    }

    /// Reaches back as far as any observation-based indicator looks.
    fn observation_window<C: Clock>(&self, clock: &C) -> TimeWindow {
        let config = &self.config;
        let longest = config.current_lookback_hours.max(config.inr_lookback_hours);
        since_earlier_of(clock, longest)
    }
}
