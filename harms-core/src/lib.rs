//! Core model for the ICU harm evidence engine: clinical records, time windows,
//! indicator results and the aggregate snapshot handed to reporting.

mod clock;
mod error;
mod indicator;
mod record;

pub use clock::{Clock, EndBound, FixedClock, SystemClock, TimeWindow};
pub use error::{EngineError, EngineResult, RepositoryError};
pub use indicator::{
    AggregateSnapshot, AnticoagulationType, ClinicianType, Indicator, IndicatorResult,
    IndicatorValue, Measure, MobilityEntry, NotApplicableReason, SourceReference, SpecialValue,
};
pub use record::{
    AdministrationStatus, ClinicalRecord, EncounterRecords, MedicationAdministration,
    MedicationOrder, Observation, ObservationValue, OrderStatus, ProcedureRequest,
    ProcedureStatus, RecordKind, ScheduledTime, SourceOrderState,
};

/// Empty snapshot for an encounter, every indicator set to not documented.
pub fn empty_snapshot(
    encounter_id: impl Into<String>,
    generated_at: chrono::DateTime<chrono::Utc>,
) -> AggregateSnapshot {
    let indicators = Indicator::ALL
        .iter()
        .map(|indicator| (*indicator, IndicatorResult::not_documented(generated_at)))
        .collect();

    AggregateSnapshot {
        encounter_id: encounter_id.into(),
        generated_at,
        indicators,
    }
}
