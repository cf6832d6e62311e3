//! Clinical records produced by the upstream HL7 ETL. The engine only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceReference;

/// Which record family a fact came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Observation,
    MedicationOrder,
    MedicationAdministration,
    ProcedureRequest,
}

/// Any timestamped clinical fact.
///
/// `code` is the observation/procedure code, or the drug identifier for
/// medication records. `record_time` is the instant used for windowing and
/// freshness; a record without one never qualifies.
pub trait ClinicalRecord {
    fn record_id(&self) -> &str;
    fn code(&self) -> &str;
    fn record_time(&self) -> Option<DateTime<Utc>>;
    fn kind(&self) -> RecordKind;

    fn reference(&self) -> SourceReference {
        SourceReference {
            kind: self.kind(),
            id: self.record_id().to_string(),
            display: Some(self.code().to_string()),
        }
    }
}

/// Observation value as delivered in OBX-5: numeric or free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ObservationValue {
    Numeric(f64),
    Text(String),
}

impl ObservationValue {
    /// Numeric reading, parsing text such as `"-2"` or `" 1.8 "`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Numeric(value) => *value,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Whole-number reading. Fractional values are rejected, not rounded.
    pub fn as_integer(&self) -> Option<i32> {
        let value = self.as_f64()?;
        if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
            return None;
        }
        Some(value as i32)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Numeric(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub id: String,
    pub code: String,
    pub value: Option<ObservationValue>,
    pub effective_time: Option<DateTime<Utc>>,
    pub issued_time: Option<DateTime<Utc>>,
}

impl ClinicalRecord for Observation {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn record_time(&self) -> Option<DateTime<Utc>> {
        self.effective_time.or(self.issued_time)
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Observation
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Active,
    Draft,
    Completed,
    Stopped,
    EnteredInError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationOrder {
    pub id: String,
    pub drug_identifier: String,
    pub status: Option<OrderStatus>,
    pub dose_quantity: Option<f64>,
    pub dose_unit: Option<String>,
    pub written_time: Option<DateTime<Utc>>,
    pub ended_time: Option<DateTime<Utc>>,
}

impl ClinicalRecord for MedicationOrder {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn code(&self) -> &str {
        &self.drug_identifier
    }

    fn record_time(&self) -> Option<DateTime<Utc>> {
        self.written_time
    }

    fn kind(&self) -> RecordKind {
        RecordKind::MedicationOrder
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdministrationStatus {
    InProgress,
    Completed,
    NotDone,
    OnHold,
    Stopped,
    EnteredInError,
}

impl AdministrationStatus {
    /// Whether the drug actually reached the patient.
    pub fn is_given(self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

/// State of the order an administration was charted against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SourceOrderState {
    ActiveOrder,
    CompletedOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationAdministration {
    pub id: String,
    pub drug_identifier: String,
    pub status: AdministrationStatus,
    pub dose_quantity: Option<f64>,
    pub dose_unit: Option<String>,
    pub effective_time: Option<DateTime<Utc>>,
    pub source_order_state: SourceOrderState,
}

impl ClinicalRecord for MedicationAdministration {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn code(&self) -> &str {
        &self.drug_identifier
    }

    fn record_time(&self) -> Option<DateTime<Utc>> {
        self.effective_time
    }

    fn kind(&self) -> RecordKind {
        RecordKind::MedicationAdministration
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcedureStatus {
    Draft,
    Active,
    InProgress,
    Suspended,
    Completed,
    Cancelled,
    EnteredInError,
    Unknown,
}

/// Procedure request timing: a single instant or a period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScheduledTime {
    Instant(DateTime<Utc>),
    Period {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

impl ScheduledTime {
    /// Instant used for ordering: the instant itself or the period start.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(at) => Some(*at),
            Self::Period { start, end } => start.or(*end),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcedureRequest {
    pub id: String,
    pub code: String,
    pub status: ProcedureStatus,
    pub scheduled_time: Option<ScheduledTime>,
    pub notes_text: Option<String>,
}

impl ClinicalRecord for ProcedureRequest {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn record_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_time.as_ref().and_then(ScheduledTime::anchor)
    }

    fn kind(&self) -> RecordKind {
        RecordKind::ProcedureRequest
    }
}

/// Everything the host holds for one encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EncounterRecords {
    pub encounter_id: String,
    #[serde(default)]
    pub patient_weight_kg: Option<f64>,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub medication_orders: Vec<MedicationOrder>,
    #[serde(default)]
    pub medication_administrations: Vec<MedicationAdministration>,
    #[serde(default)]
    pub procedure_requests: Vec<ProcedureRequest>,
}

impl EncounterRecords {
    pub fn new(encounter_id: impl Into<String>) -> Self {
        Self {
            encounter_id: encounter_id.into(),
            ..Self::default()
        }
    }

    pub fn record_count(&self) -> usize {
        self.observations.len()
            + self.medication_orders.len()
            + self.medication_administrations.len()
            + self.procedure_requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn observation_time_prefers_effective_over_issued() {
        let effective = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        let issued = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let mut obs = Observation {
            id: "obs-1".into(),
            code: "RASS".into(),
            value: Some(ObservationValue::Numeric(-1.0)),
            effective_time: Some(effective),
            issued_time: Some(issued),
        };
        assert_eq!(obs.record_time(), Some(effective));

        obs.effective_time = None;
        assert_eq!(obs.record_time(), Some(issued));
    }

    #[test]
    fn integer_reading_rejects_fractions_and_garbage() {
        assert_eq!(ObservationValue::Text(" -2 ".into()).as_integer(), Some(-2));
        assert_eq!(ObservationValue::Numeric(3.0).as_integer(), Some(3));
        assert_eq!(ObservationValue::Numeric(2.5).as_integer(), None);
        assert_eq!(ObservationValue::Text("calm".into()).as_integer(), None);
        assert_eq!(ObservationValue::Numeric(f64::NAN).as_f64(), None);
    }

    #[test]
    fn procedure_period_anchors_on_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        let scheduled = ScheduledTime::Period {
            start: Some(start),
            end: Some(end),
        };
        assert_eq!(scheduled.anchor(), Some(start));
    }

    #[test]
    fn bundle_deserializes_hl7_style_statuses() {
        let json = r#"{
            "encounter_id": "enc-7",
            "medication_administrations": [{
                "id": "mar-1",
                "drug_identifier": "Enoxaparin 40 mg/0.4 mL SYR",
                "status": "COMPLETED",
                "dose_quantity": 40,
                "dose_unit": "mg",
                "effective_time": "2024-03-10T08:00:00Z",
                "source_order_state": "completedOrder"
            }],
            "procedure_requests": [{
                "id": "pr-1",
                "code": "RASS_GOAL",
                "status": "IN_PROGRESS",
                "scheduled_time": {"start": "2024-03-10T07:00:00Z", "end": null},
                "notes_text": "Goal RASS -1"
            }]
        }"#;

        let records: EncounterRecords = serde_json::from_str(json).expect("bundle parses");
        assert_eq!(records.record_count(), 2);
        assert_eq!(
            records.medication_administrations[0].source_order_state,
            SourceOrderState::CompletedOrder
        );
        assert_eq!(
            records.procedure_requests[0].status,
            ProcedureStatus::InProgress
        );
        assert!(records.procedure_requests[0].record_time().is_some());
    }
}
