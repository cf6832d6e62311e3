//! Indicator results and the aggregate snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ClinicalRecord, RecordKind, TimeWindow};

/// Every indicator the dashboard reads. Serialized keys are snake_case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    RassCurrent,
    RassMin,
    RassMax,
    CpotCurrent,
    CpotMin,
    CpotMax,
    NumericPainCurrent,
    NumericPainMin,
    NumericPainMax,
    VerbalPainCurrent,
    VerbalPainMin,
    VerbalPainMax,
    BehavioralPainCurrent,
    BehavioralPainMin,
    BehavioralPainMax,
    RassGoal,
    PainGoal,
    Mobility,
    VteMechanicalOrdered,
    VtePharmacologicAdministered,
    VtePharmacologicOrdered,
    Anticoagulation,
}

impl Indicator {
    pub const ALL: [Indicator; 22] = [
        Indicator::RassCurrent,
        Indicator::RassMin,
        Indicator::RassMax,
        Indicator::CpotCurrent,
        Indicator::CpotMin,
        Indicator::CpotMax,
        Indicator::NumericPainCurrent,
        Indicator::NumericPainMin,
        Indicator::NumericPainMax,
        Indicator::VerbalPainCurrent,
        Indicator::VerbalPainMin,
        Indicator::VerbalPainMax,
        Indicator::BehavioralPainCurrent,
        Indicator::BehavioralPainMin,
        Indicator::BehavioralPainMax,
        Indicator::RassGoal,
        Indicator::PainGoal,
        Indicator::Mobility,
        Indicator::VteMechanicalOrdered,
        Indicator::VtePharmacologicAdministered,
        Indicator::VtePharmacologicOrdered,
        Indicator::Anticoagulation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::RassCurrent => "rass_current",
            Indicator::RassMin => "rass_min",
            Indicator::RassMax => "rass_max",
            Indicator::CpotCurrent => "cpot_current",
            Indicator::CpotMin => "cpot_min",
            Indicator::CpotMax => "cpot_max",
            Indicator::NumericPainCurrent => "numeric_pain_current",
            Indicator::NumericPainMin => "numeric_pain_min",
            Indicator::NumericPainMax => "numeric_pain_max",
            Indicator::VerbalPainCurrent => "verbal_pain_current",
            Indicator::VerbalPainMin => "verbal_pain_min",
            Indicator::VerbalPainMax => "verbal_pain_max",
            Indicator::BehavioralPainCurrent => "behavioral_pain_current",
            Indicator::BehavioralPainMin => "behavioral_pain_min",
            Indicator::BehavioralPainMax => "behavioral_pain_max",
            Indicator::RassGoal => "rass_goal",
            Indicator::PainGoal => "pain_goal",
            Indicator::Mobility => "mobility",
            Indicator::VteMechanicalOrdered => "vte_mechanical_ordered",
            Indicator::VtePharmacologicAdministered => "vte_pharmacologic_administered",
            Indicator::VtePharmacologicOrdered => "vte_pharmacologic_ordered",
            Indicator::Anticoagulation => "anticoagulation",
        }
    }
}

/// Why a value is deliberately absent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotApplicableReason {
    /// Patient under neuromuscular blockade.
    Paralytic,
    /// Sedation target set for seizure control.
    Seizure,
}

/// Decoded meaning of a reserved raw value (11, 12, 13, -6, 99999999...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpecialValue {
    NotDocumented,
    NotApplicable(NotApplicableReason),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClinicianType {
    #[serde(rename = "RN")]
    Nurse,
    #[serde(rename = "OT")]
    OccupationalTherapist,
    #[serde(rename = "PT")]
    PhysicalTherapist,
}

impl ClinicianType {
    /// Parses the prefix of an encoded mobility value (`RN`, `OT`, `PT`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "RN" => Some(Self::Nurse),
            "OT" => Some(Self::OccupationalTherapist),
            "PT" => Some(Self::PhysicalTherapist),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Nurse => "RN",
            Self::OccupationalTherapist => "OT",
            Self::PhysicalTherapist => "PT",
        }
    }
}

/// Best mobility documented today by one clinician type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MobilityEntry {
    pub clinician: ClinicianType,
    /// Highest level achieved since midnight.
    pub level: i32,
    /// Time of the freshest entry by this clinician type.
    pub recorded_at: DateTime<Utc>,
    pub assist_device: Option<String>,
    pub assist_count: Option<String>,
    pub source: SourceReference,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnticoagulationType {
    Warfarin,
    UnfractionatedHeparin,
    LowMolecularWeightHeparin,
    Fondaparinux,
    DirectOralAnticoagulant,
    DirectThrombinInhibitor,
}

/// Documented payload of an indicator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Measure {
    Score(i32),
    Flag(bool),
    Anticoagulation(AnticoagulationType),
    Mobility(Vec<MobilityEntry>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum IndicatorValue {
    Documented(Measure),
    NotDocumented,
    NotApplicable(NotApplicableReason),
}

impl IndicatorValue {
    pub fn score(value: i32) -> Self {
        Self::Documented(Measure::Score(value))
    }

    pub fn flag(value: bool) -> Self {
        Self::Documented(Measure::Flag(value))
    }

    pub fn is_documented(&self) -> bool {
        matches!(self, Self::Documented(_))
    }
}

impl From<SpecialValue> for IndicatorValue {
    fn from(value: SpecialValue) -> Self {
        match value {
            SpecialValue::NotDocumented => Self::NotDocumented,
            SpecialValue::NotApplicable(reason) => Self::NotApplicable(reason),
        }
    }
}

/// Pointer back to the record an indicator was resolved from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceReference {
    pub kind: RecordKind,
    pub id: String,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorResult {
    pub value: IndicatorValue,
    /// Acquisition time of the selected record.
    pub recorded_at: Option<DateTime<Utc>>,
    /// The instant the engine evaluated at.
    pub calculated_at: DateTime<Utc>,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub source: Option<SourceReference>,
}

impl IndicatorResult {
    pub fn not_documented(calculated_at: DateTime<Utc>) -> Self {
        Self {
            value: IndicatorValue::NotDocumented,
            recorded_at: None,
            calculated_at,
            window_start: None,
            window_end: None,
            source: None,
        }
    }

    pub fn from_record<R>(value: IndicatorValue, record: &R, calculated_at: DateTime<Utc>) -> Self
    where
        R: ClinicalRecord + ?Sized,
    {
        Self {
            value,
            recorded_at: record.record_time(),
            calculated_at,
            window_start: None,
            window_end: None,
            source: Some(record.reference()),
        }
    }

    pub fn within(self, window: &TimeWindow) -> Self {
        Self {
            window_start: Some(window.start()),
            window_end: Some(window.end()),
            ..self
        }
    }

    pub fn score(&self) -> Option<i32> {
        match self.value {
            IndicatorValue::Documented(Measure::Score(score)) => Some(score),
            _ => None,
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match self.value {
            IndicatorValue::Documented(Measure::Flag(flag)) => Some(flag),
            _ => None,
        }
    }

    pub fn anticoagulation(&self) -> Option<AnticoagulationType> {
        match self.value {
            IndicatorValue::Documented(Measure::Anticoagulation(kind)) => Some(kind),
            _ => None,
        }
    }

    pub fn mobility(&self) -> &[MobilityEntry] {
        match &self.value {
            IndicatorValue::Documented(Measure::Mobility(entries)) => entries,
            _ => &[],
        }
    }
}

/// All indicators for one encounter at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateSnapshot {
    pub encounter_id: String,
    pub generated_at: DateTime<Utc>,
    pub indicators: BTreeMap<Indicator, IndicatorResult>,
}

impl AggregateSnapshot {
    pub fn get(&self, indicator: Indicator) -> Option<&IndicatorResult> {
        self.indicators.get(&indicator)
    }

    /// True when every known indicator has an entry.
    pub fn is_complete(&self) -> bool {
        Indicator::ALL
            .iter()
            .all(|indicator| self.indicators.contains_key(indicator))
    }

    pub fn documented_count(&self) -> usize {
        self.indicators
            .values()
            .filter(|result| result.value.is_documented())
            .count()
    }
}
