//! Dose/unit matching of orders and administrations against expected regimens.
//!
//! No unit conversion is performed: a declared unit either equals the rule unit
//! (ignoring case and padding) or the rule fails. Every failure is closed.

use chrono::{DateTime, Duration, Utc};
use harms_core::{
    AnticoagulationType, MedicationAdministration, MedicationOrder, OrderStatus,
    SourceOrderState, TimeWindow,
};
use serde::{Deserialize, Serialize};

use crate::bands::Bands;

/// Absorbs float noise in `weight * ratio` and band edges.
const TOLERANCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DoseAmount {
    /// Expected total dose is `weight_kg * ratio`.
    WeightScaled { ratio: f64 },
    Fixed { value: f64 },
    /// Any quantity is accepted as long as the unit matches.
    AnyQuantity,
}

/// One accepted regimen for a canonical drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoseRule {
    pub drug: String,
    pub unit: String,
    pub amount: DoseAmount,
    /// Fraction of the expected dose, e.g. `0.02` for 2%.
    #[serde(default)]
    pub tolerance: f64,
    /// How long an administration charted against a completed order stays trusted.
    #[serde(default)]
    pub completed_order_cutoff_hours: Option<u32>,
}

impl DoseRule {
    pub fn fixed(drug: &str, value: f64, unit: &str) -> Self {
        Self::with_amount(drug, unit, DoseAmount::Fixed { value })
    }

    pub fn weight_scaled(drug: &str, ratio: f64, unit: &str) -> Self {
        Self::with_amount(drug, unit, DoseAmount::WeightScaled { ratio })
    }

    pub fn any_quantity(drug: &str, unit: &str) -> Self {
        Self::with_amount(drug, unit, DoseAmount::AnyQuantity)
    }

    fn with_amount(drug: &str, unit: &str, amount: DoseAmount) -> Self {
        Self {
            drug: drug.to_string(),
            unit: unit.to_string(),
            amount,
            tolerance: 0.0,
            completed_order_cutoff_hours: None,
        }
    }

    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }

    pub fn with_completed_order_cutoff(self, hours: u32) -> Self {
        Self {
            completed_order_cutoff_hours: Some(hours),
            ..self
        }
    }

    /// Checks a declared dose against this regimen.
    pub fn check(
        &self,
        quantity: Option<f64>,
        unit: Option<&str>,
        weight_kg: Option<f64>,
    ) -> Result<(), DoseMismatch> {
        let unit = unit.ok_or(DoseMismatch::UnitMismatch)?;
        if !unit.trim().eq_ignore_ascii_case(self.unit.trim()) {
            return Err(DoseMismatch::UnitMismatch);
        }

        match self.amount {
            DoseAmount::AnyQuantity => Ok(()),
            DoseAmount::Fixed { value } => {
                let declared = quantity.ok_or(DoseMismatch::MissingDose)?;
                let low = value * (1.0 - self.tolerance) - TOLERANCE_EPSILON;
                let high = value * (1.0 + self.tolerance) + TOLERANCE_EPSILON;
                if (low..=high).contains(&declared) {
                    Ok(())
                } else {
                    Err(DoseMismatch::OutOfTolerance)
                }
            }
            DoseAmount::WeightScaled { ratio } => {
                let weight = weight_kg
                    .filter(|weight| *weight > 0.0)
                    .ok_or(DoseMismatch::MissingWeight)?;
                let declared = quantity.ok_or(DoseMismatch::MissingDose)?;
                let expected = weight * ratio;
                if expected <= 0.0 {
                    return Err(DoseMismatch::OutOfTolerance);
                }
                if (declared - expected).abs() / expected <= self.tolerance + TOLERANCE_EPSILON {
                    Ok(())
                } else {
                    Err(DoseMismatch::OutOfTolerance)
                }
            }
        }
    }
}

impl AsRef<DoseRule> for DoseRule {
    fn as_ref(&self) -> &DoseRule {
        self
    }
}

/// Therapeutic regimen and the class it implies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnticoagulantRule {
    pub regimen: DoseRule,
    pub class: AnticoagulationType,
    /// Counts only while the freshest INR is above the configured threshold.
    #[serde(default)]
    pub inr_gated: bool,
}

impl AnticoagulantRule {
    pub fn new(regimen: DoseRule, class: AnticoagulationType) -> Self {
        Self {
            regimen,
            class,
            inr_gated: false,
        }
    }

    pub fn gated_on_inr(self) -> Self {
        Self {
            inr_gated: true,
            ..self
        }
    }
}

impl AsRef<DoseRule> for AnticoagulantRule {
    fn as_ref(&self) -> &DoseRule {
        &self.regimen
    }
}

/// Why a medication record did not satisfy any regimen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseMismatch {
    NotGiven,
    InactiveOrder,
    UnknownDrug,
    NoRegimen,
    UnitMismatch,
    MissingDose,
    OutOfTolerance,
    MissingWeight,
    StaleCompletedOrder,
}

/// Matches medication records for one encounter at one instant.
#[derive(Debug, Clone, Copy)]
pub struct DoseMatcher<'a> {
    drug_names: &'a Bands<Option<String>>,
    weight_kg: Option<f64>,
    now: DateTime<Utc>,
}

impl<'a> DoseMatcher<'a> {
    pub fn new(
        drug_names: &'a Bands<Option<String>>,
        weight_kg: Option<f64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            drug_names,
            weight_kg,
            now,
        }
    }

    /// Canonical drug key for a free-text identifier such as `"Lovenox 40 mg SYR"`.
    pub fn canonical_drug(&self, identifier: &str) -> Option<&'a str> {
        self.drug_names.classify_text(identifier).as_deref()
    }

    /// First rule the administration satisfies, including the completed-order cutoff.
    pub fn match_administration<'r, T>(
        &self,
        administration: &MedicationAdministration,
        rules: &'r [T],
    ) -> Result<&'r T, DoseMismatch>
    where
        T: AsRef<DoseRule>,
    {
        if !administration.status.is_given() {
            return Err(DoseMismatch::NotGiven);
        }

        self.match_declared(
            &administration.drug_identifier,
            administration.dose_quantity,
            administration.dose_unit.as_deref(),
            rules,
            |rule| self.check_recency(administration, rule),
        )
    }

    /// First rule a still-valid order satisfies.
    ///
    /// Active orders are valid once written; completed or stopped orders only
    /// while their end time falls inside `window`.
    pub fn match_order<'r, T>(
        &self,
        order: &MedicationOrder,
        window: &TimeWindow,
        rules: &'r [T],
    ) -> Result<&'r T, DoseMismatch>
    where
        T: AsRef<DoseRule>,
    {
        if !self.order_is_current(order, window) {
            return Err(DoseMismatch::InactiveOrder);
        }

        self.match_declared(
            &order.drug_identifier,
            order.dose_quantity,
            order.dose_unit.as_deref(),
            rules,
            |_| Ok(()),
        )
    }

    fn match_declared<'r, T, F>(
        &self,
        identifier: &str,
        quantity: Option<f64>,
        unit: Option<&str>,
        rules: &'r [T],
        extra: F,
    ) -> Result<&'r T, DoseMismatch>
    where
        T: AsRef<DoseRule>,
        F: Fn(&DoseRule) -> Result<(), DoseMismatch>,
    {
        let drug = self
            .canonical_drug(identifier)
            .ok_or(DoseMismatch::UnknownDrug)?;

        let mut outcome = Err(DoseMismatch::NoRegimen);
        for rule in rules
            .iter()
            .filter(|rule| rule.as_ref().drug.eq_ignore_ascii_case(drug))
        {
            let regimen = rule.as_ref();
            match regimen
                .check(quantity, unit, self.weight_kg)
                .and_then(|()| extra(regimen))
            {
                Ok(()) => return Ok(rule),
                Err(reason) => outcome = Err(reason),
            }
        }
        outcome
    }

    fn check_recency(
        &self,
        administration: &MedicationAdministration,
        rule: &DoseRule,
    ) -> Result<(), DoseMismatch> {
        if administration.source_order_state != SourceOrderState::CompletedOrder {
            return Ok(());
        }
        let Some(hours) = rule.completed_order_cutoff_hours else {
            return Ok(());
        };
        match administration.effective_time {
            Some(given_at) if self.now - given_at <= Duration::hours(i64::from(hours)) => Ok(()),
            _ => Err(DoseMismatch::StaleCompletedOrder),
        }
    }

    fn order_is_current(&self, order: &MedicationOrder, window: &TimeWindow) -> bool {
        match order.status {
            Some(OrderStatus::Active) => order
                .written_time
                .is_some_and(|written_at| written_at <= self.now),
            Some(OrderStatus::Completed | OrderStatus::Stopped) => order
                .ended_time
                .is_some_and(|ended_at| window.contains(ended_at)),
            _ => false,
        }
    }
}
