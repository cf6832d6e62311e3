//! Engine configuration: lookbacks, codes, scales, decision tables and regimens.
//!
//! Every field has a default, so a partial JSON file only overrides what it names.

use harms_core::{AnticoagulationType, EngineError, EngineResult, NotApplicableReason, SpecialValue};
use serde::{Deserialize, Serialize};

use crate::bands::{any_of, BandPredicate, Bands};
use crate::dose::{AnticoagulantRule, DoseAmount, DoseRule};
use crate::scale::ScoreScale;

/// Raw value several charting feeds use for an unset field.
const UNSET: i32 = 99_999_999;

/// Upper bound on any lookback: one century.
const MAX_LOOKBACK_HOURS: u32 = 24 * 366 * 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Lookback for the `*_current` scores, widened to midnight when that is earlier.
    pub current_lookback_hours: u32,
    pub goal_lookback_hours: u32,
    pub vte_window_hours: u32,
    pub anticoagulation_window_hours: u32,
    pub inr_lookback_hours: u32,
    /// INR-gated regimens count only while the freshest INR is above this.
    pub inr_threshold: f64,
    pub codes: IndicatorCodes,
    pub scales: ScoreScales,
    pub tables: DecisionTables,
    pub vte_prophylaxis: Vec<DoseRule>,
    pub anticoagulants: Vec<AnticoagulantRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            current_lookback_hours: 7,
            goal_lookback_hours: 13,
            vte_window_hours: 24,
            anticoagulation_window_hours: 24,
            inr_lookback_hours: 72,
            inr_threshold: 1.5,
            codes: IndicatorCodes::default(),
            scales: ScoreScales::default(),
            tables: DecisionTables::default(),
            vte_prophylaxis: default_vte_prophylaxis(),
            anticoagulants: default_anticoagulants(),
        }
    }
}

impl EngineConfig {
    /// Rejects settings that would make every indicator silently undocumented.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, hours) in [
            ("current_lookback_hours", self.current_lookback_hours),
            ("goal_lookback_hours", self.goal_lookback_hours),
            ("vte_window_hours", self.vte_window_hours),
            ("anticoagulation_window_hours", self.anticoagulation_window_hours),
            ("inr_lookback_hours", self.inr_lookback_hours),
        ] {
            if hours == 0 {
                return Err(invalid(format!("{name} must be greater than zero")));
            }
            if hours > MAX_LOOKBACK_HOURS {
                return Err(invalid(format!(
                    "{name} must be at most {MAX_LOOKBACK_HOURS}, got {hours}"
                )));
            }
        }

        if !self.inr_threshold.is_finite() || self.inr_threshold <= 0.0 {
            return Err(invalid(format!(
                "inr_threshold must be a positive number, got {}",
                self.inr_threshold
            )));
        }

        self.codes.validate()?;
        self.scales.validate()?;

        let anticoagulant_regimens = self.anticoagulants.iter().map(|rule| &rule.regimen);
        for rule in self.vte_prophylaxis.iter().chain(anticoagulant_regimens) {
            validate_rule(rule)?;
        }
        Ok(())
    }
}

fn invalid(message: String) -> EngineError {
    EngineError::InvalidConfig(message)
}

fn validate_rule(rule: &DoseRule) -> EngineResult<()> {
    if rule.drug.trim().is_empty() || rule.unit.trim().is_empty() {
        return Err(invalid(format!(
            "dose rule needs a drug and a unit, got drug={:?} unit={:?}",
            rule.drug, rule.unit
        )));
    }
    if !(0.0..1.0).contains(&rule.tolerance) {
        return Err(invalid(format!(
            "{} tolerance must be in [0, 1), got {}",
            rule.drug, rule.tolerance
        )));
    }
    match rule.amount {
        DoseAmount::WeightScaled { ratio: amount } | DoseAmount::Fixed { value: amount }
            if !amount.is_finite() || amount <= 0.0 =>
        {
            Err(invalid(format!(
                "{} dose must be a positive number, got {amount}",
                rule.drug
            )))
        }
        _ => Ok(()),
    }
}

/// Observation and procedure codes as delivered by the ETL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndicatorCodes {
    pub rass: String,
    pub cpot: String,
    pub numeric_pain: String,
    pub verbal_pain: String,
    pub behavioral_pain: String,
    pub mobility: String,
    pub inr: String,
    pub rass_goal: String,
    pub pain_goal: String,
    pub mechanical_place: Vec<String>,
    pub mechanical_remove: Vec<String>,
}

impl Default for IndicatorCodes {
    fn default() -> Self {
        Self {
            rass: "RASS".into(),
            cpot: "CPOT".into(),
            numeric_pain: "PAIN_NRS".into(),
            verbal_pain: "PAIN_VERBAL".into(),
            behavioral_pain: "PAIN_BPS".into(),
            mobility: "MOBILITY".into(),
            inr: "INR".into(),
            rass_goal: "RASS_GOAL".into(),
            pain_goal: "PAIN_GOAL".into(),
            mechanical_place: vec!["SCD_PLACE".into(), "FOOT_PUMP_PLACE".into()],
            mechanical_remove: vec!["SCD_REMOVE".into(), "FOOT_PUMP_REMOVE".into()],
        }
    }
}

impl IndicatorCodes {
    fn validate(&self) -> EngineResult<()> {
        let singles = [
            &self.rass,
            &self.cpot,
            &self.numeric_pain,
            &self.verbal_pain,
            &self.behavioral_pain,
            &self.mobility,
            &self.inr,
            &self.rass_goal,
            &self.pain_goal,
        ];
        if singles.iter().any(|code| code.trim().is_empty()) {
            return Err(invalid("observation and procedure codes must not be empty".into()));
        }
        if self.mechanical_place.is_empty() {
            return Err(invalid(
                "at least one mechanical prophylaxis place code is required".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoreScales {
    pub rass: ScoreScale,
    pub cpot: ScoreScale,
    pub numeric_pain: ScoreScale,
    pub verbal_pain: ScoreScale,
    pub behavioral_pain: ScoreScale,
    pub mobility: ScoreScale,
    pub pain_goal: ScoreScale,
}

impl Default for ScoreScales {
    fn default() -> Self {
        let not_documented = SpecialValue::NotDocumented;
        Self {
            rass: ScoreScale::new(-5, 4)
                .with_sentinel(11, not_documented)
                .with_sentinel(12, SpecialValue::NotApplicable(NotApplicableReason::Paralytic))
                .with_sentinel(13, SpecialValue::NotApplicable(NotApplicableReason::Seizure))
                .with_sentinel(-6, not_documented),
            cpot: ScoreScale::new(0, 8)
                .with_sentinel(11, not_documented)
                .with_sentinel(UNSET, not_documented),
            numeric_pain: ScoreScale::new(0, 10)
                .with_sentinel(11, not_documented)
                .with_sentinel(UNSET, not_documented),
            verbal_pain: ScoreScale::new(0, 10).with_sentinel(11, not_documented),
            // 11 and 12 are real BPS scores.
            behavioral_pain: ScoreScale::new(3, 12)
                .with_sentinel(-6, not_documented)
                .with_sentinel(UNSET, not_documented),
            mobility: ScoreScale::new(0, 8).with_sentinel(UNSET, not_documented),
            pain_goal: ScoreScale::new(0, 10),
        }
    }
}

impl ScoreScales {
    fn validate(&self) -> EngineResult<()> {
        for (name, scale) in [
            ("rass", &self.rass),
            ("cpot", &self.cpot),
            ("numeric_pain", &self.numeric_pain),
            ("verbal_pain", &self.verbal_pain),
            ("behavioral_pain", &self.behavioral_pain),
            ("mobility", &self.mobility),
            ("pain_goal", &self.pain_goal),
        ] {
            if scale.min > scale.max {
                return Err(invalid(format!(
                    "{name} scale is empty: min {} > max {}",
                    scale.min, scale.max
                )));
            }
        }
        Ok(())
    }
}

/// Text classification tables, checked top to bottom.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecisionTables {
    /// Verbal descriptor to raw score; `None` marks the text as malformed.
    pub verbal_pain: Bands<Option<i32>>,
    /// Goal notes that mean "no numeric target"; `None` falls through to a number.
    pub rass_goal: Bands<Option<SpecialValue>>,
    pub rn_assist_device: Bands<String>,
    pub rn_assist_count: Bands<String>,
    /// Free-text drug identifier to canonical drug key; `None` is excluded.
    pub drug_names: Bands<Option<String>>,
}

impl Default for DecisionTables {
    fn default() -> Self {
        Self {
            verbal_pain: default_verbal_pain(),
            rass_goal: default_rass_goal(),
            rn_assist_device: default_rn_assist_device(),
            rn_assist_count: default_rn_assist_count(),
            drug_names: default_drug_names(),
        }
    }
}

fn default_verbal_pain() -> Bands<Option<i32>> {
    Bands::new(None)
        .with(
            any_of(&["unable", "not assessed", "not documented"]),
            Some(11),
        )
        .with(any_of(&["worst", "unbearable", "excruciating"]), Some(10))
        .with(any_of(&["severe"]), Some(8))
        .with(any_of(&["moderate"]), Some(5))
        .with(any_of(&["mild"]), Some(2))
        .with(any_of(&["no pain", "denies", "none"]), Some(0))
}

fn default_rass_goal() -> Bands<Option<SpecialValue>> {
    Bands::new(None)
        .with(
            any_of(&["paralytic", "paralysis", "neuromuscular block"]),
            Some(SpecialValue::NotApplicable(NotApplicableReason::Paralytic)),
        )
        .with(
            any_of(&["seizure", "burst suppression", "status epilepticus"]),
            Some(SpecialValue::NotApplicable(NotApplicableReason::Seizure)),
        )
}

fn default_rn_assist_device() -> Bands<String> {
    Bands::new("Other".to_string())
        .with(
            any_of(&["sit-to-stand device (powered)", "sit to stand device (powered)"]),
            "Sit-to-stand Device (Powered)".into(),
        )
        .with(any_of(&["sit-to-stand", "sit to stand"]), "Sit-to-stand Device".into())
        .with(any_of(&["ceiling lift"]), "Ceiling Lift".into())
        .with(any_of(&["lift"]), "Lift".into())
        .with(any_of(&["walker"]), "Walker".into())
        .with(any_of(&["cane"]), "Cane".into())
        .with(any_of(&["gait belt"]), "Gait Belt".into())
        .with(any_of(&["no device"]), "None".into())
        .with(BandPredicate::Equals("none".into()), "None".into())
}

fn default_rn_assist_count() -> Bands<String> {
    Bands::new("Not Documented".to_string())
        .with(any_of(&["independent"]), "Independent".into())
        .with(any_of(&["standby", "stand by"]), "Standby".into())
        .with(any_of(&["3 person", "three person", "x3"]), "3+ Person".into())
        .with(any_of(&["2 person", "two person", "x2"]), "2 Person".into())
        .with(any_of(&["1 person", "one person", "x1"]), "1 Person".into())
}

fn default_drug_names() -> Bands<Option<String>> {
    let drug = |name: &str| Some(name.to_string());
    // Flushes and locks carry heparin in the name but are not prophylaxis.
    Bands::new(None)
        .with(any_of(&["heparin flush", "heparin lock", "hep-lock"]), None)
        .with(any_of(&["enoxaparin", "lovenox"]), drug("enoxaparin"))
        .with(any_of(&["dalteparin", "fragmin"]), drug("dalteparin"))
        .with(any_of(&["fondaparinux", "arixtra"]), drug("fondaparinux"))
        .with(any_of(&["heparin"]), drug("heparin"))
        .with(any_of(&["warfarin", "coumadin"]), drug("warfarin"))
        .with(any_of(&["apixaban", "eliquis"]), drug("apixaban"))
        .with(any_of(&["rivaroxaban", "xarelto"]), drug("rivaroxaban"))
        .with(any_of(&["dabigatran", "pradaxa"]), drug("dabigatran"))
        .with(any_of(&["edoxaban", "savaysa"]), drug("edoxaban"))
        .with(any_of(&["argatroban"]), drug("argatroban"))
        .with(any_of(&["bivalirudin", "angiomax"]), drug("bivalirudin"))
}

fn default_vte_prophylaxis() -> Vec<DoseRule> {
    vec![
        DoseRule::fixed("enoxaparin", 40.0, "mg").with_completed_order_cutoff(24),
        DoseRule::fixed("enoxaparin", 30.0, "mg").with_completed_order_cutoff(15),
        DoseRule::weight_scaled("enoxaparin", 0.5, "mg")
            .with_tolerance(0.1)
            .with_completed_order_cutoff(15),
        DoseRule::fixed("heparin", 5000.0, "units").with_completed_order_cutoff(15),
        DoseRule::fixed("heparin", 7500.0, "units").with_completed_order_cutoff(15),
        DoseRule::fixed("dalteparin", 5000.0, "units").with_completed_order_cutoff(24),
        DoseRule::fixed("fondaparinux", 2.5, "mg").with_completed_order_cutoff(24),
    ]
}

fn default_anticoagulants() -> Vec<AnticoagulantRule> {
    use AnticoagulationType::*;

    let rule = |regimen: DoseRule, cutoff: u32, class| {
        AnticoagulantRule::new(regimen.with_completed_order_cutoff(cutoff), class)
    };
    vec![
        rule(
            DoseRule::weight_scaled("enoxaparin", 1.0, "mg").with_tolerance(0.1),
            15,
            LowMolecularWeightHeparin,
        ),
        rule(
            DoseRule::weight_scaled("enoxaparin", 1.5, "mg").with_tolerance(0.1),
            24,
            LowMolecularWeightHeparin,
        ),
        rule(
            DoseRule::any_quantity("heparin", "units/kg/hr"),
            19,
            UnfractionatedHeparin,
        ),
        rule(DoseRule::any_quantity("warfarin", "mg"), 24, Warfarin).gated_on_inr(),
        rule(DoseRule::fixed("apixaban", 5.0, "mg"), 15, DirectOralAnticoagulant),
        rule(DoseRule::fixed("apixaban", 10.0, "mg"), 15, DirectOralAnticoagulant),
        rule(DoseRule::fixed("rivaroxaban", 15.0, "mg"), 24, DirectOralAnticoagulant),
        rule(DoseRule::fixed("rivaroxaban", 20.0, "mg"), 24, DirectOralAnticoagulant),
        rule(DoseRule::fixed("dabigatran", 150.0, "mg"), 15, DirectOralAnticoagulant),
        rule(DoseRule::fixed("edoxaban", 60.0, "mg"), 24, DirectOralAnticoagulant),
        rule(
            DoseRule::any_quantity("argatroban", "mcg/kg/min"),
            19,
            DirectThrombinInhibitor,
        ),
        rule(
            DoseRule::any_quantity("bivalirudin", "mg/kg/hr"),
            19,
            DirectThrombinInhibitor,
        ),
        rule(DoseRule::fixed("fondaparinux", 7.5, "mg"), 24, Fondaparinux),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{"current_lookback_hours": 4, "codes": {"rass": "RASS_SCORE"}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.current_lookback_hours, 4);
        assert_eq!(config.codes.rass, "RASS_SCORE");
        assert_eq!(config.codes.cpot, "CPOT");
        assert_eq!(config.goal_lookback_hours, 13);
        assert_eq!(config.anticoagulants, default_anticoagulants());
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let config = EngineConfig {
            vte_window_hours: 0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vte_window_hours"), "{err}");
    }

    #[test]
    fn century_long_lookback_is_rejected() {
        let config = EngineConfig {
            current_lookback_hours: u32::MAX,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("current_lookback_hours"), "{err}");

        let config = EngineConfig {
            inr_lookback_hours: MAX_LOOKBACK_HOURS,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_rules_are_rejected() {
        let mut config = EngineConfig::default();
        config
            .vte_prophylaxis
            .push(DoseRule::fixed("enoxaparin", 40.0, "mg").with_tolerance(1.5));
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.vte_prophylaxis.push(DoseRule::weight_scaled("enoxaparin", 0.0, "mg"));
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn inverted_scale_is_rejected() {
        let mut config = EngineConfig::default();
        config.scales.cpot = ScoreScale::new(8, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn drug_table_excludes_flushes_and_orders_specific_names_first() {
        let names = default_drug_names();
        assert_eq!(names.classify_text("Heparin Flush 10 units/mL").as_deref(), None);
        assert_eq!(
            names.classify_text("Heparin 5,000 units/mL INJ").as_deref(),
            Some("heparin")
        );
        assert_eq!(
            names.classify_text("LOVENOX 40 MG/0.4 ML SYR").as_deref(),
            Some("enoxaparin")
        );
        assert_eq!(names.classify_text("Aspirin 81 mg").as_deref(), None);
    }

    #[test]
    fn device_table_prefers_specific_rows() {
        let devices = default_rn_assist_device();
        assert_eq!(
            devices.classify_text("Sit-to-stand device (powered)"),
            "Sit-to-stand Device (Powered)"
        );
        assert_eq!(devices.classify_text("sit-to-stand"), "Sit-to-stand Device");
        assert_eq!(devices.classify_text("Ceiling lift, 2 person"), "Ceiling Lift");
        assert_eq!(devices.classify_text("Hoyer lift"), "Lift");
        assert_eq!(devices.classify_text("none"), "None");
        assert_eq!(devices.classify_text("wheelchair"), "Other");
    }

    #[test]
    fn assist_count_table() {
        let counts = default_rn_assist_count();
        assert_eq!(counts.classify_text("Walker; 2 person assist"), "2 Person");
        assert_eq!(counts.classify_text("Three person assist"), "3+ Person");
        assert_eq!(counts.classify_text("stand by assist"), "Standby");
        assert_eq!(counts.classify_text("walker"), "Not Documented");
    }

    #[test]
    fn verbal_pain_table() {
        let table = default_verbal_pain();
        assert_eq!(*table.classify_text("Worst possible pain"), Some(10));
        assert_eq!(*table.classify_text("Mild"), Some(2));
        assert_eq!(*table.classify_text("Patient denies pain"), Some(0));
        assert_eq!(*table.classify_text("Unable to assess"), Some(11));
        assert_eq!(*table.classify_text("grimacing"), None);
    }
}
