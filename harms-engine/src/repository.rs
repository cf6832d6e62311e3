//! Record source seam. The engine reads through [`ClinicalRepository`] and never
//! talks to a store directly.

use std::collections::HashMap;

use harms_core::{
    EncounterRecords, MedicationAdministration, MedicationOrder, Observation, ProcedureRequest,
    RepositoryError, TimeWindow,
};

use crate::filter::is_relevant;

/// Read-only access to one encounter's clinical records.
pub trait ClinicalRepository {
    /// Observations with `code` whose record time falls in `window`.
    fn observations(
        &self,
        encounter_id: &str,
        code: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Observation>, RepositoryError>;

    /// Orders whose drug identifier passes `drug_filter`.
    fn medication_orders(
        &self,
        encounter_id: &str,
        drug_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<MedicationOrder>, RepositoryError>;

    fn medication_administrations(
        &self,
        encounter_id: &str,
        drug_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<MedicationAdministration>, RepositoryError>;

    fn procedure_requests(
        &self,
        encounter_id: &str,
        code: &str,
    ) -> Result<Vec<ProcedureRequest>, RepositoryError>;

    fn patient_weight(&self, encounter_id: &str) -> Result<Option<f64>, RepositoryError>;
}

impl<T: ClinicalRepository + ?Sized> ClinicalRepository for &T {
    fn observations(
        &self,
        encounter_id: &str,
        code: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Observation>, RepositoryError> {
        (**self).observations(encounter_id, code, window)
    }

    fn medication_orders(
        &self,
        encounter_id: &str,
        drug_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<MedicationOrder>, RepositoryError> {
        (**self).medication_orders(encounter_id, drug_filter)
    }

    fn medication_administrations(
        &self,
        encounter_id: &str,
        drug_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<MedicationAdministration>, RepositoryError> {
        (**self).medication_administrations(encounter_id, drug_filter)
    }

    fn procedure_requests(
        &self,
        encounter_id: &str,
        code: &str,
    ) -> Result<Vec<ProcedureRequest>, RepositoryError> {
        (**self).procedure_requests(encounter_id, code)
    }

    fn patient_weight(&self, encounter_id: &str) -> Result<Option<f64>, RepositoryError> {
        (**self).patient_weight(encounter_id)
    }
}

/// Repository over record bundles held in memory, keyed by encounter id.
///
/// Results keep bundle order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    encounters: HashMap<String, EncounterRecords>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an encounter bundle, returning the replaced one.
    pub fn insert(&mut self, records: EncounterRecords) -> Option<EncounterRecords> {
        self.encounters.insert(records.encounter_id.clone(), records)
    }

    pub fn len(&self) -> usize {
        self.encounters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }

    fn encounter(&self, encounter_id: &str) -> Result<&EncounterRecords, RepositoryError> {
        self.encounters
            .get(encounter_id)
            .ok_or_else(|| RepositoryError::EncounterNotFound(encounter_id.to_string()))
    }
}

impl FromIterator<EncounterRecords> for InMemoryRepository {
    fn from_iter<I: IntoIterator<Item = EncounterRecords>>(iter: I) -> Self {
        let mut repository = Self::new();
        for records in iter {
            repository.insert(records);
        }
        repository
    }
}

impl ClinicalRepository for InMemoryRepository {
    fn observations(
        &self,
        encounter_id: &str,
        code: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Observation>, RepositoryError> {
        Ok(self
            .encounter(encounter_id)?
            .observations
            .iter()
            .filter(|observation| is_relevant(*observation, code, window))
            .cloned()
            .collect())
    }

    fn medication_orders(
        &self,
        encounter_id: &str,
        drug_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<MedicationOrder>, RepositoryError> {
        Ok(self
            .encounter(encounter_id)?
            .medication_orders
            .iter()
            .filter(|order| drug_filter(&order.drug_identifier))
            .cloned()
            .collect())
    }

    fn medication_administrations(
        &self,
        encounter_id: &str,
        drug_filter: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<MedicationAdministration>, RepositoryError> {
        Ok(self
            .encounter(encounter_id)?
            .medication_administrations
            .iter()
            .filter(|administration| drug_filter(&administration.drug_identifier))
            .cloned()
            .collect())
    }

    fn procedure_requests(
        &self,
        encounter_id: &str,
        code: &str,
    ) -> Result<Vec<ProcedureRequest>, RepositoryError> {
        Ok(self
            .encounter(encounter_id)?
            .procedure_requests
            .iter()
            .filter(|request| request.code == code)
            .cloned()
            .collect())
    }

    fn patient_weight(&self, encounter_id: &str) -> Result<Option<f64>, RepositoryError> {
        Ok(self.encounter(encounter_id)?.patient_weight_kg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use harms_core::{AdministrationStatus, ObservationValue, SourceOrderState};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    fn bundle() -> EncounterRecords {
        let mut records = EncounterRecords::new("enc-1");
        records.patient_weight_kg = Some(72.5);
        records.observations = [(1, "RASS"), (5, "RASS"), (9, "RASS"), (5, "CPOT")]
            .into_iter()
            .map(|(hour, code)| Observation {
                id: format!("{code}-{hour}"),
                code: code.into(),
                value: Some(ObservationValue::Numeric(0.0)),
                effective_time: Some(at(hour)),
                issued_time: None,
            })
            .collect();
        records.medication_administrations = ["Enoxaparin 40 mg", "Acetaminophen 650 mg"]
            .into_iter()
            .map(|drug| MedicationAdministration {
                id: drug.into(),
                drug_identifier: drug.into(),
                status: AdministrationStatus::Completed,
                dose_quantity: None,
                dose_unit: None,
                effective_time: Some(at(6)),
                source_order_state: SourceOrderState::ActiveOrder,
            })
            .collect();
        records
    }

    #[test]
    fn unknown_encounter_is_an_error() {
        let repository = InMemoryRepository::new();
        let err = repository.patient_weight("missing").unwrap_err();
        assert!(matches!(err, RepositoryError::EncounterNotFound(id) if id == "missing"));
    }

    #[test]
    fn observations_by_code_and_window() {
        let repository: InMemoryRepository = [bundle()].into_iter().collect();
        let window = TimeWindow::new(at(2), at(9)).unwrap();
        let ids: Vec<String> = repository
            .observations("enc-1", "RASS", &window)
            .unwrap()
            .into_iter()
            .map(|observation| observation.id)
            .collect();
        assert_eq!(ids, ["RASS-5"]);
    }

    #[test]
    fn medications_pass_through_the_drug_filter() {
        let mut repository = InMemoryRepository::new();
        assert!(repository.insert(bundle()).is_none());
        let administrations = repository
            .medication_administrations("enc-1", &|drug| drug.to_lowercase().contains("enoxaparin"))
            .unwrap();
        assert_eq!(administrations.len(), 1);
        assert_eq!(repository.patient_weight("enc-1").unwrap(), Some(72.5));
        assert!(repository.medication_orders("enc-1", &|_| true).unwrap().is_empty());
    }

    #[test]
    fn works_through_a_reference() {
        fn weight(repository: impl ClinicalRepository) -> Option<f64> {
            repository.patient_weight("enc-1").unwrap()
        }
        let repository: InMemoryRepository = [bundle()].into_iter().collect();
        assert_eq!(weight(&repository), Some(72.5));
        assert_eq!(repository.len(), 1);
    }
}
