//! Relevance filtering: the only place code and window matching happens.

use harms_core::{ClinicalRecord, TimeWindow};

/// Record time falls inside `window`. Records without a time never do.
pub fn in_window<R>(record: &R, window: &TimeWindow) -> bool
where
    R: ClinicalRecord + ?Sized,
{
    record
        .record_time()
        .is_some_and(|recorded_at| window.contains(recorded_at))
}

/// Exact code match and [`in_window`].
pub fn is_relevant<R>(record: &R, code: &str, window: &TimeWindow) -> bool
where
    R: ClinicalRecord + ?Sized,
{
    record.code() == code && in_window(record, window)
}

/// Records relevant to any of `codes`.
pub fn is_relevant_to_any<R>(record: &R, codes: &[String], window: &TimeWindow) -> bool
where
    R: ClinicalRecord + ?Sized,
{
    codes.iter().any(|code| is_relevant(record, code, window))
}

pub fn relevant<'a, R>(
    records: &'a [R],
    code: &'a str,
    window: TimeWindow,
) -> impl Iterator<Item = &'a R> + 'a
where
    R: ClinicalRecord,
{
    records
        .iter()
        .filter(move |record| is_relevant(*record, code, &window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use harms_core::{Observation, ObservationValue};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    fn obs(id: &str, code: &str, recorded_at: Option<DateTime<Utc>>) -> Observation {
        Observation {
            id: id.into(),
            code: code.into(),
            value: Some(ObservationValue::Numeric(0.0)),
            effective_time: recorded_at,
            issued_time: None,
        }
    }

    #[test]
    fn start_is_included_and_end_is_excluded() {
        let window = TimeWindow::new(at(0), at(12)).unwrap();
        assert!(is_relevant(&obs("a", "RASS", Some(at(0))), "RASS", &window));
        assert!(!is_relevant(&obs("b", "RASS", Some(at(12))), "RASS", &window));
    }

    #[test]
    fn code_mismatch_or_missing_time_is_never_relevant() {
        let window = TimeWindow::new(at(0), at(12)).unwrap();
        assert!(!is_relevant(&obs("a", "CPOT", Some(at(6))), "RASS", &window));
        assert!(!is_relevant(&obs("b", "RASS", None), "RASS", &window));
    }

    #[test]
    fn relevant_keeps_input_order() {
        let window = TimeWindow::new(at(0), at(12)).unwrap();
        let records = vec![
            obs("late", "RASS", Some(at(9))),
            obs("other", "CPOT", Some(at(8))),
            obs("early", "RASS", Some(at(2))),
        ];
        let ids: Vec<&str> = relevant(&records, "RASS", window)
            .map(|record| record.id.as_str())
            .collect();
        assert_eq!(ids, ["late", "early"]);
    }

    #[test]
    fn any_code_match() {
        let window = TimeWindow::new(at(0), at(12)).unwrap();
        let codes = vec!["SCD_PLACE".to_string(), "FOOT_PUMP_PLACE".to_string()];
        assert!(is_relevant_to_any(&obs("a", "FOOT_PUMP_PLACE", Some(at(3))), &codes, &window));
        assert!(!is_relevant_to_any(&obs("b", "SCD_REMOVE", Some(at(3))), &codes, &window));
    }
}
