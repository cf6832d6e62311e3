//! Freshest and extremum reductions over relevance-filtered records.
//!
//! Both reductions are single pass and resolve ties in favour of the item seen
//! first, so results are stable for a given input order.

use chrono::{DateTime, Utc};
use harms_core::ClinicalRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    Min,
    Max,
}

impl Extreme {
    fn prefers(self, candidate: i32, current: i32) -> bool {
        match self {
            Extreme::Min => candidate < current,
            Extreme::Max => candidate > current,
        }
    }
}

/// Record with the latest `record_time`.
pub fn freshest<'a, R, I>(records: I) -> Option<&'a R>
where
    R: ClinicalRecord + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    freshest_by(records, |record| record.record_time())
}

/// Item with the latest time reported by `time_of`; untimed items are ignored.
pub fn freshest_by<T, I, F>(items: I, time_of: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let mut best: Option<(T, DateTime<Utc>)> = None;
    for item in items {
        let Some(at) = time_of(&item) else {
            continue;
        };
        let newer = match &best {
            Some((_, best_at)) => at > *best_at,
            None => true,
        };
        if newer {
            best = Some((item, at));
        }
    }
    best.map(|(item, _)| item)
}

/// Min or max by `value_of`, skipping unparseable values and `sentinels`.
pub fn extremum<T, I, F>(
    items: I,
    extreme: Extreme,
    value_of: F,
    sentinels: &[i32],
) -> Option<(T, i32)>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Option<i32>,
{
    let mut best: Option<(T, i32)> = None;
    for item in items {
        let Some(value) = value_of(&item).filter(|value| !sentinels.contains(value)) else {
            continue;
        };
        let better = match &best {
            Some((_, current)) => extreme.prefers(value, *current),
            None => true,
        };
        if better {
            best = Some((item, value));
        }
    }
    best
}
