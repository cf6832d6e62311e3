use chrono::{DateTime, Utc};

/// Failure reported by a record source (store, query service, cache).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("encounter not found: {0}")]
    EncounterNotFound(String),
    #[error("repository backend failure: {0}")]
    Backend(String),
}

/// Errors surfaced to the hosting pipeline.
///
/// Malformed records and missing data are not errors; they resolve to the
/// indicator default. Only collaborator failures and invalid setup end here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to load records for encounter {encounter_id}: {source}")]
    Repository {
        encounter_id: String,
        #[source]
        source: RepositoryError,
    },
    #[error("invalid time window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
