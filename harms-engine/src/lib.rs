//! Resolves ICU harm evidence indicators from an encounter's clinical records.
//!
//! Records come in through a [`ClinicalRepository`] (or directly as
//! [`harms_core::EncounterRecords`]); [`resolve_snapshot`] turns them into an
//! [`harms_core::AggregateSnapshot`] holding every indicator at one instant.

pub mod bands;
pub mod config;
pub mod dose;
pub mod filter;
pub mod repository;
pub mod resolvers;
pub mod scale;
pub mod selection;
pub mod snapshot;
pub mod windows;

pub use bands::{Band, BandInput, BandPredicate, Bands};
pub use config::{DecisionTables, EngineConfig, IndicatorCodes, ScoreScales};
pub use dose::{AnticoagulantRule, DoseAmount, DoseMatcher, DoseMismatch, DoseRule};
pub use repository::{ClinicalRepository, InMemoryRepository};
pub use scale::{ScaleReading, ScoreScale, Sentinel};
pub use selection::Extreme;
pub use snapshot::{resolve_snapshot, SnapshotBuilder};
