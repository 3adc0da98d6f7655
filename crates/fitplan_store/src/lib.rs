//! Local fitness-planning data store.
//!
//! Models workout splits (split → workout → exercise), binds workouts to calendar
//! dates, and tracks date-keyed macro entries, progress photos and coached clients. Every collection
//! is persisted as a single blob through a [`KeyValueStore`](kv::KeyValueStore).

use thiserror::Error;

pub mod calendar;
pub mod config;
pub mod ids;
pub mod kv;
pub mod model;
pub mod persistence;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use calendar::{CalendarIndex, Dated, DayMarker, MarkerPalette, MarkerState};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use model::{
    Client, Exercise, MacroEntry, Macros, NewExercise, ProgressPhoto, SplitRef, Workout,
    WorkoutDay, WorkoutRef, WorkoutSplit,
};
pub use persistence::{CollectionKey, PersistenceAdapter};
pub use store::{PlanningStore, ScheduledWorkout};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlanError {
    /// True for a reference (id or date) that did not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlanError::NotFound(_))
    }

    pub(crate) fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        PlanError::NotFound(format!("{kind} {id}"))
    }
}

/// Result type alias for planning store operations.
pub type PlanResult<T> = Result<T, PlanError>;
