//! Training outcome schema, validation, and the validated collection
//!
//! ## Schema Overview
//!
//! ```text
//! TrainingOutcomes (1) ──< EpisodeRecord (N)
//!                               │
//!                               └── GameLog (0..1) [replay only]
//! ```
//!
//! A result payload is validated exactly once, at load time, into a
//! [`TrainingOutcomes`] collection. Everything downstream (aggregation,
//! sweeps) works on the typed records or their tabular projection,
//! never on raw payload fields.

mod outcomes;
mod schema;

pub use outcomes::{TrainingOutcomes, GEN_ID_COLUMN, SCORE_COLUMN};
pub use schema::{validate, EpisodeRecord, GameLog, Move, GAMES_PLAYED_KEY};
