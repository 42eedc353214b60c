//! Validated training outcomes and their tabular projection

use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::Value;

use super::schema::{self, EpisodeRecord, GameLog};
use crate::{Error, Result};

/// Name of the episode score column in tabular form.
pub const SCORE_COLUMN: &str = "score";

/// Name of the generation index column in tabular form.
pub const GEN_ID_COLUMN: &str = "gen_id";

/// The validated, immutable collection of episode records for one run.
///
/// Constructed from a raw deserialized payload and validated exactly
/// once at construction (see [`schema::validate`]); fails fast on any
/// shape mismatch and is never mutated afterwards. Derived tables are
/// always new values.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcomes {
    episodes: Vec<EpisodeRecord>,
}

impl TrainingOutcomes {
    /// Validate a raw deserialized payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaViolation`] on any shape mismatch.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let episodes = schema::validate(raw)?;
        Ok(Self { episodes })
    }

    /// Parse and validate a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not valid JSON, or
    /// [`Error::SchemaViolation`] on any shape mismatch.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    /// The validated episode records, in payload order.
    #[must_use]
    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    /// Total number of episodes played.
    #[must_use]
    pub fn num_episodes(&self) -> usize {
        self.episodes.len()
    }

    /// Number of distinct generation indices in the run.
    #[must_use]
    pub fn num_generations(&self) -> usize {
        self.episodes
            .iter()
            .map(|e| e.gen_id)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Replay log for the first episode of a generation, if the run
    /// was recorded with the logged schema variant.
    #[must_use]
    pub fn game_log_for(&self, gen_id: u64) -> Option<&GameLog> {
        self.episodes
            .iter()
            .find(|e| e.gen_id == gen_id)
            .and_then(|e| e.game_log.as_ref())
    }

    /// Project the episodes to their flattened tabular form: columns
    /// `score` (Float64) and `gen_id` (Int64) only. `game_log`, when
    /// present, is dropped: it is retained solely for replay and is
    /// never consumed by aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a `gen_id` exceeds the Int64
    /// column range, or [`Error::Arrow`] if batch construction fails.
    pub fn to_batch(&self) -> Result<RecordBatch> {
        let scores = Float64Array::from_iter_values(self.episodes.iter().map(|e| e.score));
        let mut gen_ids = Vec::with_capacity(self.episodes.len());
        for e in &self.episodes {
            let gen_id = i64::try_from(e.gen_id).map_err(|_| {
                Error::InvalidInput(format!("gen_id {} exceeds the Int64 column range", e.gen_id))
            })?;
            gen_ids.push(gen_id);
        }
        let schema = Schema::new(vec![
            Field::new(SCORE_COLUMN, DataType::Float64, false),
            Field::new(GEN_ID_COLUMN, DataType::Int64, false),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(scores),
                Arc::new(Int64Array::from(gen_ids)),
            ],
        )?;
        Ok(batch)
    }
}
