//! Sweep orchestration
//!
//! A sweep runs the same pipeline across a list of configurations
//! varying exactly one hyperparameter, then merges the flattened
//! per-run tables into one comparison table with a label column
//! identifying the varied value. Execution is sequential: each sweep
//! point is an independent value, resolved through the cache one at a
//! time, with no shared mutable state between iterations.

use std::sync::Arc;

use arrow::array::StringArray;
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::cache::RunCache;
use crate::config::{ParamValue, RunConfig, SweepParam};
use crate::trainer::Trainer;
use crate::{Error, Result};

/// One hyperparameter sweep: a base config template, the varied
/// parameter, and the ordered values it takes.
#[derive(Debug, Clone)]
pub struct Sweep {
    base: RunConfig,
    param: SweepParam,
    values: Vec<ParamValue>,
}

impl Sweep {
    /// Define a sweep of `param` over `values` against `base`.
    #[must_use]
    pub fn new(base: RunConfig, param: SweepParam, values: Vec<ParamValue>) -> Self {
        Self {
            base,
            param,
            values,
        }
    }

    /// The varied parameter, which is also the label column name of
    /// the merged table.
    #[must_use]
    pub const fn param(&self) -> SweepParam {
        self.param
    }

    /// Resolve every sweep point through the cache and merge the
    /// flattened tables.
    ///
    /// Each per-value table gains a Utf8 label column named after the
    /// varied parameter, holding the value's textual representation
    /// once per episode row. The merged table is suitable as direct
    /// input to [`quantiles_by_group`] grouped by the label column.
    ///
    /// # Errors
    ///
    /// Propagates any cache, trainer, or validation failure of an
    /// individual sweep point (the sweep aborts rather than skipping
    /// a failed configuration), [`Error::InvalidInput`] for a
    /// type-mismatched value or empty value list, and
    /// [`Error::InconsistentSweepSchema`] if the per-run tables
    /// disagree on columns.
    ///
    /// [`quantiles_by_group`]: crate::aggregate::quantiles_by_group
    pub fn run<T: Trainer>(
        &self,
        cache: &RunCache<T>,
        force_retrain: bool,
    ) -> Result<RecordBatch> {
        let mut tables = Vec::with_capacity(self.values.len());
        for value in &self.values {
            let config = self.base.with_param(self.param, *value)?;
            info!(param = %self.param, %value, "resolving sweep point");
            let outcomes = cache.resolve(&config, force_retrain)?;
            let flat = outcomes.to_batch()?;
            tables.push(with_label(&flat, self.param.as_str(), &value.to_string())?);
        }
        merge(&tables)
    }
}

/// Concatenate per-run tables row-wise.
///
/// Column sets must match across all tables; a mismatch refuses the
/// merge rather than silently padding or dropping columns.
///
/// # Errors
///
/// Returns [`Error::InconsistentSweepSchema`] on a column-set
/// mismatch, or [`Error::InvalidInput`] for an empty table list.
pub fn merge(tables: &[RecordBatch]) -> Result<RecordBatch> {
    let first = tables
        .first()
        .ok_or_else(|| Error::InvalidInput("cannot merge zero tables".to_string()))?;
    let schema = first.schema();
    for table in &tables[1..] {
        if table.schema() != schema {
            return Err(Error::InconsistentSweepSchema {
                expected: column_set(&schema),
                found: column_set(&table.schema()),
            });
        }
    }
    Ok(concat_batches(&schema, tables)?)
}

fn column_set(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|field| field.name().as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn with_label(batch: &RecordBatch, name: &str, text: &str) -> Result<RecordBatch> {
    let mut fields: Vec<FieldRef> = batch.schema().fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(name, DataType::Utf8, false)));
    let mut columns = batch.columns().to_vec();
    columns.push(Arc::new(StringArray::from(vec![text; batch.num_rows()])));
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array};
    use crate::outcome::{GEN_ID_COLUMN, SCORE_COLUMN};

    fn flat_batch(scores: &[f64]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new(SCORE_COLUMN, DataType::Float64, false),
            Field::new(GEN_ID_COLUMN, DataType::Int64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(scores.to_vec())),
                Arc::new(Int64Array::from(vec![0; scores.len()])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_with_label_appends_utf8_column() {
        let labeled = with_label(&flat_batch(&[1.0, 2.0]), "explore_rate", "0.1").unwrap();
        assert_eq!(labeled.num_columns(), 3);
        let labels = labeled
            .column_by_name("explore_rate")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(labels.value(0), "0.1");
        assert_eq!(labels.value(1), "0.1");
    }

    #[test]
    fn test_merge_concatenates_rows() {
        let merged = merge(&[flat_batch(&[1.0]), flat_batch(&[2.0, 3.0])]).unwrap();
        assert_eq!(merged.num_rows(), 3);
    }

    #[test]
    fn test_merge_refuses_extra_column() {
        let plain = flat_batch(&[1.0]);
        let labeled = with_label(&flat_batch(&[2.0]), "explore_rate", "0.5").unwrap();
        let err = merge(&[plain, labeled]).unwrap_err();
        match err {
            Error::InconsistentSweepSchema { expected, found } => {
                assert!(!expected.contains("explore_rate"));
                assert!(found.contains("explore_rate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merge_rejects_empty_list() {
        assert!(matches!(merge(&[]), Err(Error::InvalidInput(_))));
    }
}
