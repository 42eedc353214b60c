//! Outcome aggregation transforms
//!
//! Three independent, pure transforms over a run's tabular form:
//! flattening (see [`TrainingOutcomes::to_batch`]), a trailing rolling
//! mean, and per-group quantile extraction. No hidden state: every
//! transform is safe to recompute and composable with the others from
//! the same flattened table.
//!
//! ## Quantile definition
//!
//! Linear interpolation between order statistics: for level `q` over
//! `n` ascending values, position `q·(n−1)`, interpolated between the
//! adjacent ranks. For generation scores `[10, 20, 30, 40]` the 0.5
//! quantile is `25.0` and the 1.0 quantile is `40.0`.
//!
//! [`TrainingOutcomes::to_batch`]: crate::outcome::TrainingOutcomes::to_batch

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::{Error, Result};

/// The fixed quantile levels used for per-generation score bands.
pub const DEFAULT_QUANTILE_LEVELS: [f64; 4] = [0.1, 0.5, 0.9, 1.0];

/// Trailing moving average of a Float64 column.
///
/// Element `i` of the output is the arithmetic mean over the `window`
/// values ending at `i`; indices below `window - 1` are null (the
/// standard trailing moving average, with no leading-edge special
/// case. The output has the same length as the column.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `window` is zero, the column is
/// missing or not Float64, or the column contains nulls.
///
/// # Example
///
/// ```rust
/// use arrow::array::{Array, Float64Array, RecordBatch};
/// use arrow::datatypes::{DataType, Field, Schema};
/// use std::sync::Arc;
/// use sweeplab::aggregate::rolling_mean;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = Arc::new(Schema::new(vec![
///     Field::new("score", DataType::Float64, false),
/// ]));
/// let batch = RecordBatch::try_new(
///     schema,
///     vec![Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]))],
/// )?;
///
/// let trend = rolling_mean(&batch, "score", 3)?;
/// assert!(trend.is_null(0) && trend.is_null(1));
/// assert_eq!(trend.value(2), 2.0);
/// assert_eq!(trend.value(4), 4.0);
/// # Ok(())
/// # }
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn rolling_mean(batch: &RecordBatch, column: &str, window: usize) -> Result<Float64Array> {
    if window == 0 {
        return Err(Error::InvalidInput("window size must be positive".to_string()));
    }
    let values = numeric_column(batch, column)?;

    let mut out: Vec<Option<f64>> = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values.value(i);
        if i >= window {
            sum -= values.value(i - window);
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    Ok(Float64Array::from(out))
}

/// Per-group quantile table.
///
/// Partitions rows by `group_column` (Int64 generation index or Utf8
/// sweep label), computes the quantile of `value_column` within each
/// partition at every level, and pivots the result into one row per
/// group with one Float64 column per level, named `p{100·q} <value>`
/// (`p50 score` for level 0.5 over a `score` column). Groups appear
/// in first-appearance order, which is ascending generation order for
/// validated outcome tables and sweep order for merged sweep tables.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `levels` is empty or contains a
/// level outside `(0, 1]`, if either column is missing, if
/// `group_column` is not Int64 or Utf8, or if `value_column` is not
/// Float64 or contains nulls.
pub fn quantiles_by_group(
    batch: &RecordBatch,
    group_column: &str,
    value_column: &str,
    levels: &[f64],
) -> Result<RecordBatch> {
    if levels.is_empty() {
        return Err(Error::InvalidInput("quantile level list is empty".to_string()));
    }
    for &q in levels {
        if !(q > 0.0 && q <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "quantile level {q} is outside (0, 1]"
            )));
        }
    }

    let values = numeric_column(batch, value_column)?;
    let group = batch
        .column_by_name(group_column)
        .ok_or_else(|| Error::InvalidInput(format!("no column named `{group_column}`")))?;

    let keys = match group.data_type() {
        DataType::Int64 => {
            let ids = group.as_any().downcast_ref::<Int64Array>().ok_or_else(|| {
                Error::InvalidInput(format!("column `{group_column}` failed Int64 downcast"))
            })?;
            GroupColumn::Int(ids)
        }
        DataType::Utf8 => {
            let labels = group.as_any().downcast_ref::<StringArray>().ok_or_else(|| {
                Error::InvalidInput(format!("column `{group_column}` failed Utf8 downcast"))
            })?;
            GroupColumn::Str(labels)
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "group column `{group_column}` has unsupported type {other}"
            )));
        }
    };

    // Partition values by group key, preserving first appearance.
    let mut order: Vec<GroupKey> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut partitions: Vec<Vec<f64>> = Vec::new();
    for row in 0..batch.num_rows() {
        let key = match &keys {
            GroupColumn::Int(ids) => GroupKey::Int(ids.value(row)),
            GroupColumn::Str(labels) => GroupKey::Str(labels.value(row).to_string()),
        };
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push(values.value(row));
    }

    for partition in &mut partitions {
        partition.sort_by(f64::total_cmp);
    }

    // Pivot: one row per group, one column per level.
    let mut fields = vec![Field::new(
        group_column,
        group.data_type().clone(),
        false,
    )];
    let mut columns: Vec<arrow::array::ArrayRef> = vec![group_key_array(&order, group.data_type())];
    for &q in levels {
        let column: Vec<f64> = partitions
            .iter()
            .map(|partition| quantile_sorted(partition, q))
            .collect();
        fields.push(Field::new(
            quantile_column_name(q, value_column),
            DataType::Float64,
            false,
        ));
        columns.push(Arc::new(Float64Array::from(column)));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Pivoted column name for a quantile level: `p{100·q} <value>`.
#[must_use]
pub fn quantile_column_name(level: f64, value_column: &str) -> String {
    let scaled = level * 100.0;
    if (scaled - scaled.round()).abs() < 1e-9 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = scaled.round() as i64;
        format!("p{whole} {value_column}")
    } else {
        format!("p{scaled} {value_column}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Int(i64),
    Str(String),
}

enum GroupColumn<'a> {
    Int(&'a Int64Array),
    Str(&'a StringArray),
}

fn group_key_array(order: &[GroupKey], data_type: &DataType) -> arrow::array::ArrayRef {
    if matches!(data_type, DataType::Int64) {
        let ids: Vec<i64> = order
            .iter()
            .map(|key| match key {
                GroupKey::Int(id) => *id,
                GroupKey::Str(_) => 0,
            })
            .collect();
        Arc::new(Int64Array::from(ids))
    } else {
        let labels: Vec<&str> = order
            .iter()
            .map(|key| match key {
                GroupKey::Str(label) => label.as_str(),
                GroupKey::Int(_) => "",
            })
            .collect();
        Arc::new(StringArray::from(labels))
    }
}

/// Linear-interpolation quantile over ascending values.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

fn numeric_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| Error::InvalidInput(format!("no column named `{name}`")))?;
    let values = column
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::InvalidInput(format!("column `{name}` is not Float64")))?;
    if values.null_count() != 0 {
        return Err(Error::InvalidInput(format!(
            "column `{name}` contains nulls"
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{GEN_ID_COLUMN, SCORE_COLUMN};

    fn score_batch(scores: &[f64], gen_ids: &[i64]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new(SCORE_COLUMN, DataType::Float64, false),
            Field::new(GEN_ID_COLUMN, DataType::Int64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(scores.to_vec())),
                Arc::new(Int64Array::from(gen_ids.to_vec())),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rolling_mean_reference_vector() {
        let batch = score_batch(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0, 0, 0, 0, 0]);
        let trend = rolling_mean(&batch, SCORE_COLUMN, 3).unwrap();

        assert_eq!(trend.len(), 5);
        assert!(trend.is_null(0));
        assert!(trend.is_null(1));
        assert_eq!(trend.value(2), 2.0);
        assert_eq!(trend.value(3), 3.0);
        assert_eq!(trend.value(4), 4.0);
    }

    #[test]
    fn test_rolling_mean_window_one_is_identity() {
        let batch = score_batch(&[7.0, 9.0], &[0, 0]);
        let trend = rolling_mean(&batch, SCORE_COLUMN, 1).unwrap();
        assert_eq!(trend.value(0), 7.0);
        assert_eq!(trend.value(1), 9.0);
    }

    #[test]
    fn test_rolling_mean_window_longer_than_input_is_all_null() {
        let batch = score_batch(&[1.0, 2.0], &[0, 0]);
        let trend = rolling_mean(&batch, SCORE_COLUMN, 5).unwrap();
        assert_eq!(trend.null_count(), 2);
    }

    #[test]
    fn test_rolling_mean_rejects_zero_window() {
        let batch = score_batch(&[1.0], &[0]);
        let err = rolling_mean(&batch, SCORE_COLUMN, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_quantiles_reference_values() {
        let batch = score_batch(&[10.0, 20.0, 30.0, 40.0], &[0, 0, 0, 0]);
        let table =
            quantiles_by_group(&batch, GEN_ID_COLUMN, SCORE_COLUMN, &[0.5, 1.0]).unwrap();

        assert_eq!(table.num_rows(), 1);
        let p50 = table
            .column_by_name("p50 score")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        let p100 = table
            .column_by_name("p100 score")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(p50.value(0), 25.0);
        assert_eq!(p100.value(0), 40.0);
    }

    #[test]
    fn test_quantiles_one_row_per_generation_in_order() {
        let batch = score_batch(&[1.0, 2.0, 10.0, 20.0, 100.0], &[0, 0, 1, 1, 2]);
        let table = quantiles_by_group(
            &batch,
            GEN_ID_COLUMN,
            SCORE_COLUMN,
            &DEFAULT_QUANTILE_LEVELS,
        )
        .unwrap();

        assert_eq!(table.num_rows(), 3);
        // gen_id column + one column per level
        assert_eq!(table.num_columns(), 1 + DEFAULT_QUANTILE_LEVELS.len());
        let gens = table
            .column_by_name(GEN_ID_COLUMN)
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(gens.value(0), 0);
        assert_eq!(gens.value(1), 1);
        assert_eq!(gens.value(2), 2);
    }

    #[test]
    fn test_quantiles_group_by_label_column() {
        let schema = Schema::new(vec![
            Field::new(SCORE_COLUMN, DataType::Float64, false),
            Field::new("explore_rate", DataType::Utf8, false),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(vec![1.0, 3.0, 10.0, 30.0])),
                Arc::new(StringArray::from(vec!["0.1", "0.1", "0.5", "0.5"])),
            ],
        )
        .unwrap();

        let table =
            quantiles_by_group(&batch, "explore_rate", SCORE_COLUMN, &[0.5]).unwrap();
        assert_eq!(table.num_rows(), 2);
        let labels = table
            .column_by_name("explore_rate")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(labels.value(0), "0.1");
        assert_eq!(labels.value(1), "0.5");
        let p50 = table
            .column_by_name("p50 score")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(p50.value(0), 2.0);
        assert_eq!(p50.value(1), 20.0);
    }

    #[test]
    fn test_quantiles_reject_bad_levels() {
        let batch = score_batch(&[1.0], &[0]);
        assert!(quantiles_by_group(&batch, GEN_ID_COLUMN, SCORE_COLUMN, &[]).is_err());
        assert!(quantiles_by_group(&batch, GEN_ID_COLUMN, SCORE_COLUMN, &[0.0]).is_err());
        assert!(quantiles_by_group(&batch, GEN_ID_COLUMN, SCORE_COLUMN, &[1.5]).is_err());
    }

    #[test]
    fn test_quantile_column_names() {
        assert_eq!(quantile_column_name(0.1, "score"), "p10 score");
        assert_eq!(quantile_column_name(0.5, "score"), "p50 score");
        assert_eq!(quantile_column_name(0.9, "score"), "p90 score");
        assert_eq!(quantile_column_name(1.0, "score"), "p100 score");
        assert_eq!(quantile_column_name(0.25, "score"), "p25 score");
    }

    #[test]
    fn test_single_value_group() {
        let batch = score_batch(&[42.0], &[0]);
        let table =
            quantiles_by_group(&batch, GEN_ID_COLUMN, SCORE_COLUMN, &[0.1, 1.0]).unwrap();
        let p10 = table
            .column_by_name("p10 score")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(p10.value(0), 42.0);
    }
}
