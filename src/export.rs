//! Parquet export for aggregated tables
//!
//! The core hands plain tables to an external rendering layer and
//! defines no display format; these helpers persist a table as a
//! Parquet file for that hand-off and read one back.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::Result;

/// Write one table to a Parquet file.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be
/// created, or [`Error::Parquet`](crate::Error::Parquet) on a write
/// failure.
pub fn write_parquet<P: AsRef<Path>>(batch: &RecordBatch, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read a table back from a Parquet file, concatenating all row
/// groups into one batch.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be
/// opened, or [`Error::Parquet`](crate::Error::Parquet) /
/// [`Error::Arrow`](crate::Error::Arrow) if it cannot be parsed.
pub fn read_parquet<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let file = File::open(path.as_ref())?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}
