//! Parquet tables of summary vectors.
//!
//! One optional temporal column (the first Timestamp/Date column) gives the
//! time axis; every numeric column becomes a series. Units travel in the
//! field metadata under `unit`.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ::parquet::arrow::ArrowWriter;
use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, TimestampSecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use log::{info, warn};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::series::{ImportReport, NamedSeries};
use crate::tabular::report;

const TIME_COLUMN: &str = "DATE";
const UNIT_KEY: &str = "unit";
const BATCH_SIZE: usize = 2048;

pub fn import_parquet(path: impl AsRef<Path>) -> ImportReport {
    let path = path.as_ref();
    info!("importing parquet {}", path.display());
    report(read_parquet(path))
}

fn is_temporal(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64)
}

fn downcast<'a, T: Array + 'static>(array: &'a ArrayRef, name: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("column {name} has unexpected type"))
}

fn read_parquet(path: &Path) -> Result<ImportReport> {
    let file = File::open(path).with_context(|| format!("open parquet {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::clone(builder.schema());
    let reader = builder.with_batch_size(BATCH_SIZE).build()?;

    let time_col = schema.fields().iter().position(|f| is_temporal(f.data_type()));
    let numeric: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.data_type().is_numeric())
        .map(|(i, _)| i)
        .collect();
    if numeric.is_empty() {
        bail!("parquet file has no numeric columns");
    }

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); numeric.len()];
    let mut times = Vec::new();
    let mut skipped = 0usize;
    for batch in reader {
        let batch = batch?;
        let time_values = match time_col {
            Some(col) => {
                let name = schema.field(col).name();
                let array = cast(batch.column(col), &DataType::Timestamp(TimeUnit::Second, None))?;
                let array = downcast::<TimestampSecondArray>(&array, name)?;
                Some((0..array.len()).map(|i| (!array.is_null(i)).then(|| array.value(i))).collect::<Vec<_>>())
            }
            None => None,
        };
        let columns = numeric
            .iter()
            .map(|col| cast(batch.column(*col), &DataType::Float64))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            if let Some(time_values) = &time_values {
                let time = time_values[row].and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok());
                match time {
                    Some(t) => times.push(PrimitiveDateTime::new(t.date(), t.time())),
                    None => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            for (slot, (array, col)) in columns.iter().zip(&numeric).enumerate() {
                let array = downcast::<Float64Array>(array, schema.field(*col).name())?;
                let value = if array.is_null(row) { f64::NAN } else { array.value(row) };
                values[slot].push(value);
            }
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {skipped} rows without a valid time", path.display());
    }

    let series = numeric
        .iter()
        .zip(values)
        .map(|(col, values)| {
            let field = schema.field(*col);
            let mut series = NamedSeries::new(field.name().clone(), values).with_timestamps(times.clone());
            if let Some(unit) = field.metadata().get(UNIT_KEY) {
                series = series.with_unit(unit.clone());
            }
            series
        })
        .collect();
    Ok(ImportReport::ok(series, skipped))
}

/// Write series sharing one time axis to a parquet file. Returns the number
/// of rows written.
pub fn export_parquet(path: impl AsRef<Path>, series: &[NamedSeries]) -> Result<usize> {
    let Some(first) = series.first() else {
        bail!("nothing to export");
    };
    let rows = first.len();
    if let Some(odd) = series.iter().find(|s| s.len() != rows) {
        bail!("series {} has {} values, expected {rows}", odd.name, odd.len());
    }
    let with_time = !first.timestamps.is_empty();
    if with_time && series.iter().any(|s| s.timestamps != first.timestamps) {
        bail!("series do not share a time axis");
    }

    let mut fields = Vec::with_capacity(series.len() + 1);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(series.len() + 1);
    if with_time {
        fields.push(Field::new(TIME_COLUMN, DataType::Timestamp(TimeUnit::Second, None), false));
        let secs: Vec<i64> = first.timestamps.iter().map(|t| t.assume_utc().unix_timestamp()).collect();
        columns.push(Arc::new(TimestampSecondArray::from(secs)));
    }
    for s in series {
        let mut field = Field::new(s.name.as_str(), DataType::Float64, true);
        if let Some(unit) = &s.unit {
            field = field.with_metadata(HashMap::from([(UNIT_KEY.to_string(), unit.clone())]));
        }
        fields.push(field);
        columns.push(Arc::new(Float64Array::from(s.values.clone())));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns)?;
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("create parquet {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    info!("exported {} series x {rows} rows to {}", series.len(), path.display());
    Ok(rows)
}
