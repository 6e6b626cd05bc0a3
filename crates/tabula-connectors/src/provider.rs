//! DataFusion bridge: exposes an adapter's rows as a registered table.

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, SchemaRef, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::NaiveDateTime;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use tabula_core::{Adapter, Bounds, CoreError, FieldKind, FromValue, Order, Row, Schema};
use tracing::info;

use crate::error::AdapterError;

fn arrow_type(kind: FieldKind) -> DataType {
    match kind {
        FieldKind::Integer => DataType::Int64,
        FieldKind::Float => DataType::Float64,
        FieldKind::String => DataType::Utf8,
        FieldKind::Boolean => DataType::Boolean,
        FieldKind::DateTime => DataType::Timestamp(TimeUnit::Microsecond, None),
    }
}

/// Arrow schema with one field per adapter column, in schema order.
pub fn arrow_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<ArrowField> = schema
        .iter()
        .map(|(name, field)| ArrowField::new(name, arrow_type(field.kind), field.nullable))
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

fn typed_column<T: FromValue>(rows: &[Row], i: usize) -> Result<Vec<Option<T>>, CoreError> {
    rows.iter().map(|row| row.values()[i].try_as()).collect()
}

/// Convert rows produced for `schema` into a single record batch.
pub fn rows_to_batch(
    schema: &Schema,
    rows: impl IntoIterator<Item = Row>,
) -> Result<RecordBatch, AdapterError> {
    let rows: Vec<Row> = rows.into_iter().collect();
    if let Some((pos, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.values().len() != schema.len())
    {
        return Err(AdapterError::Engine(format!(
            "row {} (rowid {}) has {} values, schema has {} columns",
            pos,
            row.rowid(),
            row.values().len(),
            schema.len()
        )));
    }
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.len());

    for (i, (_, field)) in schema.iter().enumerate() {
        let array: ArrayRef = match field.kind {
            FieldKind::Integer => Arc::new(Int64Array::from(typed_column::<i64>(&rows, i)?)),
            FieldKind::Float => Arc::new(Float64Array::from(typed_column::<f64>(&rows, i)?)),
            FieldKind::Boolean => Arc::new(BooleanArray::from(typed_column::<bool>(&rows, i)?)),
            FieldKind::String => Arc::new(StringArray::from(typed_column::<String>(&rows, i)?)),
            FieldKind::DateTime => {
                let micros: Vec<Option<i64>> = typed_column::<NaiveDateTime>(&rows, i)?
                    .into_iter()
                    .map(|ts| ts.map(|t| t.and_utc().timestamp_micros()))
                    .collect();
                Arc::new(TimestampMicrosecondArray::from(micros))
            }
        };
        columns.push(array);
    }

    // Needed for schemas with no columns, where the row count cannot be
    // read off the arrays.
    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    Ok(RecordBatch::try_new_with_options(
        arrow_schema(schema),
        columns,
        &options,
    )?)
}

/// Register the rows an adapter returns for `bounds`/`order` as an in-memory
/// table named `alias`. Returns the number of rows registered.
pub async fn register_adapter(
    ctx: &SessionContext,
    alias: &str,
    adapter: &dyn Adapter,
    bounds: &Bounds,
    order: &Order,
) -> Result<usize, AdapterError> {
    let schema = adapter.get_columns();
    let batch = rows_to_batch(schema, adapter.get_data(bounds, order)?)?;
    let row_count = batch.num_rows();
    let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
    ctx.register_table(alias, Arc::new(table))?;
    info!(
        "Registered adapter table '{}' ({} rows, {} columns)",
        alias,
        row_count,
        schema.len()
    );
    Ok(row_count)
}
