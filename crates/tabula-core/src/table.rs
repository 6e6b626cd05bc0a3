//! Immutable in-memory tables produced by a source fetcher.

use std::collections::HashSet;

use crate::error::CoreError;
use crate::field::ColumnKind;
use crate::value::Value;

/// A named column of cells sharing one inferred kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, inferring its kind from the cells. Integer cells of a
    /// column unified to `Float` are widened so every cell matches the kind.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let kind = infer_kind(&values);
        let values = if kind == ColumnKind::Float {
            values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => Value::Float(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Self::with_kind(name, kind, values)
    }

    /// Build a column with an explicit kind, as a fetcher that already
    /// knows its column types would.
    pub fn with_kind(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn has_nulls(&self) -> bool {
        self.values.iter().any(Value::is_null)
    }
}

/// Unify the variants of a column's non-null cells into one kind.
///
/// Integer and float cells unify to `Float`; an all-null column is `Float`,
/// like a column of NaN. Anything else that disagrees is `Mixed`.
pub fn infer_kind(values: &[Value]) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in values {
        let cell = match value {
            Value::Null => continue,
            Value::Integer(_) => ColumnKind::Integer,
            Value::Float(_) => ColumnKind::Float,
            Value::Boolean(_) => ColumnKind::Boolean,
            Value::Timestamp(_) => ColumnKind::Timestamp,
            Value::String(_) => ColumnKind::String,
        };
        kind = Some(match (kind, cell) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Integer), ColumnKind::Float)
            | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
            _ => return ColumnKind::Mixed,
        });
    }
    kind.unwrap_or(ColumnKind::Float)
}

/// An ordered set of uniquely named columns of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Validate and assemble a table.
    pub fn try_new(columns: Vec<Column>) -> Result<Self, CoreError> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(CoreError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.len() != num_rows {
                return Err(CoreError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    num_rows
                )));
            }
        }
        Ok(Self { columns, num_rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Cell at (`row`, `col`) by position.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        &self.columns[col].values[row]
    }
}
