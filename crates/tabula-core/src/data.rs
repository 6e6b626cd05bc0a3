//! Filter- and order-aware row iteration over an in-memory table.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;
use crate::filter::{Bounds, Filter};
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{FromValue, Value};

/// Sort direction requested for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedOrder {
    Ascending,
    Descending,
}

impl FromStr for RequestedOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(RequestedOrder::Ascending),
            "desc" | "descending" => Ok(RequestedOrder::Descending),
            other => Err(CoreError::InvalidOrder(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RequestedOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedOrder::Ascending => write!(f, "ASC"),
            RequestedOrder::Descending => write!(f, "DESC"),
        }
    }
}

/// Sort keys in precedence order.
pub type Order = [(String, RequestedOrder)];

/// One result row: its position in the source table plus the values of the
/// schema columns, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    rowid: usize,
    names: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn rowid(&self) -> usize {
        self.rowid
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == column)
            .map(|i| &self.values[i])
    }

    /// Typed read of one column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T, CoreError> {
        self.get(column)
            .ok_or_else(|| CoreError::UnknownColumn(column.to_string()))?
            .try_as()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("rowid", &self.rowid)?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Lazily produced result rows. Single pass; ask the adapter again for a
/// fresh sequence.
pub struct RowIter<'a> {
    table: &'a Table,
    names: Arc<[String]>,
    projection: Vec<usize>,
    positions: Box<dyn Iterator<Item = usize> + Send + 'a>,
}

impl fmt::Debug for RowIter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIter")
            .field("columns", &self.names)
            .field("table_rows", &self.table.num_rows())
            .finish()
    }
}

impl Iterator for RowIter<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let pos = self.positions.next()?;
        Some(Row {
            rowid: pos,
            names: Arc::clone(&self.names),
            values: self
                .projection
                .iter()
                .map(|&col| self.table.cell(pos, col).clone())
                .collect(),
        })
    }
}

fn resolve(table: &Table, column: &str) -> Result<usize, CoreError> {
    table.column_index(column).ok_or_else(|| {
        CoreError::InvalidTable(format!("schema column '{}' missing from table", column))
    })
}

fn directed_cmp(a: &Value, b: &Value, direction: RequestedOrder) -> Ordering {
    if a.is_sortable_null() || b.is_sortable_null() {
        return a.sort_cmp(b);
    }
    match direction {
        RequestedOrder::Ascending => a.sort_cmp(b),
        RequestedOrder::Descending => a.sort_cmp(b).reverse(),
    }
}

/// Rows of `table` restricted to `schema`, passing every filter in `bounds`,
/// sorted by `order`.
///
/// Filters and sort keys are checked against the schema before any row is
/// produced. Without an order, rows are yielded lazily in table order; with
/// one, the matching positions are sorted stably up front. Nulls sort last
/// in either direction.
pub fn get_table_data<'a>(
    table: &'a Table,
    schema: &Schema,
    bounds: &Bounds,
    order: &Order,
) -> Result<RowIter<'a>, CoreError> {
    let mut predicates: Vec<(usize, Filter)> = Vec::with_capacity(bounds.len());
    for (column, filter) in bounds {
        let field = schema
            .get(column)
            .ok_or_else(|| CoreError::UnknownColumn(column.clone()))?;
        filter.validate(column, field)?;
        predicates.push((resolve(table, column)?, filter.clone()));
    }

    let mut sort_keys = Vec::with_capacity(order.len());
    for (column, direction) in order {
        if !schema.contains(column) {
            return Err(CoreError::UnknownColumn(column.clone()));
        }
        sort_keys.push((resolve(table, column)?, *direction));
    }

    let names: Arc<[String]> = schema.names().map(str::to_string).collect();
    let projection = schema
        .names()
        .map(|name| resolve(table, name))
        .collect::<Result<Vec<_>, _>>()?;

    let passes = move |row: &usize| {
        predicates
            .iter()
            .all(|(col, filter)| filter.matches(table.cell(*row, *col)))
    };

    let positions: Box<dyn Iterator<Item = usize> + Send + 'a> = if sort_keys.is_empty() {
        Box::new((0..table.num_rows()).filter(passes))
    } else {
        let mut matched: Vec<usize> = (0..table.num_rows()).filter(passes).collect();
        matched.sort_by(|&a, &b| {
            sort_keys
                .iter()
                .map(|&(col, dir)| directed_cmp(table.cell(a, col), table.cell(b, col), dir))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Box::new(matched.into_iter())
    };

    Ok(RowIter {
        table,
        names,
        projection,
        positions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::TypeMap;
    use crate::table::Column;

    fn fixture() -> (Table, Schema) {
        let table = Table::try_new(vec![
            Column::new(
                "team",
                vec!["red", "blue", "red", "green", "blue"]
                    .into_iter()
                    .map(Value::from)
                    .collect(),
            ),
            Column::new(
                "points",
                vec![
                    Value::Integer(3),
                    Value::Integer(7),
                    Value::Null,
                    Value::Integer(7),
                    Value::Integer(1),
                ],
            ),
            Column::new(
                "notes",
                vec![
                    Value::Integer(1),
                    Value::from("x"),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                ],
            ),
        ])
        .unwrap();
        let (schema, _) = Schema::derive(&table, &TypeMap::STANDARD);
        (table, schema)
    }

    fn ids(iter: RowIter<'_>) -> Vec<usize> {
        iter.map(|r| r.rowid()).collect()
    }

    fn asc(col: &str) -> (String, RequestedOrder) {
        (col.to_string(), RequestedOrder::Ascending)
    }

    fn desc(col: &str) -> (String, RequestedOrder) {
        (col.to_string(), RequestedOrder::Descending)
    }

    #[test]
    fn test_no_filters_no_order_returns_all_in_table_order() {
        let (table, schema) = fixture();
        let rows = get_table_data(&table, &schema, &Bounds::new(), &[]).unwrap();
        assert_eq!(ids(rows), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_rows_only_expose_schema_columns() {
        let (table, schema) = fixture();
        let row = get_table_data(&table, &schema, &Bounds::new(), &[])
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(row.get("team"), Some(&Value::from("red")));
        assert_eq!(row.get("notes"), None);
        assert_eq!(row.try_get::<i64>("points").unwrap(), 3);
        assert!(row.try_get::<String>("points").is_err());
    }

    #[test]
    fn test_conjunctive_filters() {
        let (table, schema) = fixture();
        let mut bounds = Bounds::new();
        bounds.insert("team".into(), Filter::Equal(Value::from("blue")));
        bounds.insert(
            "points".into(),
            Filter::Range {
                start: Some(Value::Integer(5)),
                end: None,
                include_start: true,
                include_end: false,
            },
        );
        let rows = get_table_data(&table, &schema, &bounds, &[]).unwrap();
        assert_eq!(ids(rows), vec![1]);
    }

    #[test]
    fn test_filter_matching_nothing_is_empty() {
        let (table, schema) = fixture();
        let mut bounds = Bounds::new();
        bounds.insert("team".into(), Filter::Equal(Value::from("purple")));
        let rows = get_table_data(&table, &schema, &bounds, &[]).unwrap();
        assert_eq!(rows.count(), 0);
    }

    #[test]
    fn test_order_ascending_is_stable_with_nulls_last() {
        let (table, schema) = fixture();
        let rows = get_table_data(&table, &schema, &Bounds::new(), &[asc("points")]).unwrap();
        assert_eq!(ids(rows), vec![4, 0, 1, 3, 2]);
    }

    #[test]
    fn test_order_descending_is_stable_with_nulls_last() {
        let (table, schema) = fixture();
        let rows = get_table_data(&table, &schema, &Bounds::new(), &[desc("points")]).unwrap();
        assert_eq!(ids(rows), vec![1, 3, 0, 4, 2]);
    }

    #[test]
    fn test_multi_key_order() {
        let (table, schema) = fixture();
        let rows = get_table_data(
            &table,
            &schema,
            &Bounds::new(),
            &[asc("team"), desc("points")],
        )
        .unwrap();
        // blue(7, 1), green(7), red(3, null)
        assert_eq!(ids(rows), vec![1, 4, 3, 0, 2]);
    }

    #[test]
    fn test_unknown_filter_column_fails_fast() {
        let (table, schema) = fixture();
        let mut bounds = Bounds::new();
        bounds.insert("notes".into(), Filter::IsNull);
        let err = get_table_data(&table, &schema, &bounds, &[]).unwrap_err();
        assert_eq!(err, CoreError::UnknownColumn("notes".to_string()));
    }

    #[test]
    fn test_unknown_order_column_fails_fast() {
        let (table, schema) = fixture();
        let err = get_table_data(&table, &schema, &Bounds::new(), &[asc("missing")]).unwrap_err();
        assert_eq!(err, CoreError::UnknownColumn("missing".to_string()));
    }

    #[test]
    fn test_mismatched_filter_value_fails_fast() {
        let (table, schema) = fixture();
        let mut bounds = Bounds::new();
        bounds.insert("points".into(), Filter::Equal(Value::from("seven")));
        let err = get_table_data(&table, &schema, &bounds, &[]).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_repeated_calls_are_equal() {
        let (table, schema) = fixture();
        let order = [desc("points")];
        let first: Vec<Row> = get_table_data(&table, &schema, &Bounds::new(), &order)
            .unwrap()
            .collect();
        let second: Vec<Row> = get_table_data(&table, &schema, &Bounds::new(), &order)
            .unwrap()
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_row_serializes_with_rowid() {
        let (table, schema) = fixture();
        let row = get_table_data(&table, &schema, &Bounds::new(), &[])
            .unwrap()
            .nth(2)
            .unwrap();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["rowid"], 2);
        assert_eq!(json["team"], "red");
        assert!(json["points"].is_null());
    }

    #[test]
    fn test_requested_order_from_str() {
        assert_eq!("ASC".parse::<RequestedOrder>().unwrap(), RequestedOrder::Ascending);
        assert_eq!("desc".parse::<RequestedOrder>().unwrap(), RequestedOrder::Descending);
        assert_eq!(
            "sideways".parse::<RequestedOrder>().unwrap_err(),
            CoreError::InvalidOrder("unknown sort direction 'sideways'".to_string())
        );
    }
}
