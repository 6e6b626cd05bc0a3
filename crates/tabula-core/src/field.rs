//! Column descriptors and the kind → field type map.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a fetched column, as inferred by the source fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    String,
    Timestamp,
    /// Cells of incompatible variants that could not be unified.
    Mixed,
}

/// Public type of a queryable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Float,
    String,
    Boolean,
    DateTime,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Integer => write!(f, "INTEGER"),
            FieldKind::Float => write!(f, "REAL"),
            FieldKind::String => write!(f, "TEXT"),
            FieldKind::Boolean => write!(f, "BOOLEAN"),
            FieldKind::DateTime => write!(f, "TIMESTAMP"),
        }
    }
}

/// Filter shapes a column can accept from the query engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Equal,
    NotEqual,
    Range,
    In,
    Like,
    IsNull,
    IsNotNull,
}

/// Whether the adapter can return a column pre-sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSupport {
    /// The adapter sorts in either direction on request.
    Any,
    /// Rows come back unsorted; the engine must sort.
    None,
}

/// Type descriptor for one column of an adapter's schema.
///
/// Describes data, never owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub kind: FieldKind,
    pub nullable: bool,
    /// Filters the adapter evaluates for this column.
    pub filters: Vec<FilterKind>,
    pub order: OrderSupport,
    /// `true` when filters are applied exactly, so the engine does not re-check.
    pub exact: bool,
}

impl Field {
    /// A field with the filter set every in-memory column supports.
    pub fn new(kind: FieldKind, nullable: bool) -> Self {
        let mut filters = vec![
            FilterKind::Range,
            FilterKind::Equal,
            FilterKind::NotEqual,
            FilterKind::In,
            FilterKind::IsNull,
            FilterKind::IsNotNull,
        ];
        if kind == FieldKind::String {
            filters.push(FilterKind::Like);
        }
        Self {
            kind,
            nullable,
            filters,
            order: OrderSupport::Any,
            exact: true,
        }
    }

    pub fn accepts(&self, filter: FilterKind) -> bool {
        self.filters.contains(&filter)
    }
}

/// Explicit mapping from inferred column kinds to public field kinds.
///
/// Kinds mapped to `None` are left out of an adapter's schema.
#[derive(Debug, Clone, Copy)]
pub struct TypeMap {
    entries: &'static [(ColumnKind, Option<FieldKind>)],
}

impl TypeMap {
    /// The mapping used by the built-in adapters.
    pub const STANDARD: TypeMap = TypeMap {
        entries: &[
            (ColumnKind::Integer, Some(FieldKind::Integer)),
            (ColumnKind::Float, Some(FieldKind::Float)),
            (ColumnKind::Boolean, Some(FieldKind::Boolean)),
            (ColumnKind::String, Some(FieldKind::String)),
            (ColumnKind::Timestamp, Some(FieldKind::DateTime)),
            (ColumnKind::Mixed, None),
        ],
    };

    pub const fn new(entries: &'static [(ColumnKind, Option<FieldKind>)]) -> Self {
        Self { entries }
    }

    /// Field kind for a column kind; `None` when the kind is not recognized.
    pub fn field_kind(&self, kind: ColumnKind) -> Option<FieldKind> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, field)| *field)
    }

    /// Build the public descriptor for a column of `kind`.
    pub fn map_kind(&self, kind: ColumnKind, nullable: bool) -> Option<Field> {
        self.field_kind(kind).map(|fk| Field::new(fk, nullable))
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        TypeMap::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_map_recognized_kinds() {
        let map = TypeMap::STANDARD;
        assert_eq!(map.field_kind(ColumnKind::Integer), Some(FieldKind::Integer));
        assert_eq!(map.field_kind(ColumnKind::Float), Some(FieldKind::Float));
        assert_eq!(map.field_kind(ColumnKind::Boolean), Some(FieldKind::Boolean));
        assert_eq!(map.field_kind(ColumnKind::String), Some(FieldKind::String));
        assert_eq!(map.field_kind(ColumnKind::Timestamp), Some(FieldKind::DateTime));
    }

    #[test]
    fn test_standard_map_drops_mixed() {
        assert!(TypeMap::STANDARD.map_kind(ColumnKind::Mixed, true).is_none());
    }

    #[test]
    fn test_custom_map_can_narrow() {
        static ONLY_INTS: &[(ColumnKind, Option<FieldKind>)] =
            &[(ColumnKind::Integer, Some(FieldKind::Integer))];
        let map = TypeMap::new(ONLY_INTS);
        assert!(map.map_kind(ColumnKind::Integer, false).is_some());
        assert!(map.map_kind(ColumnKind::String, false).is_none());
    }

    #[test]
    fn test_field_filters() {
        let text = Field::new(FieldKind::String, true);
        assert!(text.accepts(FilterKind::Like));
        assert!(text.exact);
        assert_eq!(text.order, OrderSupport::Any);

        let num = Field::new(FieldKind::Float, false);
        assert!(num.accepts(FilterKind::Range));
        assert!(!num.accepts(FilterKind::Like));
    }

    #[test]
    fn test_field_serializes_lowercase_kind() {
        let json = serde_json::to_value(Field::new(FieldKind::DateTime, true)).unwrap();
        assert_eq!(json["kind"], "datetime");
        assert_eq!(json["nullable"], true);
    }
}
