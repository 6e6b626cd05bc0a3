//! Ordered column name → field mapping exposed by an adapter.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::field::{Field, TypeMap};
use crate::table::Table;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, Field)>,
}

impl Schema {
    pub fn new(fields: Vec<(String, Field)>) -> Self {
        Self { fields }
    }

    /// Derive the public schema of `table`, keeping table column order.
    ///
    /// Returns the schema and the names of columns whose kind `type_map`
    /// does not recognize.
    pub fn derive(table: &Table, type_map: &TypeMap) -> (Self, Vec<String>) {
        let mut fields = Vec::new();
        let mut excluded = Vec::new();
        for column in table.columns() {
            match type_map.map_kind(column.kind(), column.has_nulls()) {
                Some(field) => fields.push((column.name().to_string(), field)),
                None => excluded.push(column.name().to_string()),
            }
        }
        (Self { fields }, excluded)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, field)?;
        }
        map.end()
    }
}
