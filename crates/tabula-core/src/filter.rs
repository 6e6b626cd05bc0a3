//! Column predicates pushed down by the query engine.
//!
//! [`Filter`] is the evaluated form, one per column, collected into
//! [`Bounds`]. [`FilterCondition`] is the serialized form accepted from JSON
//! and the CLI; it is coerced to the target column's type before evaluation.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CoreError;
use crate::field::{Field, FieldKind, FilterKind};
use crate::schema::Schema;
use crate::value::{parse_timestamp, Value};

/// Filters keyed by column name. All entries must hold for a row to pass.
pub type Bounds = BTreeMap<String, Filter>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Contradictory constraints; nothing matches.
    Impossible,
    Equal(Value),
    NotEqual(Value),
    Range {
        start: Option<Value>,
        end: Option<Value>,
        include_start: bool,
        include_end: bool,
    },
    In(Vec<Value>),
    /// SQL `LIKE` pattern: `%` matches any run, `_` a single character.
    Like(String),
    IsNull,
    IsNotNull,
}

impl Filter {
    /// The capability this filter needs from a field. `Impossible` needs none.
    pub fn kind(&self) -> Option<FilterKind> {
        match self {
            Filter::Impossible => None,
            Filter::Equal(_) => Some(FilterKind::Equal),
            Filter::NotEqual(_) => Some(FilterKind::NotEqual),
            Filter::Range { .. } => Some(FilterKind::Range),
            Filter::In(_) => Some(FilterKind::In),
            Filter::Like(_) => Some(FilterKind::Like),
            Filter::IsNull => Some(FilterKind::IsNull),
            Filter::IsNotNull => Some(FilterKind::IsNotNull),
        }
    }

    /// Check that `field` accepts this filter and every operand fits its kind.
    pub fn validate(&self, column: &str, field: &Field) -> Result<(), CoreError> {
        if let Some(kind) = self.kind() {
            if !field.accepts(kind) {
                return Err(CoreError::UnsupportedFilter {
                    column: column.to_string(),
                    filter: format!("{:?}", kind),
                });
            }
        }
        let operands: Vec<&Value> = match self {
            Filter::Equal(v) | Filter::NotEqual(v) => vec![v],
            Filter::Range { start, end, .. } => start.iter().chain(end.iter()).collect(),
            Filter::In(values) => values.iter().collect(),
            _ => Vec::new(),
        };
        for value in operands {
            if !value.is_compatible_with(field.kind) {
                return Err(CoreError::TypeMismatch {
                    expected: field.kind.to_string(),
                    found: value.kind_name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate against one cell. Null cells only satisfy `IsNull`.
    pub fn matches(&self, cell: &Value) -> bool {
        if cell.is_null() {
            return matches!(self, Filter::IsNull);
        }
        match self {
            Filter::Impossible | Filter::IsNull => false,
            Filter::IsNotNull => true,
            Filter::Equal(v) => cell.compare(v).is_some_and(|o| o.is_eq()),
            Filter::NotEqual(v) => cell.compare(v).is_some_and(|o| o.is_ne()),
            Filter::In(values) => values
                .iter()
                .any(|v| cell.compare(v).is_some_and(|o| o.is_eq())),
            Filter::Range {
                start,
                end,
                include_start,
                include_end,
            } => {
                let above = match start {
                    None => true,
                    Some(s) => cell
                        .compare(s)
                        .is_some_and(|o| o.is_gt() || (*include_start && o.is_eq())),
                };
                let below = match end {
                    None => true,
                    Some(e) => cell
                        .compare(e)
                        .is_some_and(|o| o.is_lt() || (*include_end && o.is_eq())),
                };
                above && below
            }
            Filter::Like(pattern) => match cell {
                Value::String(s) => like_match(s, pattern),
                _ => false,
            },
        }
    }
}

/// SQL `LIKE` matching without escapes.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((bp, bt)) = backtrack {
            p = bp + 1;
            t = bt + 1;
            backtrack = Some((bp, bt + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

// ---------------------------------------------------------------------------
// Serialized filter conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Option<FilterValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    In,
    Like,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    /// JSON numbers that fit `i64` exactly.
    Integer(i64),
    Number(f64),
    String(String),
    List(Vec<FilterValue>),
}

/// `n` as an `i64` when it is integral and representable, never saturating.
fn exact_integer(n: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (n.is_finite() && n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n)).then_some(n as i64)
}

impl FilterValue {
    fn describe(&self) -> &'static str {
        match self {
            FilterValue::Bool(_) => "boolean",
            FilterValue::Integer(_) | FilterValue::Number(_) => "number",
            FilterValue::String(_) => "string",
            FilterValue::List(_) => "list",
        }
    }

    /// Convert a scalar operand into a value of the column's kind.
    fn coerce(&self, kind: FieldKind) -> Result<Value, CoreError> {
        let mismatch = || CoreError::TypeMismatch {
            expected: kind.to_string(),
            found: self.describe().to_string(),
        };
        match (self, kind) {
            (FilterValue::Integer(i), FieldKind::Integer) => Ok(Value::Integer(*i)),
            (FilterValue::Integer(i), FieldKind::Float) => Ok(Value::Float(*i as f64)),
            (FilterValue::Number(n), FieldKind::Integer) => {
                exact_integer(*n).map(Value::Integer).ok_or_else(mismatch)
            }
            (FilterValue::Number(n), FieldKind::Float) => Ok(Value::Float(*n)),
            (FilterValue::Bool(b), FieldKind::Boolean) => Ok(Value::Boolean(*b)),
            (FilterValue::String(s), FieldKind::String) => Ok(Value::String(s.clone())),
            (FilterValue::String(s), FieldKind::DateTime) => {
                parse_timestamp(s).map(Value::Timestamp).ok_or_else(mismatch)
            }
            (FilterValue::String(s), FieldKind::Boolean) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(mismatch()),
            },
            (FilterValue::String(s), FieldKind::Integer) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(exact_integer))
                    .map(Value::Integer)
                    .ok_or_else(mismatch)
            }
            (FilterValue::String(s), FieldKind::Float) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| mismatch())
            }
            _ => Err(mismatch()),
        }
    }
}

impl FilterCondition {
    fn operand(&self) -> Result<&FilterValue, CoreError> {
        self.value.as_ref().ok_or_else(|| {
            CoreError::InvalidFilter(format!("{:?} on '{}' needs a value", self.op, self.column))
        })
    }

    fn list(&self) -> Result<&[FilterValue], CoreError> {
        match self.operand()? {
            FilterValue::List(items) => Ok(items),
            other => Err(CoreError::InvalidFilter(format!(
                "{:?} on '{}' needs a list, got {}",
                self.op,
                self.column,
                other.describe()
            ))),
        }
    }

    /// Build the evaluated filter for a column described by `field`.
    pub fn to_filter(&self, field: &Field) -> Result<Filter, CoreError> {
        let kind = field.kind;
        let scalar = |cond: &Self| cond.operand().and_then(|v| v.coerce(kind));
        let range = |start: Option<Value>, end: Option<Value>, include_start, include_end| {
            Filter::Range {
                start,
                end,
                include_start,
                include_end,
            }
        };

        let filter = match self.op {
            FilterOp::Eq => Filter::Equal(scalar(self)?),
            FilterOp::Neq => Filter::NotEqual(scalar(self)?),
            FilterOp::Gt => range(Some(scalar(self)?), None, false, false),
            FilterOp::Gte => range(Some(scalar(self)?), None, true, false),
            FilterOp::Lt => range(None, Some(scalar(self)?), false, false),
            FilterOp::Lte => range(None, Some(scalar(self)?), false, true),
            FilterOp::Between => match self.list()? {
                [from, to] => {
                    let (from, to) = (from.coerce(kind)?, to.coerce(kind)?);
                    if from.compare(&to).is_some_and(|o| o.is_gt()) {
                        Filter::Impossible
                    } else {
                        range(Some(from), Some(to), true, true)
                    }
                }
                items => {
                    return Err(CoreError::InvalidFilter(format!(
                        "between on '{}' needs exactly 2 values, got {}",
                        self.column,
                        items.len()
                    )))
                }
            },
            FilterOp::In => match self.list()? {
                [] => Filter::Impossible,
                items => Filter::In(
                    items
                        .iter()
                        .map(|v| v.coerce(kind))
                        .collect::<Result<_, _>>()?,
                ),
            },
            FilterOp::Like => match self.operand()? {
                FilterValue::String(pattern) => Filter::Like(pattern.clone()),
                other => {
                    return Err(CoreError::TypeMismatch {
                        expected: FieldKind::String.to_string(),
                        found: other.describe().to_string(),
                    })
                }
            },
            FilterOp::IsNull => Filter::IsNull,
            FilterOp::IsNotNull => Filter::IsNotNull,
        };
        filter.validate(&self.column, field)?;
        Ok(filter)
    }
}

/// Resolve serialized conditions against `schema` into [`Bounds`].
///
/// Each column may carry at most one condition.
pub fn conditions_to_bounds(
    conditions: &[FilterCondition],
    schema: &Schema,
) -> Result<Bounds, CoreError> {
    let mut bounds = Bounds::new();
    for condition in conditions {
        let field = schema
            .get(&condition.column)
            .ok_or_else(|| CoreError::UnknownColumn(condition.column.clone()))?;
        if bounds.contains_key(&condition.column) {
            return Err(CoreError::DuplicateFilter(condition.column.clone()));
        }
        bounds.insert(condition.column.clone(), condition.to_filter(field)?);
    }
    Ok(bounds)
}
