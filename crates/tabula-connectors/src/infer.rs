//! Type inference for scraped cell text.
//!
//! A column gets the narrowest kind every non-null cell parses as, in the
//! order integer, float, boolean, timestamp, string.

use tabula_core::{parse_timestamp, Column, ColumnKind, Value};

/// Cell texts read as missing values.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na(text: &str) -> bool {
    NA_VALUES.contains(&text)
}

/// Drop `,` thousands separators from something that otherwise looks numeric.
fn strip_thousands(text: &str) -> Option<String> {
    if !text.contains(',') {
        return None;
    }
    let digits_start = text.trim_start_matches(['+', '-']);
    if digits_start.starts_with(',') || text.ends_with(',') || text.contains(",,") {
        return None;
    }
    Some(text.replace(',', ""))
}

pub fn parse_integer(text: &str) -> Option<i64> {
    text.parse::<i64>()
        .ok()
        .or_else(|| strip_thousands(text).and_then(|t| t.parse().ok()))
}

pub fn parse_float(text: &str) -> Option<f64> {
    let looks_numeric = |t: &str| t.chars().any(|c| c.is_ascii_digit()) || is_special_float(t);
    if !looks_numeric(text) {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .or_else(|| strip_thousands(text).and_then(|t| t.parse().ok()))
}

fn is_special_float(text: &str) -> bool {
    matches!(
        text.trim_start_matches(['+', '-']).to_ascii_lowercase().as_str(),
        "inf" | "infinity"
    )
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Infer the kind of a column from its cell texts. `None` cells (missing
/// from short rows) and NA markers are nulls.
pub fn infer_kind(cells: &[Option<String>]) -> ColumnKind {
    let present: Vec<&str> = cells
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|t| !is_na(t))
        .collect();

    if present.is_empty() {
        return ColumnKind::Float;
    }
    if present.iter().all(|t| parse_integer(t).is_some()) {
        ColumnKind::Integer
    } else if present.iter().all(|t| parse_float(t).is_some()) {
        ColumnKind::Float
    } else if present.iter().all(|t| parse_bool(t).is_some()) {
        ColumnKind::Boolean
    } else if present.iter().all(|t| parse_timestamp(t).is_some()) {
        ColumnKind::Timestamp
    } else {
        ColumnKind::String
    }
}

fn convert(text: &str, kind: ColumnKind) -> Value {
    if is_na(text) {
        return Value::Null;
    }
    let parsed = match kind {
        ColumnKind::Integer => parse_integer(text).map(Value::Integer),
        ColumnKind::Float => parse_float(text).map(Value::Float),
        ColumnKind::Boolean => parse_bool(text).map(Value::Boolean),
        ColumnKind::Timestamp => parse_timestamp(text).map(Value::Timestamp),
        ColumnKind::String | ColumnKind::Mixed => Some(Value::String(text.to_string())),
    };
    parsed.unwrap_or(Value::Null)
}

/// Build a typed column from scraped cell texts.
pub fn infer_column(name: impl Into<String>, cells: Vec<Option<String>>) -> Column {
    let kind = infer_kind(&cells);
    let values = cells
        .iter()
        .map(|cell| match cell {
            Some(text) => convert(text, kind),
            None => Value::Null,
        })
        .collect();
    Column::with_kind(name, kind, values)
}
