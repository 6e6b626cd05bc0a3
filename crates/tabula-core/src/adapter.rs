//! The contract every backend exposes to the query engine once constructed.

use serde::Serialize;

use crate::data::{Order, RowIter};
use crate::error::CoreError;
use crate::filter::Bounds;
use crate::schema::Schema;

/// Outcome of asking a backend whether it can serve a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Support {
    Yes,
    No,
    /// Cannot tell without an expensive check.
    Unknown,
}

impl Support {
    /// Whether a planner should keep this backend on its shortlist.
    pub fn is_candidate(self) -> bool {
        !matches!(self, Support::No)
    }
}

/// A constructed adapter instance. Owns its data and schema, immutable for
/// its lifetime, safe to read from several callers at once.
pub trait Adapter: Send + Sync {
    /// Queryable columns, in source order.
    fn get_columns(&self) -> &Schema;

    /// Relative cost of a query with this filter/order shape.
    fn get_cost(&self, bounds: &Bounds, order: &Order) -> f64;

    /// Rows passing `bounds`, sorted by `order`.
    fn get_data(&self, bounds: &Bounds, order: &Order) -> Result<RowIter<'_>, CoreError>;
}
