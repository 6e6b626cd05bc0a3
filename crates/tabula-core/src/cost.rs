//! Planner-facing cost estimates.

use crate::data::Order;
use crate::filter::Bounds;

/// Relative cost of answering a query with a given filter/order shape.
/// Lower is cheaper; only comparisons between adapters are meaningful.
pub trait CostModel: Send + Sync {
    fn estimate(&self, bounds: &Bounds, order: &Order) -> f64;
}

/// Charges a fixed nominal row count for every query.
///
/// For adapters whose table is fully resident after construction the fetch
/// dominates, so filters and ordering do not change the figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCostModel {
    rows: u64,
}

impl FlatCostModel {
    pub const fn new(rows: u64) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl CostModel for FlatCostModel {
    fn estimate(&self, _bounds: &Bounds, _order: &Order) -> f64 {
        self.rows as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RequestedOrder;
    use crate::filter::Filter;
    use crate::value::Value;

    #[test]
    fn test_flat_cost_ignores_query_shape() {
        let model = FlatCostModel::new(100);
        let mut bounds = Bounds::new();
        let base = model.estimate(&bounds, &[]);
        assert_eq!(base, 100.0);

        bounds.insert("a".into(), Filter::Equal(Value::Integer(1)));
        bounds.insert("b".into(), Filter::IsNotNull);
        let order = [("a".to_string(), RequestedOrder::Descending)];
        assert_eq!(model.estimate(&bounds, &order), base);
    }
}
