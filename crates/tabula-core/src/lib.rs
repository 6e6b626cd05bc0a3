//! Tabula Core - typed tables behind a uniform adapter contract
//!
//! This crate holds everything an adapter needs once its data is in memory:
//! the scalar value model, column fields and the kind → field type map,
//! filters, the row iterator, and the cost model.

pub mod adapter;
pub mod cost;
pub mod data;
pub mod error;
pub mod field;
pub mod filter;
pub mod schema;
pub mod table;
pub mod value;

pub use adapter::{Adapter, Support};
pub use cost::{CostModel, FlatCostModel};
pub use data::{get_table_data, Order, RequestedOrder, Row, RowIter};
pub use error::CoreError;
pub use field::{ColumnKind, Field, FieldKind, FilterKind, OrderSupport, TypeMap};
pub use filter::{conditions_to_bounds, Bounds, Filter, FilterCondition, FilterOp, FilterValue};
pub use schema::Schema;
pub use table::{Column, Table};
pub use value::{parse_timestamp, FromValue, Value};
