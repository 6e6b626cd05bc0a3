//! Tabula Connectors - Source adapters
//!
//! This crate turns locators into adapters:
//! - HTML tables fetched over HTTP(S) or from local files
//! - A registry that probes locators against the available backends
//! - A bridge that registers adapter output with DataFusion

pub mod config;
pub mod error;
pub mod factory;
pub mod fetch;
pub mod html;
pub mod html_table;
pub mod infer;
pub mod provider;
pub mod uri;

pub use config::FetchConfig;
pub use error::{AdapterError, FetchError};
pub use factory::{default_registry, AdapterFactory, AdapterRegistry};
pub use fetch::{HtmlTableFetcher, TableFetcher};
pub use html::parse_tables;
pub use html_table::{HtmlTableAdapter, HtmlTableFactory, AVERAGE_NUMBER_OF_ROWS};
pub use provider::{arrow_schema, register_adapter, rows_to_batch};
pub use uri::{parse_uri, SUPPORTED_SCHEMES};
