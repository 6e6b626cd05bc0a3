//! Adapter serving tables scraped from HTML documents.
//!
//! A locator is a document URI; its fragment picks the table
//! (`https://example.com/page#2` is the third table on the page).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tabula_core::{
    get_table_data, Adapter, Bounds, CoreError, CostModel, FlatCostModel, Order, RowIter, Schema,
    Support, Table, TypeMap,
};
use tracing::{debug, info};

use crate::error::{AdapterError, FetchError};
use crate::factory::AdapterFactory;
use crate::fetch::TableFetcher;
use crate::uri::{has_supported_scheme, parse_uri, strip_fragment};

/// Nominal table size charged for every query.
pub const AVERAGE_NUMBER_OF_ROWS: u64 = 100;

/// One HTML table, loaded at construction and immutable afterwards.
pub struct HtmlTableAdapter {
    uri: String,
    index: usize,
    table: Table,
    columns: Schema,
    cost: FlatCostModel,
}

impl fmt::Debug for HtmlTableAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlTableAdapter")
            .field("uri", &self.uri)
            .field("index", &self.index)
            .field("rows", &self.table.num_rows())
            .field("columns", &self.columns.len())
            .finish()
    }
}

impl HtmlTableAdapter {
    /// Fetch the document at `uri` and keep table `index`.
    ///
    /// Unlike probing, fetch failures and an out-of-range index are
    /// returned to the caller.
    pub async fn new(
        fetcher: &dyn TableFetcher,
        uri: &str,
        index: usize,
        type_map: &TypeMap,
    ) -> Result<Self, AdapterError> {
        let mut tables = fetcher.fetch(uri).await?;
        let available = tables.len();
        if index >= available {
            return Err(FetchError::TableIndexOutOfRange { index, available }.into());
        }
        let table = tables.swap_remove(index);
        let adapter = Self::from_table(uri, index, table, type_map);
        info!(
            "Loaded table #{} from '{}': {} rows, {} of {} columns queryable",
            index,
            uri,
            adapter.table.num_rows(),
            adapter.columns.len(),
            adapter.table.num_columns()
        );
        Ok(adapter)
    }

    /// Resolve a locator (`<uri>#<index>`) and construct from it.
    pub async fn open(
        fetcher: &dyn TableFetcher,
        locator: &str,
        type_map: &TypeMap,
    ) -> Result<Self, AdapterError> {
        let (uri, index) = parse_uri(locator);
        Self::new(fetcher, &uri, index, type_map).await
    }

    /// Wrap an already loaded table.
    pub fn from_table(uri: &str, index: usize, table: Table, type_map: &TypeMap) -> Self {
        let (columns, excluded) = Schema::derive(&table, type_map);
        for name in &excluded {
            debug!("Column '{}' has no field type; leaving it out of the schema", name);
        }
        Self {
            uri: uri.to_string(),
            index,
            table,
            columns,
            cost: FlatCostModel::new(AVERAGE_NUMBER_OF_ROWS),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The full fetched table, including columns left out of the schema.
    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl Adapter for HtmlTableAdapter {
    fn get_columns(&self) -> &Schema {
        &self.columns
    }

    fn get_cost(&self, bounds: &Bounds, order: &Order) -> f64 {
        self.cost.estimate(bounds, order)
    }

    fn get_data(&self, bounds: &Bounds, order: &Order) -> Result<RowIter<'_>, CoreError> {
        get_table_data(&self.table, &self.columns, bounds, order)
    }
}

/// Probes and builds [`HtmlTableAdapter`]s.
pub struct HtmlTableFactory {
    fetcher: Arc<dyn TableFetcher>,
    type_map: TypeMap,
}

impl HtmlTableFactory {
    pub fn new(fetcher: Arc<dyn TableFetcher>) -> Self {
        Self::with_type_map(fetcher, TypeMap::STANDARD)
    }

    pub fn with_type_map(fetcher: Arc<dyn TableFetcher>, type_map: TypeMap) -> Self {
        Self { fetcher, type_map }
    }

    /// Construct a concrete adapter for `uri`.
    pub async fn connect(&self, uri: &str) -> Result<HtmlTableAdapter, AdapterError> {
        HtmlTableAdapter::open(self.fetcher.as_ref(), uri, &self.type_map).await
    }
}

#[async_trait]
impl AdapterFactory for HtmlTableFactory {
    fn name(&self) -> &'static str {
        "html_table"
    }

    fn parse_uri(&self, uri: &str) -> (String, usize) {
        parse_uri(uri)
    }

    async fn supports(&self, uri: &str, fast: bool) -> Support {
        if !has_supported_scheme(uri) {
            return Support::No;
        }
        if fast {
            return Support::Unknown;
        }

        let stripped = strip_fragment(uri);
        match self.fetcher.fetch(stripped).await {
            Ok(tables) if tables.is_empty() => Support::No,
            Ok(_) => Support::Yes,
            Err(
                e @ (FetchError::InvalidUri(_)
                | FetchError::UnsupportedScheme(_)
                | FetchError::Io(_)
                | FetchError::Http(_)
                | FetchError::Ftp(_)
                | FetchError::Parse(_)
                | FetchError::NoTables(_)
                | FetchError::TableIndexOutOfRange { .. }),
            ) => {
                debug!("Probe of '{}' failed: {}", stripped, e);
                Support::No
            }
        }
    }

    async fn create(&self, uri: &str) -> Result<Box<dyn Adapter>, AdapterError> {
        Ok(Box::new(self.connect(uri).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tabula_core::{Column, Filter, RequestedOrder, Value};

    /// Returns canned tables (or an error) and records every call.
    struct StubFetcher {
        result: Result<Vec<Table>, FetchError>,
        calls: AtomicUsize,
        last_uri: Mutex<Option<String>>,
    }

    impl StubFetcher {
        fn ok(tables: Vec<Table>) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(tables),
                calls: AtomicUsize::new(0),
                last_uri: Mutex::new(None),
            })
        }

        fn err(e: FetchError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(e),
                calls: AtomicUsize::new(0),
                last_uri: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TableFetcher for StubFetcher {
        async fn fetch(&self, uri: &str) -> Result<Vec<Table>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_uri.lock().unwrap() = Some(uri.to_string());
            self.result.clone()
        }
    }

    fn people() -> Table {
        Table::try_new(vec![
            Column::new(
                "name",
                vec![Value::from("Ada"), Value::from("Grace"), Value::from("Linus")],
            ),
            Column::new(
                "born",
                vec![Value::Integer(1815), Value::Integer(1906), Value::Integer(1969)],
            ),
            Column::new(
                "misc",
                vec![Value::Integer(1), Value::from("two"), Value::Boolean(true)],
            ),
        ])
        .unwrap()
    }

    fn numbers() -> Table {
        Table::try_new(vec![Column::new("n", vec![Value::Integer(42)])]).unwrap()
    }

    // --- probing ---

    #[tokio::test]
    async fn test_fast_check_rejects_unsupported_scheme_without_fetching() {
        let fetcher = StubFetcher::ok(vec![people()]);
        let factory = HtmlTableFactory::new(fetcher.clone());
        for uri in ["s3://bucket/t.html", "postgres://h/db", "nonsense"] {
            assert_eq!(factory.supports(uri, true).await, Support::No);
            assert_eq!(factory.supports(uri, false).await, Support::No);
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fast_check_defers_on_supported_scheme() {
        let fetcher = StubFetcher::ok(vec![people()]);
        let factory = HtmlTableFactory::new(fetcher.clone());
        for uri in ["http://x/y", "https://x/y#1", "ftp://x/y", "file:///tmp/y.html"] {
            assert_eq!(factory.supports(uri, true).await, Support::Unknown);
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_slow_check_fetches_stripped_uri() {
        let fetcher = StubFetcher::ok(vec![people()]);
        let factory = HtmlTableFactory::new(fetcher.clone());
        assert_eq!(factory.supports("https://x/y#3", false).await, Support::Yes);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            fetcher.last_uri.lock().unwrap().as_deref(),
            Some("https://x/y")
        );
    }

    #[tokio::test]
    async fn test_slow_check_swallows_fetch_errors() {
        for e in [
            FetchError::Http("503 Service Unavailable".into()),
            FetchError::NoTables("https://x/y".into()),
            FetchError::Parse("bad".into()),
        ] {
            let factory = HtmlTableFactory::new(StubFetcher::err(e));
            assert_eq!(factory.supports("https://x/y", false).await, Support::No);
        }
    }

    #[tokio::test]
    async fn test_slow_check_no_tables_is_unsupported() {
        let factory = HtmlTableFactory::new(StubFetcher::ok(vec![]));
        assert_eq!(factory.supports("https://x/y", false).await, Support::No);
    }

    // --- construction ---

    #[test]
    fn test_parse_uri_through_factory() {
        let factory = HtmlTableFactory::new(StubFetcher::ok(vec![]));
        assert_eq!(factory.parse_uri("https://x/y#2"), ("https://x/y".to_string(), 2));
        assert_eq!(factory.parse_uri("https://x/y#-1"), ("https://x/y".to_string(), 0));
    }

    #[tokio::test]
    async fn test_construct_selects_table_by_fragment() {
        let fetcher = StubFetcher::ok(vec![people(), numbers()]);
        let factory = HtmlTableFactory::new(fetcher.clone());
        let adapter = factory.connect("https://x/y#1").await.unwrap();
        assert_eq!(adapter.index(), 1);
        assert_eq!(adapter.uri(), "https://x/y");
        assert_eq!(adapter.get_columns().names().collect::<Vec<_>>(), vec!["n"]);
        assert_eq!(
            fetcher.last_uri.lock().unwrap().as_deref(),
            Some("https://x/y")
        );
    }

    #[tokio::test]
    async fn test_construct_malformed_fragment_uses_first_table() {
        let factory = HtmlTableFactory::new(StubFetcher::ok(vec![people(), numbers()]));
        let adapter = factory.connect("https://x/y#second").await.unwrap();
        assert_eq!(adapter.index(), 0);
        assert_eq!(adapter.table().num_rows(), 3);
    }

    #[tokio::test]
    async fn test_construct_index_out_of_range() {
        let factory = HtmlTableFactory::new(StubFetcher::ok(vec![people()]));
        let err = factory.connect("https://x/y#5").await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Fetch(FetchError::TableIndexOutOfRange { index: 5, available: 1 })
        ));
    }

    #[tokio::test]
    async fn test_construct_propagates_fetch_error() {
        let factory = HtmlTableFactory::new(StubFetcher::err(FetchError::Http("timeout".into())));
        let err = factory.connect("https://x/y").await.unwrap_err();
        assert!(matches!(err, AdapterError::Fetch(FetchError::Http(_))));
    }

    #[tokio::test]
    async fn test_check_and_construct_fetch_independently() {
        let fetcher = StubFetcher::ok(vec![people()]);
        let factory = HtmlTableFactory::new(fetcher.clone());
        assert_eq!(factory.supports("https://x/y", false).await, Support::Yes);
        factory.create("https://x/y").await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    // --- schema and data ---

    #[test]
    fn test_schema_excludes_unrecognized_columns_but_table_keeps_them() {
        let adapter = HtmlTableAdapter::from_table("mem://", 0, people(), &TypeMap::STANDARD);
        let names: Vec<&str> = adapter.get_columns().names().collect();
        assert_eq!(names, vec!["name", "born"]);
        assert!(adapter.table().column("misc").is_some());

        let row = adapter.get_data(&Bounds::new(), &[]).unwrap().next().unwrap();
        assert!(row.get("misc").is_none());
    }

    #[test]
    fn test_get_data_filters_and_orders() {
        let adapter = HtmlTableAdapter::from_table("mem://", 0, people(), &TypeMap::STANDARD);
        let mut bounds = Bounds::new();
        bounds.insert(
            "born".into(),
            Filter::Range {
                start: Some(Value::Integer(1900)),
                end: None,
                include_start: true,
                include_end: false,
            },
        );
        let order = [("born".to_string(), RequestedOrder::Descending)];
        let names: Vec<String> = adapter
            .get_data(&bounds, &order)
            .unwrap()
            .map(|r| r.try_get::<String>("name").unwrap())
            .collect();
        assert_eq!(names, vec!["Linus", "Grace"]);
    }

    #[test]
    fn test_get_cost_is_flat() {
        let adapter = HtmlTableAdapter::from_table("mem://", 0, people(), &TypeMap::STANDARD);
        let mut bounds = Bounds::new();
        let empty = adapter.get_cost(&bounds, &[]);
        bounds.insert("name".into(), Filter::Like("A%".into()));
        let order = [("born".to_string(), RequestedOrder::Ascending)];
        assert_eq!(empty, AVERAGE_NUMBER_OF_ROWS as f64);
        assert_eq!(adapter.get_cost(&bounds, &order), empty);
    }

    #[test]
    fn test_get_data_unknown_filter_column() {
        let adapter = HtmlTableAdapter::from_table("mem://", 0, people(), &TypeMap::STANDARD);
        let mut bounds = Bounds::new();
        bounds.insert("misc".into(), Filter::IsNotNull);
        assert_eq!(
            adapter.get_data(&bounds, &[]).unwrap_err(),
            CoreError::UnknownColumn("misc".to_string())
        );
    }
}
