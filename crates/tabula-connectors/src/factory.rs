//! Adapter factory - pluggable backends chosen by probing the locator.

use std::sync::Arc;

use async_trait::async_trait;
use tabula_core::{Adapter, Support};
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::{AdapterError, FetchError};
use crate::fetch::HtmlTableFetcher;
use crate::html_table::HtmlTableFactory;

/// The static half of an adapter: deciding whether a locator is servable
/// and building an instance for it.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Short identifier used in logs and CLI output.
    fn name(&self) -> &'static str;

    /// Whether this backend can serve `uri`.
    ///
    /// With `fast` set the answer must come without I/O and may be
    /// [`Support::Unknown`]. Without it the backend may do the expensive
    /// check. Never fails.
    async fn supports(&self, uri: &str, fast: bool) -> Support;

    /// Split a locator into the source address and the table selector.
    fn parse_uri(&self, uri: &str) -> (String, usize);

    async fn create(&self, uri: &str) -> Result<Box<dyn Adapter>, AdapterError>;
}

/// Registry of adapter factories. Probes in registration order and hands the
/// locator to the first factory that confirms it.
pub struct AdapterRegistry {
    factories: Vec<Arc<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new(factories: Vec<Arc<dyn AdapterFactory>>) -> Self {
        Self { factories }
    }

    pub fn factories(&self) -> &[Arc<dyn AdapterFactory>] {
        &self.factories
    }

    /// Find the factory that serves `uri`.
    ///
    /// Every factory is asked the fast question first; a fast `Yes` wins
    /// outright. Factories that answered `Unknown` are then asked the slow
    /// question, in order.
    pub async fn resolve(&self, uri: &str) -> Result<Arc<dyn AdapterFactory>, AdapterError> {
        let mut shortlist = Vec::new();
        for factory in &self.factories {
            let support = factory.supports(uri, true).await;
            if support == Support::Yes {
                debug!("'{}' accepted '{}' on the fast probe", factory.name(), uri);
                return Ok(Arc::clone(factory));
            }
            if support.is_candidate() {
                shortlist.push(factory);
            }
        }

        for factory in shortlist {
            if factory.supports(uri, false).await == Support::Yes {
                debug!("'{}' accepted '{}' on the slow probe", factory.name(), uri);
                return Ok(Arc::clone(factory));
            }
        }

        Err(AdapterError::UnsupportedUri(uri.to_string()))
    }

    /// Resolve `uri` and construct an adapter for it.
    pub async fn open(&self, uri: &str) -> Result<Box<dyn Adapter>, AdapterError> {
        let factory = self.resolve(uri).await?;
        let adapter = factory.create(uri).await?;
        info!("Opened '{}' with '{}'", uri, factory.name());
        Ok(adapter)
    }
}

/// Registry holding the built-in HTML table backend.
pub fn default_registry(config: FetchConfig) -> Result<AdapterRegistry, FetchError> {
    let fetcher = Arc::new(HtmlTableFetcher::new(config)?);
    Ok(AdapterRegistry::new(vec![Arc::new(HtmlTableFactory::new(
        fetcher,
    ))]))
}
