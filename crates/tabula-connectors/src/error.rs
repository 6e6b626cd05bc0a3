//! Typed errors for the connectors crate.

use std::fmt;

use tabula_core::CoreError;

/// Errors raised while fetching and parsing a source document.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The locator is not a valid URI.
    InvalidUri(String),
    /// The scheme is valid for the adapter but no transport exists for it.
    UnsupportedScheme(String),
    /// Reading a local file failed.
    Io(String),
    /// The HTTP request failed or returned a non-success status.
    Http(String),
    /// Connecting to, logging in to or downloading from an FTP server failed.
    Ftp(String),
    /// The document could not be turned into tables.
    Parse(String),
    /// The document contains no tables.
    NoTables(String),
    /// The locator's table selector is past the last table.
    TableIndexOutOfRange { index: usize, available: usize },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::InvalidUri(msg) => write!(f, "invalid URI: {}", msg),
            FetchError::UnsupportedScheme(scheme) => {
                write!(f, "no transport for scheme '{}'", scheme)
            }
            FetchError::Io(msg) => write!(f, "I/O error: {}", msg),
            FetchError::Http(msg) => write!(f, "HTTP error: {}", msg),
            FetchError::Ftp(msg) => write!(f, "FTP error: {}", msg),
            FetchError::Parse(msg) => write!(f, "parse error: {}", msg),
            FetchError::NoTables(uri) => write!(f, "no tables found in {}", uri),
            FetchError::TableIndexOutOfRange { index, available } => write!(
                f,
                "table index {} out of range ({} tables found)",
                index, available
            ),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e.to_string())
    }
}

impl From<suppaftp::FtpError> for FetchError {
    fn from(e: suppaftp::FtpError) -> Self {
        FetchError::Ftp(e.to_string())
    }
}

/// Errors surfaced by adapter construction, lookup and querying.
#[derive(Debug)]
pub enum AdapterError {
    /// Loading the source failed.
    Fetch(FetchError),
    /// A query against the loaded table was rejected.
    Core(CoreError),
    /// No registered adapter accepts the locator.
    UnsupportedUri(String),
    /// The query engine rejected the adapter's data.
    Engine(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Fetch(e) => write!(f, "could not load table: {}", e),
            AdapterError::Core(e) => write!(f, "query rejected: {}", e),
            AdapterError::UnsupportedUri(uri) => write!(f, "unsupported URI: {}", uri),
            AdapterError::Engine(msg) => write!(f, "engine error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdapterError::Fetch(e) => Some(e),
            AdapterError::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FetchError> for AdapterError {
    fn from(e: FetchError) -> Self {
        AdapterError::Fetch(e)
    }
}

impl From<CoreError> for AdapterError {
    fn from(e: CoreError) -> Self {
        AdapterError::Core(e)
    }
}

impl From<datafusion::error::DataFusionError> for AdapterError {
    fn from(e: datafusion::error::DataFusionError) -> Self {
        AdapterError::Engine(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for AdapterError {
    fn from(e: arrow::error::ArrowError) -> Self {
        AdapterError::Engine(e.to_string())
    }
}
