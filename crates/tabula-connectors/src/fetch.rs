//! Tabular source fetching: locator → tables.

use std::net::ToSocketAddrs;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tabula_core::Table;
use tracing::{debug, info};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::html::parse_tables;

/// Bytes scanned for a `<meta charset>` declaration.
const CHARSET_SCAN_LIMIT: usize = 1024;

/// Loads every table behind a locator.
///
/// Implementations do no caching; each call fetches again. They fail rather
/// than return partial tables.
#[async_trait]
pub trait TableFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Vec<Table>, FetchError>;
}

/// Fetches an HTML document over HTTP(S), FTP or from a `file://` path and
/// parses its `<table>` elements.
#[derive(Debug, Clone)]
pub struct HtmlTableFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HtmlTableFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    async fn read_document(&self, uri: &str) -> Result<String, FetchError> {
        let url = Url::parse(uri).map_err(|e| FetchError::InvalidUri(format!("{}: {}", uri, e)))?;
        match url.scheme() {
            "http" | "https" => {
                debug!("GET {}", url);
                let response = self.client.get(url).send().await?.error_for_status()?;
                Ok(response.text().await?)
            }
            "ftp" => {
                let timeout = self.config.timeout();
                let bytes = tokio::task::spawn_blocking(move || retrieve_ftp(&url, timeout))
                    .await
                    .map_err(|e| FetchError::Ftp(format!("transfer task failed: {}", e)))??;
                Ok(decode_document(&bytes))
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| FetchError::InvalidUri(format!("{}: not a local path", uri)))?;
                debug!("Reading {}", path.display());
                let bytes = tokio::fs::read(&path).await?;
                Ok(decode_document(&bytes))
            }
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Download the file behind an `ftp://` URL. Logs in anonymously unless the
/// URL carries credentials.
fn retrieve_ftp(url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
    let host = url
        .host_str()
        .ok_or_else(|| FetchError::InvalidUri(format!("{}: missing host", url)))?;
    let port = url.port_or_known_default().unwrap_or(21);
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| FetchError::Ftp(format!("cannot resolve {}", host)))?;

    let (user, password) = match url.username() {
        "" => ("anonymous", "anonymous@"),
        user => (user, url.password().unwrap_or("")),
    };

    debug!("RETR {} from {}", url.path(), addr);
    let mut ftp = FtpStream::connect_timeout(addr, timeout)?;
    ftp.login(user, password)?;
    ftp.transfer_type(FileType::Binary)?;
    let bytes = ftp.retr_as_buffer(url.path())?.into_inner();
    if let Err(e) = ftp.quit() {
        debug!("FTP QUIT to {} failed: {}", addr, e);
    }
    Ok(bytes)
}

/// Decode a raw HTML document.
///
/// A byte order mark wins, then a `charset` declared near the top of the
/// document, then UTF-8 when the bytes are valid UTF-8. Anything else is
/// read as windows-1252, which is also what `iso-8859-1` labels map to.
pub fn decode_document(bytes: &[u8]) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| declared_charset(bytes))
        .unwrap_or_else(|| {
            if std::str::from_utf8(bytes).is_ok() {
                UTF_8
            } else {
                WINDOWS_1252
            }
        });
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("Malformed {} sequences replaced while decoding", used.name());
    }
    text.into_owned()
}

/// Encoding named by the first `charset=` in the head of the document.
fn declared_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(CHARSET_SCAN_LIMIT)];
    let lower = head.to_ascii_lowercase();
    let start = lower.windows(8).position(|w| w == b"charset=")? + 8;
    let label: Vec<u8> = lower[start..]
        .iter()
        .copied()
        .skip_while(|b| matches!(b, b'"' | b'\'' | b' '))
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
        .collect();
    Encoding::for_label(&label)
}

#[async_trait]
impl TableFetcher for HtmlTableFetcher {
    async fn fetch(&self, uri: &str) -> Result<Vec<Table>, FetchError> {
        let document = self.read_document(uri).await?;
        let mut tables = parse_tables(&document)?;
        if tables.is_empty() {
            return Err(FetchError::NoTables(uri.to_string()));
        }
        if self.config.max_tables > 0 {
            tables.truncate(self.config.max_tables);
        }
        info!(
            "Fetched {} table(s) from '{}' ({} bytes)",
            tables.len(),
            uri,
            document.len()
        );
        Ok(tables)
    }
}
