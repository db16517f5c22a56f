//! Contract descriptor loading.
//!
//! The descriptor is fetched once at startup from a [`DescriptorSource`],
//! bounded by the configured timeout, and parsed against the target network.
//! A failed load leaves nothing behind, so it can simply be retried.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tracing::{info, instrument, warn};
use verichain_contracts::ContractDescriptor;
use verichain_networks::Network;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Somewhere a descriptor document can be fetched from.
pub trait DescriptorSource: Send + Sync {
    /// Describes the source for logs and error messages.
    fn location(&self) -> String;

    /// Fetches the raw descriptor document.
    fn fetch(&self) -> impl Future<Output = Result<Bytes>> + Send;
}

fn fetch_error(location: String, message: impl ToString) -> ClientError {
    ClientError::DescriptorFetch {
        location,
        message: message.to_string(),
    }
}

/// Reads the descriptor from a file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DescriptorSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Bytes> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|e| fetch_error(self.location(), e))
    }
}

/// Serves a descriptor held in memory, for embedded or pre-fetched documents.
#[derive(Debug, Clone)]
pub struct StaticSource {
    document: Bytes,
}

impl StaticSource {
    /// Creates a source serving `document`.
    pub fn new(document: impl Into<Bytes>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

impl DescriptorSource for StaticSource {
    fn location(&self) -> String {
        "memory".to_owned()
    }

    async fn fetch(&self) -> Result<Bytes> {
        Ok(self.document.clone())
    }
}

/// Fetches the descriptor over HTTP(S).
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl HttpSource {
    /// Creates a source fetching `url`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| fetch_error(url.clone(), e))?;
        Ok(Self { client, url })
    }
}

#[cfg(feature = "http")]
impl DescriptorSource for HttpSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Bytes> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| fetch_error(self.location(), e))?;
        let response = response
            .error_for_status()
            .map_err(|e| fetch_error(self.location(), e))?;
        response
            .bytes()
            .await
            .map_err(|e| fetch_error(self.location(), e))
    }
}

/// Any of the built-in sources, picked from a configured location.
#[derive(Debug, Clone)]
pub enum AnySource {
    /// A file path.
    File(FileSource),
    /// An `http://` or `https://` URL.
    #[cfg(feature = "http")]
    Http(HttpSource),
}

impl AnySource {
    /// Picks a source for `location`: URLs are fetched over HTTP, anything
    /// else is read as a file path.
    pub fn from_location(location: &str) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            #[cfg(feature = "http")]
            return HttpSource::new(location).map(Self::Http);
            #[cfg(not(feature = "http"))]
            return Err(fetch_error(
                location.to_owned(),
                "HTTP support is disabled in this build",
            ));
        }
        Ok(Self::File(FileSource::new(location)))
    }
}

impl DescriptorSource for AnySource {
    fn location(&self) -> String {
        match self {
            Self::File(source) => source.location(),
            #[cfg(feature = "http")]
            Self::Http(source) => source.location(),
        }
    }

    async fn fetch(&self) -> Result<Bytes> {
        match self {
            Self::File(source) => source.fetch().await,
            #[cfg(feature = "http")]
            Self::Http(source) => source.fetch().await,
        }
    }
}

/// Fetches and parses a descriptor for `network`, giving up after `timeout`.
///
/// # Errors
///
/// - [`ClientError::DescriptorFetch`] on transport failure, HTTP error status or timeout
/// - [`ClientError::DescriptorParse`] if the document is not a usable descriptor
/// - [`ClientError::NetworkNotDeployed`] if `network` has no deployment
#[instrument(skip_all, fields(location = %source.location(), network = %network))]
pub async fn load_descriptor<S: DescriptorSource>(
    source: &S,
    network: Network,
    timeout: Duration,
) -> Result<ContractDescriptor> {
    let document = tokio::time::timeout(timeout, source.fetch())
        .await
        .map_err(|_| fetch_error(source.location(), format!("timed out after {timeout:?}")))??;

    let descriptor = ContractDescriptor::from_json(&document, network).inspect_err(|e| {
        warn!(error = %e, "contract descriptor rejected");
    })?;

    let compiler = descriptor.compiler_version();
    info!(
        contract = descriptor.contract_name(),
        address = %descriptor.address(),
        network = %descriptor.network(),
        compiler = compiler.as_deref().unwrap_or("unknown"),
        "contract descriptor loaded"
    );
    Ok(descriptor)
}

/// Loads the descriptor from the location and network in `config`.
pub async fn load_configured(config: &ClientConfig) -> Result<ContractDescriptor> {
    let source = AnySource::from_location(&config.descriptor_location)?;
    load_descriptor(&source, config.network, config.fetch_timeout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use verichain_networks::{NamedNetwork, TARGET_NETWORK};

    const FIXTURE: &str = include_str!("../../../fixtures/VeriChain.json");

    struct StalledSource;

    impl DescriptorSource for StalledSource {
        fn location(&self) -> String {
            "stalled".to_owned()
        }

        async fn fetch(&self) -> Result<Bytes> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let source = FileSource::new(file.path());
        let descriptor = load_descriptor(&source, TARGET_NETWORK, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(descriptor.contract_name(), "VeriChain");
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("VeriChain.json"));

        let err = load_descriptor(&source, TARGET_NETWORK, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::DescriptorFetch { .. }));
    }

    #[tokio::test]
    async fn test_parse_failures() {
        let source = StaticSource::new(&b"<html>not found</html>"[..]);
        let err = load_descriptor(&source, TARGET_NETWORK, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::DescriptorParse(_)));

        let source = StaticSource::new(FIXTURE);
        let err = load_descriptor(&source, NamedNetwork::Mainnet.into(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NetworkNotDeployed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let err = load_descriptor(&StalledSource, TARGET_NETWORK, Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            ClientError::DescriptorFetch { location, message } => {
                assert_eq!(location, "stalled");
                assert!(message.contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_source_selection() {
        assert!(matches!(
            AnySource::from_location("./VeriChain.json").unwrap(),
            AnySource::File(_)
        ));
        #[cfg(feature = "http")]
        assert!(matches!(
            AnySource::from_location("https://example.org/VeriChain.json").unwrap(),
            AnySource::Http(_)
        ));
    }
}
