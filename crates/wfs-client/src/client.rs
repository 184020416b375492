//! WFS client facade.

use std::sync::Arc;

use tracing::{debug, instrument};

use wfs_common::{FeatureTypeDescriptor, ProtocolVersion, VersionRegistry, WfsResult};

use crate::config::ClientConfig;
use crate::negotiate::{Negotiation, Negotiator};
use crate::transport::{CapabilitiesTransport, HttpTransport};

/// Client for one WFS endpoint.
///
/// Cloning is cheap and clones share the transport. Each call negotiates
/// independently; nothing is cached between calls.
#[derive(Debug)]
pub struct WfsClient<T = HttpTransport> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    registry: VersionRegistry,
}

impl<T> Clone for WfsClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl WfsClient<HttpTransport> {
    /// Validate `config` and build the HTTP transport.
    ///
    /// Fails before any network access when the URL is missing or invalid, or
    /// when an explicit version is not supported.
    pub fn new(config: ClientConfig) -> WfsResult<Self> {
        let registry = VersionRegistry::supported();
        config.validate(&registry)?;
        let transport = HttpTransport::new(&config.url, &config.transport)?;
        Ok(Self::from_parts(config, transport, registry))
    }
}

impl<T: CapabilitiesTransport> WfsClient<T> {
    /// Client using a custom transport and the built-in version registry.
    pub fn with_transport(config: ClientConfig, transport: T) -> WfsResult<Self> {
        Self::with_registry(config, transport, VersionRegistry::supported())
    }

    /// Client using a custom transport and version registry.
    pub fn with_registry(
        config: ClientConfig,
        transport: T,
        registry: VersionRegistry,
    ) -> WfsResult<Self> {
        config.validate(&registry)?;
        Ok(Self::from_parts(config, transport, registry))
    }

    fn from_parts(config: ClientConfig, transport: T, registry: VersionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            registry,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Protocol version to use with the service.
    ///
    /// An explicit version is returned without contacting the service.
    pub async fn version(&self) -> WfsResult<ProtocolVersion> {
        match self.config.version {
            Some(version) => Ok(version),
            None => Ok(self.negotiator().negotiate_highest().await?.version),
        }
    }

    /// Capabilities document for the settled version.
    ///
    /// With an explicit version negotiation is skipped and the document is
    /// fetched directly for that version.
    #[instrument(skip(self), fields(url = %self.config.url))]
    pub async fn capabilities(&self) -> WfsResult<Negotiation> {
        match self.config.version {
            Some(version) => {
                debug!(version = %version, "Using configured protocol version");
                let capabilities = self.transport.fetch_capabilities(version).await?;
                Ok(Negotiation {
                    version,
                    capabilities,
                    attempts: 1,
                })
            }
            None => self.negotiator().negotiate_highest().await,
        }
    }

    /// Feature types published by the service, in document order.
    pub async fn feature_types(&self) -> WfsResult<Vec<FeatureTypeDescriptor>> {
        let negotiation = self.capabilities().await?;
        let feature_types = negotiation.feature_types();
        debug!(
            version = %negotiation.version,
            count = feature_types.len(),
            "Listed feature types"
        );
        Ok(feature_types)
    }

    fn negotiator(&self) -> Negotiator<'_, T> {
        Negotiator::new(self.transport.as_ref(), &self.registry)
    }
}
