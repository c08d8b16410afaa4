//! Client entry point wiring the transports to the fluent surface.

use std::sync::Arc;

use fedikit_core::Result;
use fedikit_transport::{ClientConfig, HttpTransport, ReqwestTransport, TungsteniteConnector};

use crate::builder::RequestBuilder;
use crate::streaming::StreamingClient;

/// A configured client for one instance.
///
/// ```no_run
/// # use fedikit_client::Client;
/// # use fedikit_transport::ClientConfig;
/// # async fn run() -> fedikit_core::Result<()> {
/// let config = ClientConfig::new("https://mastodon.social")?.with_access_token("token");
/// let client = Client::new(config)?;
///
/// // POST /api/v1/statuses/42/favourite
/// client
///     .rest()
///     .path("api").path("v1").path("statuses")
///     .select(["42"])
///     .action("favourite", None)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    http: Arc<dyn HttpTransport>,
    config: ClientConfig,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Arc::new(ReqwestTransport::new(config.clone())?);
        Ok(Self { http, config })
    }

    /// Build a client over a custom transport, mainly for tests.
    pub fn from_transport(http: Arc<dyn HttpTransport>, config: ClientConfig) -> Self {
        Self { http, config }
    }

    /// Root of the fluent REST surface, with an empty call path.
    pub fn rest(&self) -> RequestBuilder {
        RequestBuilder::new(Arc::clone(&self.http))
    }

    /// Streaming API client over the instance's WebSocket endpoint.
    pub fn streaming(&self) -> StreamingClient {
        StreamingClient::new(TungsteniteConnector::new(self.config.clone()))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
