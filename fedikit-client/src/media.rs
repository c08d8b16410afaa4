//! Readiness polling for asynchronously processed media attachments.
//!
//! The v2 media endpoint answers `202 Accepted` with a partial attachment
//! whose `url` is null while the server is still transcoding. Creation
//! resolves only once the attachment leaves that processing state, bounded
//! by a deadline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time;
use tracing::debug;

use fedikit_core::{Error, Result};
use fedikit_transport::{HttpTransport, RequestMeta};

#[derive(Debug, Clone)]
pub struct WaitForOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitForOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Poll the attachment until its `url` becomes non-null, returning the
/// completed entity. Deadline expiry is a [`Error::Timeout`], distinct from
/// transport failure; transport errors during polling propagate unchanged.
pub async fn wait_for_media_attachment(
    http: &Arc<dyn HttpTransport>,
    id: &str,
    options: WaitForOptions,
) -> Result<Value> {
    let path = format!("/api/v1/media/{id}");

    let poll = async {
        loop {
            time::sleep(options.interval).await;
            let response = http.get(&path, None, RequestMeta::default()).await?;

            if let Some(attachment) = response.data {
                match attachment.get("url") {
                    Some(url) if !url.is_null() => return Ok(attachment),
                    _ => debug!(id, "media attachment still processing"),
                }
            }
        }
    };

    time::timeout(options.timeout, poll)
        .await
        .map_err(|_| Error::Timeout(format!("media attachment {id} did not finish processing")))?
}
