//! The fluent request dispatcher.
//!
//! A [`RequestBuilder`] accumulates path segments and resolves a terminal
//! action into one HTTP call. Extension never mutates a shared builder:
//! every step clones the accumulated path, so concurrent call chains built
//! from the same root cannot leak state into each other.
//!
//! Resolution is a pure function of (segments, action, arguments); the only
//! side effect is the single network call it describes.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use fedikit_core::{snake_case, Encoding, Error, FileSource, Result};
use fedikit_transport::{HttpTransport, RequestMeta};

use crate::media::{self, WaitForOptions};
use crate::paginator::Paginator;

/// Terminal action tokens that dispatch a single request, as a closed
/// enumeration. Anything outside the built-in verbs is a custom server-side
/// action POSTed to `<path>/<action>`. Listing resolves to a [`Paginator`]
/// and always uses plain GET semantics, so it carries no token here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Fetch,
    Create,
    Update,
    Remove,
    Custom(String),
}

/// Per-call options layered over the inferred defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    encoding: Option<Encoding>,
    headers: Vec<(String, String)>,
    files: Vec<(String, FileSource)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the inferred wire encoding.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `Idempotency-Key` support on create calls that accept it.
    pub fn idempotency_key(self, key: impl Into<String>) -> Self {
        self.header("Idempotency-Key", key)
    }

    /// Attach a binary file to a multipart request.
    pub fn file(mut self, name: impl Into<String>, source: FileSource) -> Self {
        self.files.push((name.into(), source));
        self
    }
}

#[derive(Clone)]
pub struct RequestBuilder {
    http: Arc<dyn HttpTransport>,
    segments: Vec<String>,
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("segments", &self.segments)
            .finish()
    }
}

impl RequestBuilder {
    pub fn new(http: Arc<dyn HttpTransport>) -> Self {
        Self {
            http,
            segments: Vec::new(),
        }
    }

    /// Extend the call path by one symbolic segment. camelCase names are
    /// transcoded to snake_case for wire compatibility.
    pub fn path(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self {
            http: Arc::clone(&self.http),
            segments,
        }
    }

    /// Extend the call path by several segments at once, typically resource
    /// identifiers: `statuses.select("42").favourite()`.
    pub fn select<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments = self.segments.clone();
        segments.extend(ids.into_iter().map(Into::into));
        Self {
            http: Arc::clone(&self.http),
            segments,
        }
    }

    /// GET with the payload rendered as query parameters.
    pub async fn fetch(&self, params: Option<Value>) -> Result<Option<Value>> {
        self.fetch_with(params, RequestOptions::default()).await
    }

    pub async fn fetch_with(
        &self,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let path = self.resolve_path()?;
        let meta = self.meta(&Action::Fetch, &path, options);
        Ok(self.http.get(&path, params, meta).await?.data)
    }

    /// POST with the payload as body. Creating a media attachment on the v2
    /// endpoint waits for asynchronous processing to finish before
    /// returning.
    pub async fn create(&self, data: Option<Value>) -> Result<Option<Value>> {
        self.create_with(data, RequestOptions::default()).await
    }

    pub async fn create_with(
        &self,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let path = self.resolve_path()?;
        let meta = self.meta(&Action::Create, &path, options);
        let response = self.http.post(&path, data, meta).await?;

        if path == "/api/v2/media" {
            if let Some(attachment) = &response.data {
                if attachment.get("url").is_some_and(Value::is_null) {
                    let id = attachment
                        .get("id")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            Error::Transport("media attachment without an id".to_string())
                        })?;
                    let ready = media::wait_for_media_attachment(
                        &self.http,
                        id,
                        WaitForOptions::default(),
                    )
                    .await?;
                    return Ok(Some(ready));
                }
            }
        }

        Ok(response.data)
    }

    /// PATCH with the payload as body.
    pub async fn update(&self, data: Option<Value>) -> Result<Option<Value>> {
        self.update_with(data, RequestOptions::default()).await
    }

    pub async fn update_with(
        &self,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let path = self.resolve_path()?;
        let meta = self.meta(&Action::Update, &path, options);
        Ok(self.http.patch(&path, data, meta).await?.data)
    }

    /// DELETE.
    pub async fn remove(&self, data: Option<Value>) -> Result<Option<Value>> {
        self.remove_with(data, RequestOptions::default()).await
    }

    pub async fn remove_with(
        &self,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let path = self.resolve_path()?;
        let meta = self.meta(&Action::Remove, &path, options);
        Ok(self.http.delete(&path, data, meta).await?.data)
    }

    /// Paginated GET: returns a lazy cursor instead of a single result.
    pub fn list(&self, params: Option<Value>) -> Result<Paginator> {
        let path = self.resolve_path()?;
        Ok(Paginator::new(Arc::clone(&self.http), path, params))
    }

    /// A custom server-side action, POSTed to `<path>/<action>`.
    pub async fn action(&self, name: &str, data: Option<Value>) -> Result<Option<Value>> {
        self.action_with(name, data, RequestOptions::default()).await
    }

    pub async fn action_with(
        &self,
        name: &str,
        data: Option<Value>,
        options: RequestOptions,
    ) -> Result<Option<Value>> {
        let base = self.resolve_path()?;
        let path = format!("{base}/{}", snake_case(name));
        let meta = self.meta(&Action::Custom(name.to_string()), &path, options);
        Ok(self.http.post(&path, data, meta).await?.data)
    }

    /// The snake-cased join of the accumulated segments.
    fn resolve_path(&self) -> Result<String> {
        if self.segments.is_empty() {
            return Err(Error::InvalidCall("no action specified".to_string()));
        }

        let joined = self
            .segments
            .iter()
            .map(|segment| snake_case(segment))
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!("/{joined}"))
    }

    fn meta(&self, action: &Action, path: &str, options: RequestOptions) -> RequestMeta {
        let encoding = options
            .encoding
            .unwrap_or_else(|| infer_encoding(action, path));
        debug!(path, ?encoding, "resolved call");
        RequestMeta {
            encoding,
            headers: options.headers,
            files: options.files,
        }
    }
}

/// Encoding inference table keyed on the action/path pair. The file-bearing
/// create and update endpoints require multipart bodies; everything else
/// defaults to JSON.
fn infer_encoding(action: &Action, path: &str) -> Encoding {
    match (action, path) {
        (Action::Create, "/api/v1/accounts")
        | (Action::Update, "/api/v1/accounts/update_credentials")
        | (Action::Create, "/api/v1/email/confirmations")
        | (Action::Create, "/api/v1/featured_tags")
        | (Action::Create, "/api/v1/media")
        | (Action::Create, "/api/v2/media") => Encoding::Multipart,
        _ => Encoding::Json,
    }
}
