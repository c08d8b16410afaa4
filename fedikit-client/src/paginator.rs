//! Cursor-based pagination over `Link` continuation headers.

use std::sync::Arc;

use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::debug;

use fedikit_core::Result;
use fedikit_transport::{HttpTransport, RequestMeta};

/// A forward-only, lazily-advancing sequence of pages.
///
/// Each advance performs one GET against the current URL; the response's
/// `rel="next"` link becomes the next URL, and explicit query parameters
/// are only sent on the first request (the continuation link already
/// encodes them). Advancing requires `&mut self`, so two page fetches can
/// never overlap on one cursor.
pub struct Paginator {
    http: Arc<dyn HttpTransport>,
    initial_path: String,
    initial_params: Option<Value>,
    next: Option<String>,
    params: Option<Value>,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("initial_path", &self.initial_path)
            .field("next", &self.next)
            .finish()
    }
}

impl Paginator {
    pub(crate) fn new(http: Arc<dyn HttpTransport>, path: String, params: Option<Value>) -> Self {
        Self {
            http,
            next: Some(path.clone()),
            params: params.clone(),
            initial_path: path,
            initial_params: params,
        }
    }

    /// Fetch the next page, or `None` once the sequence is exhausted.
    ///
    /// The cursor is exhausted when a response carries no continuation
    /// link; it then produces no further pages until [`reset`](Self::reset).
    pub async fn next_page(&mut self) -> Result<Option<Value>> {
        let Some(path) = self.next.take() else {
            return Ok(None);
        };

        let params = self.params.take();
        let response = self.http.get(&path, params, RequestMeta::default()).await?;

        debug!(path, next = ?response.next, "fetched page");
        self.next = response.next;

        match response.data {
            Some(page) => Ok(Some(page)),
            // An empty body exhausts the cursor even if a link was present.
            None => {
                self.next = None;
                Ok(None)
            }
        }
    }

    /// Re-arm the cursor at its original URL and parameters, in place.
    /// Callers holding a long-lived reference use this to jump back to the
    /// newest items without rebuilding the cursor.
    pub fn reset(&mut self) {
        self.next = Some(self.initial_path.clone());
        self.params = self.initial_params.clone();
    }

    /// Collect up to `n` pages.
    pub async fn take(&mut self, n: usize) -> Result<Vec<Value>> {
        let mut pages = Vec::with_capacity(n);
        while pages.len() < n {
            match self.next_page().await? {
                Some(page) => pages.push(page),
                None => break,
            }
        }
        Ok(pages)
    }

    /// Adapt the cursor into a `Stream` of pages for combinator-style
    /// consumption. Fetches stay strictly sequential.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> {
        stream::try_unfold(self, |mut paginator| async move {
            Ok(paginator.next_page().await?.map(|page| (page, paginator)))
        })
    }
}
