//! The transport seam consumed by the dispatcher and the pagination cursor.
//!
//! The core never performs raw I/O itself; it describes requests and hands
//! them to an [`HttpTransport`]. Tests substitute in-memory fakes here.

use async_trait::async_trait;
use serde_json::Value;

use fedikit_core::{Encoding, FileSource, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Per-request metadata: wire encoding, header overrides (including
/// `Idempotency-Key` on creates that accept it) and binary attachments for
/// multipart requests.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub encoding: Encoding,
    pub headers: Vec<(String, String)>,
    pub files: Vec<(String, FileSource)>,
}

/// A fully resolved request descriptor. Immutable, produced once per call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    /// Query parameters; explicit params replace any query string embedded
    /// in `path`.
    pub params: Option<Value>,
    /// Structured body payload.
    pub data: Option<Value>,
    pub meta: RequestMeta,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Deserialized body with caller-convention keys; `None` for empty or
    /// unparseable bodies.
    pub data: Option<Value>,
    /// Continuation URL from the `Link` header's `rel="next"` element.
    pub next: Option<String>,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse>;

    async fn get(
        &self,
        path: &str,
        params: Option<Value>,
        meta: RequestMeta,
    ) -> Result<HttpResponse> {
        self.request(HttpRequest {
            method: Method::Get,
            path: path.to_string(),
            params,
            data: None,
            meta,
        })
        .await
    }

    async fn post(
        &self,
        path: &str,
        data: Option<Value>,
        meta: RequestMeta,
    ) -> Result<HttpResponse> {
        self.request(HttpRequest {
            method: Method::Post,
            path: path.to_string(),
            params: None,
            data,
            meta,
        })
        .await
    }

    async fn put(&self, path: &str, data: Option<Value>, meta: RequestMeta) -> Result<HttpResponse> {
        self.request(HttpRequest {
            method: Method::Put,
            path: path.to_string(),
            params: None,
            data,
            meta,
        })
        .await
    }

    async fn patch(
        &self,
        path: &str,
        data: Option<Value>,
        meta: RequestMeta,
    ) -> Result<HttpResponse> {
        self.request(HttpRequest {
            method: Method::Patch,
            path: path.to_string(),
            params: None,
            data,
            meta,
        })
        .await
    }

    async fn delete(
        &self,
        path: &str,
        data: Option<Value>,
        meta: RequestMeta,
    ) -> Result<HttpResponse> {
        self.request(HttpRequest {
            method: Method::Delete,
            path: path.to_string(),
            params: None,
            data,
            meta,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Patch.as_str(), "PATCH");
    }

    #[test]
    fn default_meta_is_json() {
        let meta = RequestMeta::default();
        assert_eq!(meta.encoding, Encoding::Json);
        assert!(meta.headers.is_empty());
        assert!(meta.files.is_empty());
    }
}
