//! HTTP transport backed by reqwest.

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use reqwest::multipart;
use tracing::{debug, trace};

use fedikit_core::serializer::{self, Body, FormValue};
use fedikit_core::{link, Encoding, Error, Result};

use crate::config::ClientConfig;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Transport(format!("failed to build http client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder> {
        let url = self.config.resolve(&request.path, request.params.as_ref())?;
        let mut headers = self
            .config
            .merge_headers(request.meta.encoding, &request.meta.headers)?;

        debug!(method = request.method.as_str(), url = %url, "dispatching request");

        let mut builder = self.client.request(convert_method(request.method), url);

        match serializer::serialize(request.meta.encoding, request.data.as_ref()) {
            Some(Body::Text { content, .. }) => {
                trace!(body = %content, "request body");
                builder = builder.body(content);
            }
            Some(Body::Form(fields)) => {
                let mut form = multipart::Form::new();
                for field in fields {
                    form = match field.value {
                        FormValue::Text(text) => form.text(field.name, text),
                        FormValue::File(file) => {
                            form.part(field.name, file_part(file)?)
                        }
                    };
                }
                for (name, file) in request.meta.files.clone() {
                    form = form.part(name, file_part(file)?);
                }
                // reqwest picks the multipart boundary itself.
                headers.remove(CONTENT_TYPE);
                builder = builder.multipart(form);
            }
            None => {
                if request.meta.encoding == Encoding::Multipart
                    && !request.meta.files.is_empty()
                {
                    let mut form = multipart::Form::new();
                    for (name, file) in request.meta.files.clone() {
                        form = form.part(name, file_part(file)?);
                    }
                    headers.remove(CONTENT_TYPE);
                    builder = builder.multipart(form);
                }
            }
        }

        Ok(builder.headers(headers))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .build(&request)?
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let next = response
            .headers()
            .get("link")
            .and_then(|value| value.to_str().ok())
            .and_then(link::next_url);

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        // Absent Content-Type defaults to JSON; anything unrecognized is a
        // deserialization error carrying the raw payload.
        let encoding = match content_type {
            None => Encoding::Json,
            Some(value) => {
                Encoding::from_content_type(&value).ok_or_else(|| Error::Deserialize {
                    content_type: value,
                    raw: text.clone(),
                })?
            }
        };

        let data = serializer::deserialize(encoding, &text)?;
        trace!(status, has_body = data.is_some(), "response received");

        Ok(HttpResponse { status, data, next })
    }
}

fn convert_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn file_part(file: fedikit_core::FileSource) -> Result<multipart::Part> {
    let mut part = multipart::Part::stream(reqwest::Body::from(file.data));
    if let Some(name) = file.file_name {
        part = part.file_name(name);
    }
    if let Some(content_type) = file.content_type {
        part = part
            .mime_str(&content_type)
            .map_err(|e| Error::Transport(format!("invalid mime type: {e}")))?;
    }
    Ok(part)
}

/// Error responses follow the `{"error": ..., "error_description": ...}`
/// convention; rate limiting additionally reports `X-RateLimit-*` headers.
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    let limit = header("X-RateLimit-Limit").and_then(|v| v.parse().ok());
    let remaining = header("X-RateLimit-Remaining").and_then(|v| v.parse().ok());
    let reset = header("X-RateLimit-Reset");

    let message = match response.text().await {
        Ok(text) => serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| {
                body.get("error")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| format!("HTTP {status}")),
        Err(_) => format!("HTTP {status}"),
    };

    if status == 429 {
        return Error::RateLimit {
            message,
            limit,
            remaining,
            reset,
        };
    }

    Error::from_status(status, message)
}
