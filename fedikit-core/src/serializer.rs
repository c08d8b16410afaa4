//! Body serialization between the caller's data model and the three wire
//! encodings, with key transcoding applied in both directions.

use bytes::Bytes;
use serde_json::Value;

use crate::case::{camel_case, snake_case, transform_keys};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::query;

/// A serialized request body, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A textual body with a fixed content type (JSON or form-urlencoded).
    Text {
        content_type: &'static str,
        content: String,
    },
    /// A multipart form. The transport is responsible for choosing the
    /// boundary, so no content type is carried here.
    Form(Vec<FormField>),
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(FileSource),
}

/// A binary attachment destined for a multipart field.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSource {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl FileSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Serialize `data` for the wire. Keys are renamed to snake_case first,
/// including nested objects and array elements. `None` data produces no
/// body. Binary attachments for multipart requests are appended by the
/// caller via [`Body::Form`] fields; the structured part of the payload is
/// flattened to bracketed text fields here.
pub fn serialize(encoding: Encoding, data: Option<&Value>) -> Option<Body> {
    let data = data?;
    if data.is_null() {
        return None;
    }

    let data = transform_keys(data.clone(), snake_case);

    match encoding {
        Encoding::Json => Some(Body::Text {
            content_type: Encoding::Json.content_type(),
            content: data.to_string(),
        }),
        Encoding::FormUrlEncoded => Some(Body::Text {
            content_type: Encoding::FormUrlEncoded.content_type(),
            content: query::stringify(&data),
        }),
        Encoding::Multipart => {
            let fields = query::flatten(&data)
                .into_iter()
                .map(|(name, value)| FormField {
                    name,
                    value: FormValue::Text(value),
                })
                .collect();
            Some(Body::Form(fields))
        }
    }
}

/// Deserialize a response body.
///
/// JSON bodies are parsed and renamed to camelCase. A body that fails JSON
/// parsing is treated as absent data (`Ok(None)`) to accommodate empty-body
/// success responses. Any non-JSON encoding is an error carrying the
/// offending type and raw payload.
pub fn deserialize(encoding: Encoding, raw: &str) -> Result<Option<Value>> {
    match encoding {
        Encoding::Json => match serde_json::from_str::<Value>(raw) {
            Ok(value) => Ok(Some(transform_keys(value, camel_case))),
            Err(_) => Ok(None),
        },
        other => Err(Error::Deserialize {
            content_type: other.content_type().to_string(),
            raw: raw.to_string(),
        }),
    }
}
