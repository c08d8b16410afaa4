use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire encoding of a request or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Json,
    FormUrlEncoded,
    #[serde(rename = "multipart-form")]
    Multipart,
}

impl Encoding {
    /// Resolve an encoding from a `Content-Type` header value, ignoring
    /// parameters such as `; charset=utf-8`. Unknown types yield `None` so
    /// the caller can decide whether that is an error.
    pub fn from_content_type(value: &str) -> Option<Encoding> {
        let mime = value.split(';').next().unwrap_or("").trim();
        match mime {
            "application/json" => Some(Encoding::Json),
            "application/x-www-form-urlencoded" => Some(Encoding::FormUrlEncoded),
            "multipart/form-data" => Some(Encoding::Multipart),
            _ => None,
        }
    }

    /// The `Content-Type` header value to send for this encoding.
    pub fn content_type(self) -> &'static str {
        match self {
            Encoding::Json => "application/json",
            Encoding::FormUrlEncoded => "application/x-www-form-urlencoded",
            Encoding::Multipart => "multipart/form-data",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_type())
    }
}
