//! Core protocol logic for the fedikit client: key transcoding between the
//! caller and wire naming conventions, body serialization for the three
//! wire encodings, continuation-link parsing and the streaming event model.
//!
//! Everything here is pure and I/O-free; the transports live in
//! `fedikit-transport` and the caller-facing surface in `fedikit-client`.

pub mod case;
pub mod encoding;
pub mod error;
pub mod event;
pub mod link;
pub mod query;
pub mod serializer;

pub use case::{camel_case, snake_case, transform_keys};
pub use encoding::Encoding;
pub use error::{Error, Result};
pub use event::{Event, EventPayload, RawEvent, StreamCommand};
pub use serializer::{Body, FileSource, FormField, FormValue};
