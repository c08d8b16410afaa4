//! Caller-facing surface of the fedikit client: the fluent request
//! dispatcher, cursor-based pagination over `Link` continuation headers,
//! and the multiplexed streaming subscription client.
//!
//! The per-resource method catalogs (hundreds of thin wrappers such as
//! "follow an account") are deliberately not part of this crate; they are
//! built on top of [`RequestBuilder`].

pub mod builder;
pub mod client;
pub mod media;
pub mod paginator;
pub mod streaming;

pub use builder::{Action, RequestBuilder, RequestOptions};
pub use client::Client;
pub use media::{wait_for_media_attachment, WaitForOptions};
pub use paginator::Paginator;
pub use streaming::{StreamingClient, Subscription};
