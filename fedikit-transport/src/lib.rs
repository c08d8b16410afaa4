//! Transport layer for the fedikit client: explicit client configuration,
//! the [`HttpTransport`] seam with its reqwest implementation, and the
//! WebSocket connector used by the streaming multiplexer.

pub mod config;
pub mod http;
pub mod transport;
pub mod websocket;

pub use config::ClientConfig;
pub use http::ReqwestTransport;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestMeta};
pub use websocket::{StreamingConnector, TungsteniteConnector, WsConnection, WsOutbound};
