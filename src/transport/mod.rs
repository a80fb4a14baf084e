//! HTTP transport for the upstream provider.

mod http;

pub use http::HttpTransport;
