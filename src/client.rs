//! Explanation broker: the public entry point of the crate.
//!
//! Keep the public surface small and predictable. Implementation details are
//! split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod retry;
pub mod upstream;

pub use builder::BrokerBuilder;
pub use core::Broker;
pub use retry::RetryPolicy;
pub use upstream::HttpUpstream;
