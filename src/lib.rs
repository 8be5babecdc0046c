//! Centralized sampling engine for a distributed-tracing client library.
//!
//! [`CentralizedStrategy`] serves `should_trace` against a manifest kept
//! fresh by two background pollers talking to a local control-plane
//! daemon, falling back to a statically configured [`LocalizedStrategy`]
//! when the manifest is stale or unreachable.

pub mod central_reservoir;
pub mod centralized;
pub mod client;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod error;
pub mod loader;
pub mod localized;
pub mod manifest;
pub mod request;
pub mod reservoir;
pub mod rule;
pub mod wildcard;
pub mod wire;

pub use centralized::CentralizedStrategy;
pub use config::{SamplingArgs, SamplingConfig};
pub use error::{SamplingError, SamplingResult};
pub use localized::{LocalManifest, LocalizedStrategy};
pub use request::{Decision, Request};
