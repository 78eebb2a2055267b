#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Latency prober for blockchain RPC endpoints.
//!
//! Each invocation runs one probe cycle: it fans out timed HTTP and
//! WebSocket probes against every configured provider of a blockchain,
//! turns every outcome into a labeled metric sample, and pushes the
//! resulting batch to a remote time-series backend.

pub mod config;
pub mod endpoints;
pub mod metrics;
pub mod probe;
pub mod sample;
pub mod service;
pub mod sink;
pub mod tasks;
pub mod test_utils;

pub use config::ProberConfig;
pub use endpoints::{EndpointDescriptor, EndpointRegistry, Transport};
pub use probe::ProbeOutcome;
pub use sample::{MetricSample, ProbeBatch};
