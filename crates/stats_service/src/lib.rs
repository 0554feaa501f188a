//! RustMiskoLive Stats: service layer
//!
//! Wires an `Extractor`, the aggregation core and the caches into the
//! report operations the CLI (or any API front) calls.

pub mod config;
pub mod service;

pub use config::StatsConfig;
pub use service::{PlayerMapReport, ServiceCaches, StatsService};
