//! Prometheus exporter for Typesense cluster diagnostics.
//!
//! Polls a Typesense node's `metrics.json` and `stats.json` diagnostic
//! documents and republishes a fixed set of numeric fields as Prometheus
//! gauges on a pull-based `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Typesense API  │────>│    Collector    │────>│   HTTP Server   │
//! │  (*.json docs)  │     │  (fetch + map)  │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! One collection cycle runs per scrape, serialized by the collector's
//! cycle guard; there is no metric storage between scrapes, so every value
//! is an instantaneous gauge as reported by upstream.
//!
//! # Configuration
//!
//! See [`config::Config`] for the environment variable surface.

pub mod collector;
pub mod config;
pub mod descriptors;
pub mod http;
pub mod mapping;

pub use collector::{SharedCollector, Target, TypesenseCollector};
pub use config::Config;
pub use http::HttpServer;
pub use mapping::Sample;
