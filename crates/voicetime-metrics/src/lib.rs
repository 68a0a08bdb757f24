//! # voicetime-metrics
//!
//! Prometheus implementation of the [`voicetime_core::traits::MetricsSink`]
//! contract and the HTTP endpoint that exposes it.

pub mod exporter;
pub mod sink;

pub use exporter::MetricsExporter;
pub use sink::PrometheusSink;
