//! Adapter implementations for run-state synchronisation ports.

pub mod memory;
mod tracing_sink;

pub use tracing_sink::TracingReportSink;
