//! # LWES Telemetry
//!
//! Logging initialisation and listener metrics.

pub mod logging;
pub mod metrics;

pub use metrics::MetricsRecorder;
