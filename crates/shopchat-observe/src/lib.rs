//! Observability setup for Shopchat: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
