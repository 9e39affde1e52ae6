//! Turns request lifecycle events and exceptions into time-series metric points.
//!
//! railflux is embedded in a request-serving application. The host fires lifecycle events for
//! processed requests, rendered views and database queries, which the [`Reporter`] shapes into
//! points and hands to a [`MetricsClient`]. Failures are reported as points of the
//! `exceptions` measurement, together with the location and request they occurred in.
//!
//! Reporting never fails the request: errors of the pipeline itself are logged through
//! [`railflux_log`] and swallowed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use railflux::{RequestMiddleware, Reporter};
//! use railflux_config::Config;
//! use railflux_protocol::RequestEnv;
//! use railflux_test::CapturingClient;
//!
//! let client = CapturingClient::new();
//! let reporter = Arc::new(Reporter::new(Config::default(), client.clone()));
//! let middleware = RequestMiddleware::new(reporter.clone());
//!
//! let response = middleware.call(RequestEnv::default(), || "ok".parse::<bool>());
//!
//! assert!(response.is_err());
//! reporter.shutdown();
//! ```
#![warn(missing_docs)]

pub mod context;
pub mod shapers;

mod guard;
mod middleware;
mod presenter;
mod reporter;

pub use railflux_protocol::{MetricsClient, TransportError};

pub use crate::middleware::*;
pub use crate::presenter::*;
pub use crate::reporter::*;

/// Installs the log subscriber configured in `config.logging`.
///
/// Hosts that set up their own `tracing` subscriber should not call this.
pub fn init_logging(config: &railflux_config::Config) {
    railflux_log::init(&config.logging);
}
