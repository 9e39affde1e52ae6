//! Logging facade for railflux.
//!
//! # Setup
//!
//! To enable logging, invoke the [`init`] function with a [`LogConfig`]. The configuration
//! implements `serde` traits, so it can be embedded in configuration files. Hosts that install
//! their own `tracing` subscriber can skip this step entirely; every railflux crate only emits
//! through the `tracing` macros.
//!
//! ```
//! # #[cfg(feature = "init")] {
//! use railflux_log::LogConfig;
//!
//! let log_config = LogConfig {
//!     enable_backtraces: true,
//!     ..LogConfig::default()
//! };
//!
//! railflux_log::init(&log_config);
//! # }
//! ```
//!
//! # Logging
//!
//! The basic use is through the five logging macros: [`error!`], [`warn!`], [`info!`],
//! [`debug!`] and [`trace!`], where `error!` represents the highest-priority log messages and
//! `trace!` the lowest.
//!
//! ## Conventions
//!
//! Log messages should start lowercase and end without punctuation. Prefer short and precise log
//! messages over verbose text. Choose the log level according to these rules:
//!
//! - [`error!`] for failures of the telemetry pipeline itself, e.g. a point that could not be
//!   written.
//! - [`warn!`] for undesirable behavior.
//! - [`info!`] for diagnostic lines about reported exceptions.
//! - [`debug!`] for messages usually relevant to debugging.
//! - [`trace!`] for full auxiliary information.
//!
//! ## Logging Error Types
//!
//! To log errors with all their causes, use the [`LogError`] wrapper.
//!
//! ```
//! use std::io::{Error, ErrorKind};
//! use railflux_log::LogError;
//!
//! let custom_error = Error::new(ErrorKind::Other, "oh no!");
//! railflux_log::error!("operation failed: {}", LogError(&custom_error));
//! ```
//!
//! # Testing
//!
//! For unit testing, there is a separate initialization macro [`init_test!`] that should be
//! called at the beginning of a test. It captures logs of the calling crate on the test writer.
//!
//! ```
//! # #[cfg(feature = "test")]
//! #[test]
//! fn test_something() {
//!     railflux_log::init_test!();
//! }
//! ```

#![warn(missing_docs)]

#[cfg(feature = "init")]
mod setup;
#[cfg(feature = "init")]
pub use setup::*;

#[cfg(feature = "test")]
pub use test::*;

mod config;
pub use config::*;

mod utils;
pub use utils::*;

// Expose the minimal log facade.
#[doc(inline)]
pub use tracing::{debug, error, info, trace, warn};
