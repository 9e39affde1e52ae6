//! Configuration for railflux.
//!
//! A [`Config`] is usually loaded once at startup from a YAML or JSON file with
//! [`Config::from_path`]. Every option has a default, so an empty file is a valid
//! configuration. The tags middleware can only be set programmatically through
//! [`Config::with_tags_middleware`].
#![warn(missing_docs)]

mod client;
mod config;
mod middleware;

pub use crate::client::*;
pub use crate::config::*;
pub use crate::middleware::*;
