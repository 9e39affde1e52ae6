//! The data model of railflux.
//!
//! Lifecycle [`Event`]s fired by the host framework are shaped into [`MetricPoint`]s. Failures
//! are described by an [`ExceptionInfo`], together with the [`RequestEnv`] of the request that
//! raised them. Points leave the process through a [`MetricsClient`].
#![warn(missing_docs)]

mod client;
mod event;
mod exception;
mod point;
mod request;

pub use crate::client::*;
pub use crate::event::*;
pub use crate::exception::*;
pub use crate::point::*;
pub use crate::request::*;
