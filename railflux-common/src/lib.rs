//! Common functionality for railflux.
#![warn(missing_docs)]

mod constants;
mod time;

pub use crate::constants::*;
pub use crate::time::*;
