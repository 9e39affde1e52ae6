//! Implements the ignore rules.
//!
//! Reporting may be suppressed based on the following configurable criteria:
//!
//! * environments (suppress all reporting in e.g. `test` or `development`)
//! * exceptions (never report exceptions of a class or its subclasses, plus the built-in
//!   "not found" exceptions)
//! * user agents (never report failures of requests from e.g. crawlers)
//! * hooks (never shape events of an instrumentation hook into points)
//!
//! All rules are pure functions of the configuration and their input. Each rule module exposes a
//! `matches` predicate and a `should_filter` function, which returns the [`IgnoreReason`] when
//! the input is ignorable.
#![warn(missing_docs)]

use railflux_protocol::ExceptionInfo;

pub mod environments;
pub mod exceptions;
pub mod hooks;
pub mod user_agents;

mod common;
mod config;

pub use crate::common::*;
pub use crate::config::*;

/// Returns `true` if reporting is suppressed in the current environment.
pub fn ignorable_environment(config: &FiltersConfig, current_env: &str) -> bool {
    environments::matches(current_env, config)
}

/// Returns `true` if the exception's class, or one of its ancestors, is never reported.
pub fn ignorable_exception(config: &FiltersConfig, exception: &ExceptionInfo) -> bool {
    exceptions::matches(exception, config).is_some()
}

/// Returns `true` if failures of requests from this user agent are never reported.
///
/// An absent or empty user agent is never ignorable, and neither is any user agent when no
/// ignored user agents are configured.
pub fn ignorable_user_agent(config: &FiltersConfig, user_agent: Option<&str>) -> bool {
    user_agents::matches(user_agent, config)
}

/// Returns `true` if events of this hook are never shaped into points.
pub fn ignorable_hook(config: &FiltersConfig, hook: &str) -> bool {
    hooks::matches(hook, config)
}

/// Checks whether an exception raised in the given environment should be reported.
///
/// If the exception should be ignored, the `Err` returned contains the reason of the first rule
/// that matched.
pub fn should_filter_exception(
    config: &FiltersConfig,
    exception: &ExceptionInfo,
    current_env: &str,
) -> Result<(), IgnoreReason> {
    environments::should_filter(current_env, config)?;
    exceptions::should_filter(exception, config)?;

    Ok(())
}

/// Returns `true` if an exception raised in the given environment should be reported.
pub fn should_report_exception(
    config: &FiltersConfig,
    exception: &ExceptionInfo,
    current_env: &str,
) -> bool {
    should_filter_exception(config, exception, current_env).is_ok()
}
