//! Suppresses all reporting in configured environments.

use crate::{FiltersConfig, IgnoreReason};

/// Checks if reporting is suppressed in the current environment.
pub fn matches(current_env: &str, config: &FiltersConfig) -> bool {
    config.ignored_environments.contains(current_env)
}

/// Filters everything happening in an ignored environment.
pub fn should_filter(current_env: &str, config: &FiltersConfig) -> Result<(), IgnoreReason> {
    if matches(current_env, config) {
        return Err(IgnoreReason::Environment);
    }

    Ok(())
}
