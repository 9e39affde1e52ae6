//! Suppresses exceptions of requests made by ignored user agents, such as crawlers.

use crate::{FiltersConfig, IgnoreReason};

/// Checks if the user agent contains any of the configured substrings.
///
/// Matching is case-sensitive. An absent or empty user agent never matches.
pub fn matches(user_agent: Option<&str>, config: &FiltersConfig) -> bool {
    let Some(user_agent) = user_agent.filter(|ua| !ua.is_empty()) else {
        return false;
    };

    config
        .ignored_user_agents
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| user_agent.contains(pattern.as_str()))
}

/// Filters requests originating from an ignored user agent.
pub fn should_filter(user_agent: Option<&str>, config: &FiltersConfig) -> Result<(), IgnoreReason> {
    if matches(user_agent, config) {
        return Err(IgnoreReason::UserAgent);
    }

    Ok(())
}
