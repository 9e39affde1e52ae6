//! Disables instrumentation hooks.

use crate::{FiltersConfig, IgnoreReason};

/// Checks if events of the hook are never shaped into points.
pub fn matches(hook: &str, config: &FiltersConfig) -> bool {
    config.ignored_hooks.contains(hook)
}

/// Filters events of ignored hooks.
pub fn should_filter(hook: &str, config: &FiltersConfig) -> Result<(), IgnoreReason> {
    if matches(hook, config) {
        return Err(IgnoreReason::Hook);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_hook() {
        let config = FiltersConfig {
            ignored_hooks: ["sql.active_record".to_owned()].into(),
            ..FiltersConfig::empty()
        };

        assert_eq!(should_filter("sql.active_record", &config), Err(IgnoreReason::Hook));
        assert_eq!(should_filter("render_template.action_view", &config), Ok(()));
    }

    #[test]
    fn test_no_hooks_by_default() {
        assert!(!matches("sql.active_record", &FiltersConfig::default()));
    }
}
