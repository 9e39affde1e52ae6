//! Config structs for all ignore rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::common::null_as_default;

/// Configuration for all ignore rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Environments in which reporting is fully suppressed.
    #[serde(deserialize_with = "null_as_default")]
    pub ignored_environments: BTreeSet<String>,

    /// Exception class names that are never reported.
    ///
    /// Matches the class itself and every class inheriting from it.
    #[serde(deserialize_with = "null_as_default")]
    pub ignored_exceptions: BTreeSet<String>,

    /// User agent substrings whose requests are never reported.
    #[serde(deserialize_with = "null_as_default")]
    pub ignored_user_agents: Vec<String>,

    /// Instrumentation hooks that are never shaped into points.
    #[serde(deserialize_with = "null_as_default")]
    pub ignored_hooks: BTreeSet<String>,
}

impl FiltersConfig {
    /// Returns a configuration that ignores nothing except the built-in exceptions.
    pub fn empty() -> Self {
        Self {
            ignored_environments: BTreeSet::new(),
            ignored_exceptions: BTreeSet::new(),
            ignored_user_agents: Vec::new(),
            ignored_hooks: BTreeSet::new(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            ignored_environments: ["development", "test"].map(str::to_owned).into(),
            ignored_user_agents: vec!["GoogleBot".to_owned()],
            ..Self::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        insta::assert_json_snapshot!(FiltersConfig::default(), @r###"
        {
          "ignored_environments": [
            "development",
            "test"
          ],
          "ignored_exceptions": [],
          "ignored_user_agents": [
            "GoogleBot"
          ],
          "ignored_hooks": []
        }
        "###);
    }

    #[test]
    fn test_null_user_agents() {
        let config: FiltersConfig =
            serde_yaml::from_str("ignored_user_agents: ~\nignored_hooks:\n  - sql.active_record\n")
                .unwrap();

        assert!(config.ignored_user_agents.is_empty());
        assert!(config.ignored_hooks.contains("sql.active_record"));
        assert_eq!(
            config.ignored_environments,
            FiltersConfig::default().ignored_environments
        );
    }
}
