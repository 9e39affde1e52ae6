use std::fmt;

use serde::{Deserialize, Deserializer};

/// Identifies which rule suppressed reporting, and why.
///
/// The string form is kebab-case (e.g. `user-agent`), matching the names used in diagnostic log
/// lines.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum IgnoreReason {
    /// Reporting is suppressed in the current environment.
    Environment,

    /// The exception class, or one of its ancestors, is ignored by configuration.
    ExceptionClass(String),

    /// The exception is a built-in "not found" exception.
    NotFound,

    /// The request's user agent is ignored.
    UserAgent,

    /// The instrumentation hook is ignored.
    Hook,
}

impl IgnoreReason {
    /// Returns the string identifier of the reason.
    pub fn name(&self) -> String {
        match self {
            IgnoreReason::Environment => "environment".to_owned(),
            IgnoreReason::ExceptionClass(class) => format!("exception@{class}"),
            IgnoreReason::NotFound => "not-found".to_owned(),
            IgnoreReason::UserAgent => "user-agent".to_owned(),
            IgnoreReason::Hook => "hook".to_owned(),
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Deserializes `null` into the default value of the field.
///
/// Configuration files occasionally contain an explicit empty key, which must not fail loading
/// nor fall back to the non-empty defaults.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_names() {
        assert_eq!(IgnoreReason::Environment.to_string(), "environment");
        assert_eq!(
            IgnoreReason::ExceptionClass("DummyException".to_owned()).to_string(),
            "exception@DummyException"
        );
        assert_eq!(IgnoreReason::UserAgent.to_string(), "user-agent");
    }
}
