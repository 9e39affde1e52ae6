//! Suppresses exceptions by class name or ancestry.

use railflux_protocol::ExceptionInfo;

use crate::{FiltersConfig, IgnoreReason};

/// Returns the reason if the exception is ignorable.
///
/// Built-in "not found" exceptions are matched even without configuration. Otherwise, the class
/// name and every ancestor class name are looked up in the configured set.
pub fn matches(exception: &ExceptionInfo, config: &FiltersConfig) -> Option<IgnoreReason> {
    if exception.kind().is_not_found() {
        return Some(IgnoreReason::NotFound);
    }

    std::iter::once(exception.class_name())
        .chain(exception.ancestors().iter().map(String::as_str))
        .find(|class| config.ignored_exceptions.contains(*class))
        .map(|class| IgnoreReason::ExceptionClass(class.to_owned()))
}

/// Filters exceptions of ignored classes.
pub fn should_filter(exception: &ExceptionInfo, config: &FiltersConfig) -> Result<(), IgnoreReason> {
    match matches(exception, config) {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(classes: &[&str]) -> FiltersConfig {
        FiltersConfig {
            ignored_exceptions: classes.iter().map(|c| (*c).to_owned()).collect(),
            ..FiltersConfig::empty()
        }
    }

    #[test]
    fn test_configured_class() {
        let exception = ExceptionInfo::new("DummyException");
        assert_eq!(
            should_filter(&exception, &config(&["DummyException"])),
            Err(IgnoreReason::ExceptionClass("DummyException".to_owned()))
        );
    }

    #[test]
    fn test_configured_ancestor() {
        let exception = ExceptionInfo::new("Payments::CardDeclined")
            .with_ancestors(["Payments::Error", "StandardError"]);

        assert_eq!(
            matches(&exception, &config(&["Payments::Error"])),
            Some(IgnoreReason::ExceptionClass("Payments::Error".to_owned()))
        );
    }

    #[test]
    fn test_builtin_without_configuration() {
        let exception = ExceptionInfo::new("ActiveRecord::RecordNotFound");
        assert_eq!(matches(&exception, &config(&[])), Some(IgnoreReason::NotFound));
    }

    #[test]
    fn test_valid_exception() {
        let exception = ExceptionInfo::new("ZeroDivisionError");
        assert_eq!(should_filter(&exception, &config(&["DummyException"])), Ok(()));
    }

    #[test]
    fn test_no_partial_class_match() {
        let exception = ExceptionInfo::new("DummyExceptionSubtype");
        assert_eq!(matches(&exception, &config(&["DummyException"])), None);
    }
}
