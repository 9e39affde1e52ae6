//! Guards that report the errors of fallible closures.

use std::error::Error;

use railflux_protocol::{ExceptionInfo, RequestEnv};

use crate::Reporter;

impl Reporter {
    /// Runs `f` and reports its error instead of returning it.
    ///
    /// Returns `Ok(Some(value))` on success. On failure, the error is reported unless ignorable
    /// and `Ok(None)` is returned. In an ignored environment, nothing is reported and the error
    /// is returned unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use railflux::Reporter;
    /// use railflux_config::Config;
    /// use railflux_test::CapturingClient;
    ///
    /// let reporter = Reporter::new(Config::default(), CapturingClient::new());
    /// let parsed = reporter.protect(|| "42".parse::<u32>());
    ///
    /// assert_eq!(parsed, Ok(Some(42)));
    /// ```
    pub fn protect<T, E, F>(&self, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error,
    {
        let error = match f() {
            Ok(value) => return Ok(Some(value)),
            Err(error) => error,
        };

        if self.config().ignorable_environment() {
            return Err(error);
        }

        let exception = ExceptionInfo::from_error(&error);
        self.report_exception_unless_ignorable(&exception, &RequestEnv::default());
        Ok(None)
    }

    /// Runs `f` and reports its error before returning it.
    ///
    /// The error is reported unless ignorable, and always returned unchanged.
    pub fn protect_and_raise<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error,
    {
        f().map_err(|error| {
            let exception = ExceptionInfo::from_error(&error);
            self.report_exception_unless_ignorable(&exception, &RequestEnv::default());
            error
        })
    }
}
