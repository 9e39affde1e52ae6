use std::error::Error;
use std::fmt;

/// Returns `true` if backtrace printing is enabled.
///
/// # Example
///
/// ```
/// std::env::set_var("RUST_BACKTRACE", "full");
/// assert!(railflux_log::backtrace_enabled());
/// ```
pub fn backtrace_enabled() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_ref().map(String::as_str),
        Ok("1") | Ok("full")
    )
}

/// Logs an error to the configured logger or `stderr` if no subscriber is interested.
///
/// Prefer to use [`railflux_log::error`](crate::error) over this function whenever possible.
/// This function is intended for configuration loading, where errors may occur before the host
/// has installed a subscriber.
///
/// # Example
///
/// ```
/// if let Err(error) = std::env::var("FOO") {
///     railflux_log::ensure_error(&error);
/// }
/// ```
#[allow(clippy::print_stderr)]
pub fn ensure_error<E: Error + ?Sized>(error: &E) {
    if tracing::enabled!(tracing::Level::ERROR) {
        crate::error!("{}", LogError(error));
    } else {
        eprintln!("error: {}", LogError(error));
    }
}

/// A wrapper around an [`Error`] that prints its causes.
///
/// # Example
///
/// ```
/// use railflux_log::LogError;
///
/// if let Err(error) = std::env::var("FOO") {
///     railflux_log::error!("env failed: {}", LogError(&error));
/// }
/// ```
pub struct LogError<'a, E: Error + ?Sized>(pub &'a E);

impl<E: Error + ?Sized> fmt::Display for LogError<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut source = self.0.source();
        while let Some(s) = source {
            write!(f, "\n  caused by: {s}")?;
            source = s.source();
        }

        Ok(())
    }
}

/// Truncates a string to at most `max_chars` characters, respecting UTF-8 boundaries.
///
/// # Example
///
/// ```
/// assert_eq!(railflux_log::truncate("héllo", 2), "hé");
/// assert_eq!(railflux_log::truncate("hi", 10), "hi");
/// ```
pub fn truncate(string: &str, max_chars: usize) -> &str {
    match string.char_indices().nth(max_chars) {
        Some((index, _)) => &string[..index],
        None => string,
    }
}
