//! Constants shared across the railflux crates.

/// Location reported for code paths outside of a named controller action.
///
/// Background jobs and raw middleware still produce telemetry, tagged with this placeholder.
pub const DEFAULT_LOCATION: &str = "raw";

/// Fixed prefix of every diagnostic log line emitted by the reporter.
pub const LOG_PREFIX: &str = "[railflux]";

/// Maximum number of characters of a serialized exception that end up in the diagnostic log.
pub const MAX_LOG_PREVIEW: usize = 512;
