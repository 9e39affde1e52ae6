use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Matches frames in the `file:line:in `function`` notation used by most host frameworks.
static FRAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<file>.+?):(?P<line>\d+)(?::in [`'](?P<function>.*)['`])?$").unwrap()
});

/// A known class of exceptions.
///
/// Exceptions are identified by their class name. Some classes have a dedicated kind, since
/// they carry meaning beyond their name (see [`ExceptionKind::is_not_found`]). All others are
/// [`ExceptionKind::Custom`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ExceptionKind {
    /// No route matched the requested path.
    RoutingError,
    /// A record looked up by its identifier does not exist.
    RecordNotFound,
    /// Any other exception, identified by its class name.
    Custom(String),
}

impl ExceptionKind {
    /// Classifies an exception by its class name.
    ///
    /// Namespaces are ignored, so `ActionController::RoutingError` and `app::RoutingError` are
    /// both routing errors.
    pub fn from_class_name(class_name: &str) -> Self {
        let short = class_name.rsplit("::").next().unwrap_or(class_name);
        match short {
            "RoutingError" => Self::RoutingError,
            "RecordNotFound" => Self::RecordNotFound,
            _ => Self::Custom(class_name.to_owned()),
        }
    }

    /// Returns `true` for "not found" style exceptions, which are expected traffic noise rather
    /// than application failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RoutingError | Self::RecordNotFound)
    }
}

/// A single frame of a backtrace.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Frame {
    /// The function or method name.
    pub function: String,
    /// The source file, if known.
    pub filename: Option<String>,
    /// The line within the source file, if known.
    pub lineno: Option<u32>,
}

impl Frame {
    /// Creates a frame for a function without source location.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            filename: None,
            lineno: None,
        }
    }

    /// Parses a frame in the `file:line:in `function`` notation.
    ///
    /// Lines that do not follow the notation become a frame with only a function name.
    ///
    /// # Example
    ///
    /// ```
    /// use railflux_protocol::Frame;
    ///
    /// let frame = Frame::parse("app/models/post.rb:12:in `save'");
    /// assert_eq!(frame.filename.as_deref(), Some("app/models/post.rb"));
    /// assert_eq!(frame.lineno, Some(12));
    /// assert_eq!(frame.function, "save");
    /// ```
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(captures) = FRAME_REGEX.captures(line) else {
            return Self::new(line);
        };

        Self {
            function: captures
                .name("function")
                .map_or("", |m| m.as_str())
                .to_owned(),
            filename: Some(captures["file"].to_owned()),
            lineno: captures["line"].parse().ok(),
        }
    }

    /// Captures the frames of the current thread.
    ///
    /// Returns no frames unless backtraces are enabled through `RUST_BACKTRACE` or
    /// `RUST_LIB_BACKTRACE`.
    pub fn capture() -> Vec<Self> {
        let backtrace = Backtrace::capture();
        if backtrace.status() != BacktraceStatus::Captured {
            return Vec::new();
        }

        Self::parse_backtrace(&backtrace.to_string())
    }

    /// Parses the textual form of a Rust backtrace.
    ///
    /// Each frame is a numbered line with the symbol name, optionally followed by an `at` line
    /// with the source location.
    pub fn parse_backtrace(text: &str) -> Vec<Self> {
        let mut frames: Vec<Self> = Vec::new();

        for line in text.lines().map(str::trim) {
            if let Some(location) = line.strip_prefix("at ") {
                let Some(frame) = frames.last_mut() else {
                    continue;
                };

                // Locations are `path:line:column`, where the path may contain colons itself.
                let mut parts = location.rsplitn(3, ':');
                let _column = parts.next();
                let lineno = parts.next().and_then(|l| l.parse().ok());
                if let Some(path) = parts.next() {
                    frame.filename = Some(path.to_owned());
                    frame.lineno = lineno;
                }
            } else if let Some((index, symbol)) = line.split_once(": ") {
                if index.chars().all(|c| c.is_ascii_digit()) {
                    frames.push(Self::new(symbol));
                }
            }
        }

        frames
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.filename, self.lineno) {
            (Some(filename), Some(lineno)) => {
                write!(f, "{filename}:{lineno}:in `{}`", self.function)
            }
            (Some(filename), None) => write!(f, "{filename}:in `{}`", self.function),
            _ => f.write_str(&self.function),
        }
    }
}

/// Describes a failure to report.
///
/// Built either from a Rust [`Error`] through [`ExceptionInfo::from_error`], or from the parts
/// that the host framework knows about its own exception.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionInfo {
    class_name: String,
    message: Option<String>,
    ancestors: Vec<String>,
    frames: Vec<Frame>,
}

impl ExceptionInfo {
    /// Creates an exception of the given class without message or backtrace.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: None,
            ancestors: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Builds the exception from a Rust error.
    ///
    /// The class name is the type name of the error, the message its display output. Frames are
    /// captured at the time of this call, if backtraces are enabled.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        Self {
            class_name: std::any::type_name::<E>().to_owned(),
            message: Some(error.to_string()),
            ancestors: Vec::new(),
            frames: Frame::capture(),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the class names this exception's class inherits from, nearest first.
    #[must_use]
    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the backtrace.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    /// The class name of the exception.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The message, or an empty string if the exception has none.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// The class names this exception's class inherits from.
    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// The backtrace, innermost frame first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Classifies the exception by its class name and ancestry.
    ///
    /// The first dedicated kind found in the class or one of its ancestors wins.
    pub fn kind(&self) -> ExceptionKind {
        std::iter::once(&self.class_name)
            .chain(&self.ancestors)
            .map(|name| ExceptionKind::from_class_name(name))
            .find(|kind| !matches!(kind, ExceptionKind::Custom(_)))
            .unwrap_or_else(|| ExceptionKind::Custom(self.class_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_kind_from_class_name() {
        assert_eq!(
            ExceptionKind::from_class_name("ActionController::RoutingError"),
            ExceptionKind::RoutingError
        );
        assert_eq!(
            ExceptionKind::from_class_name("RecordNotFound"),
            ExceptionKind::RecordNotFound
        );
        assert_eq!(
            ExceptionKind::from_class_name("ZeroDivisionError"),
            ExceptionKind::Custom("ZeroDivisionError".to_owned())
        );
    }

    #[test]
    fn test_kind_from_ancestors() {
        let exception = ExceptionInfo::new("Api::MissingPage")
            .with_ancestors(["ActionController::RoutingError", "StandardError"]);
        assert_eq!(exception.kind(), ExceptionKind::RoutingError);
        assert!(exception.kind().is_not_found());
    }

    #[test]
    fn test_message_defaults_to_empty() {
        let exception = ExceptionInfo::new("ArgumentError");
        assert_eq!(exception.message(), "");
    }

    #[test]
    fn test_from_error() {
        let error = "x".parse::<u32>().unwrap_err();
        let exception = ExceptionInfo::from_error(&error);

        assert!(exception.class_name().ends_with("::ParseIntError"));
        assert_eq!(exception.message(), "invalid digit found in string");
    }

    #[test]
    fn test_parse_frame_without_function() {
        let frame = Frame::parse("lib/tasks/import.rake:7");
        assert_eq!(frame.filename.as_deref(), Some("lib/tasks/import.rake"));
        assert_eq!(frame.lineno, Some(7));
        assert_eq!(frame.function, "");
    }

    #[test]
    fn test_parse_frame_free_form() {
        let frame = Frame::parse("  <main>  ");
        assert_eq!(frame, Frame::new("<main>"));
    }

    #[test]
    fn test_parse_rust_backtrace() {
        let text = "   0: app::handlers::create_post
             at ./src/handlers.rs:42:9
   1: std::rt::lang_start
   2: main
             at C:\\app\\src\\main.rs:3:5";

        let frames = Frame::parse_backtrace(text);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].to_string(), "./src/handlers.rs:42:in `app::handlers::create_post`");
        assert_eq!(frames[1].to_string(), "std::rt::lang_start");
        assert_eq!(frames[2].filename.as_deref(), Some("C:\\app\\src\\main.rs"));
        assert_eq!(frames[2].lineno, Some(3));
    }
}
