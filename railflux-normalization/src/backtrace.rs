use std::borrow::Cow;

use railflux_protocol::Frame;

/// Replaces the absolute application root in file names.
pub const APP_ROOT_PLACEHOLDER: &str = "[APP_ROOT]";

/// Function prefixes of frames that belong to railflux or to backtrace capturing itself.
const INTERNAL_FUNCTION_PREFIXES: &[&str] = &[
    "railflux::",
    "railflux_",
    "<railflux::",
    "<railflux_",
    "std::backtrace",
    "std::backtrace_rs",
];

/// Path segments of source files that belong to railflux.
const INTERNAL_PATH_SEGMENTS: &[&str] = &["/railflux/src/", "/railflux-"];

/// Returns `true` for frames inside railflux that carry no information about the failure.
pub fn is_internal_frame(frame: &Frame) -> bool {
    if INTERNAL_FUNCTION_PREFIXES
        .iter()
        .any(|prefix| frame.function.starts_with(prefix))
    {
        return true;
    }

    frame.filename.as_deref().is_some_and(|filename| {
        INTERNAL_PATH_SEGMENTS
            .iter()
            .any(|segment| filename.contains(segment))
    })
}

/// Removes the application root from a path.
///
/// The root is replaced by `[APP_ROOT]` if `placeholder` is set, otherwise removed along with
/// the separating slash. Paths outside of the root are returned unchanged.
pub fn strip_application_root<'a>(
    path: &'a str,
    application_root: Option<&str>,
    placeholder: bool,
) -> Cow<'a, str> {
    let Some(root) = application_root
        .map(|root| root.trim_end_matches('/'))
        .filter(|root| !root.is_empty())
    else {
        return Cow::Borrowed(path);
    };

    match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            if placeholder {
                Cow::Owned(format!("{APP_ROOT_PLACEHOLDER}{rest}"))
            } else {
                Cow::Borrowed(rest.trim_start_matches('/'))
            }
        }
        _ => Cow::Borrowed(path),
    }
}

/// Cleans a backtrace for transmission.
///
/// Drops frames inside railflux, replaces the application root in file names, and formats each
/// remaining frame as `file:line:in `function``.
pub fn clean_backtrace(frames: &[Frame], application_root: Option<&str>) -> Vec<String> {
    frames
        .iter()
        .filter(|frame| !is_internal_frame(frame))
        .map(|frame| {
            let mut frame = frame.clone();
            if let Some(filename) = frame.filename.as_deref() {
                let stripped = strip_application_root(filename, application_root, true);
                if let Cow::Owned(stripped) = stripped {
                    frame.filename = Some(stripped);
                }
            }
            frame.to_string()
        })
        .collect()
}
