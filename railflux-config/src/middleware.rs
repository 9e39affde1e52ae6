use std::fmt;
use std::sync::Arc;

use railflux_protocol::Tags;

type TagsFn = dyn Fn(Tags) -> Tags + Send + Sync;

/// A user hook that rewrites the tags of every reported exception.
///
/// The middleware receives the merged context and dimensions and returns the tags that are
/// written. It may add, remove or rename tags. The default passes all tags through unchanged.
///
/// # Example
///
/// ```
/// use railflux_config::TagsMiddleware;
///
/// let middleware = TagsMiddleware::new(|mut tags| {
///     tags.insert("region".to_owned(), "eu".to_owned());
///     tags
/// });
///
/// let tags = middleware.apply(Default::default());
/// assert_eq!(tags["region"], "eu");
/// ```
#[derive(Clone, Default)]
pub struct TagsMiddleware(Option<Arc<TagsFn>>);

impl TagsMiddleware {
    /// Creates a middleware from a function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Tags) -> Tags + Send + Sync + 'static,
    {
        Self(Some(Arc::new(f)))
    }

    /// Returns `true` if this middleware passes tags through unchanged.
    pub fn is_identity(&self) -> bool {
        self.0.is_none()
    }

    /// Runs the middleware on the given tags.
    pub fn apply(&self, tags: Tags) -> Tags {
        match self.0 {
            Some(ref f) => f(tags),
            None => tags,
        }
    }
}

impl fmt::Debug for TagsMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            f.write_str("TagsMiddleware(identity)")
        } else {
            f.write_str("TagsMiddleware(..)")
        }
    }
}
