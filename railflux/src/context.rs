//! Per-request correlation state.
//!
//! Every thread serving requests owns one [`RequestContext`], created on first access. It
//! remembers the controller and action of the request in flight, so that events fired while
//! rendering or querying can be attributed to a location. Hosts may also attach tags and values
//! that are merged into every point written during the request. The context must be reset at the
//! end of every request, which [`RequestScope`] does on drop.

use std::cell::RefCell;

use railflux_common::DEFAULT_LOCATION;
use railflux_protocol::{RequestEnv, Tags, Values};

thread_local! {
    static CURRENT: RefCell<RequestContext> = RefCell::new(RequestContext::default());
}

/// Correlation state of the request in flight on the current thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestContext {
    controller: Option<String>,
    action: Option<String>,
    request_data: Option<RequestEnv>,
    tags: Tags,
    values: Values,
}

impl RequestContext {
    /// The controller handling the request, if known.
    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    /// The action handling the request, if known.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// The request data registered by the host, if any.
    pub fn request_data(&self) -> Option<&RequestEnv> {
        self.request_data.as_ref()
    }

    /// Additional tags attached by the host for this request.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Additional values attached by the host for this request.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Sets the controller handling the request.
    pub fn set_controller(&mut self, name: impl Into<String>) {
        self.controller = Some(name.into());
    }

    /// Sets the action handling the request.
    pub fn set_action(&mut self, name: impl Into<String>) {
        self.action = Some(name.into());
    }

    /// Registers a snapshot of the request, used when an exception is reported without one.
    pub fn set_request_data(&mut self, env: RequestEnv) {
        self.request_data = Some(env);
    }

    /// Attaches tags to every point written until the next reset. Later keys replace earlier ones.
    pub fn add_tags(&mut self, tags: Tags) {
        self.tags.extend(tags);
    }

    /// Attaches values to every point written until the next reset. Later keys replace earlier ones.
    pub fn add_values(&mut self, values: Values) {
        self.values.extend(values);
    }

    /// Returns `"<controller>#<action>"`, or `"raw"` unless both are known.
    pub fn location(&self) -> String {
        match (self.controller(), self.action()) {
            (Some(controller), Some(action)) => format!("{controller}#{action}"),
            _ => DEFAULT_LOCATION.to_owned(),
        }
    }

    /// Clears all state. Safe to call repeatedly and on a context that was never set.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Forgets the controller and action, keeping the request data and additional fields.
    pub fn reset_location(&mut self) {
        self.controller = None;
        self.action = None;
    }
}

/// Runs the closure with the context of the current thread.
pub fn with_current<F, R>(f: F) -> R
where
    F: FnOnce(&RequestContext) -> R,
{
    CURRENT.with(|context| f(&context.borrow()))
}

/// Runs the closure with mutable access to the context of the current thread.
pub fn with_current_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut RequestContext) -> R,
{
    CURRENT.with(|context| f(&mut context.borrow_mut()))
}

/// Returns the location of the request in flight on the current thread.
pub fn current_location() -> String {
    with_current(RequestContext::location)
}

/// Registers a snapshot of the request in flight on the current thread.
pub fn set_request_data(env: RequestEnv) {
    with_current_mut(|context| context.set_request_data(env));
}

/// Resets the context of the current thread.
pub fn reset_current() {
    with_current_mut(RequestContext::reset);
}

/// Forgets the controller and action of the current thread.
pub fn reset_current_location() {
    with_current_mut(RequestContext::reset_location);
}

/// Marks the boundaries of a request on the current thread.
///
/// Entering the scope starts from a clean context. Dropping it resets the context again, also
/// when the request is aborted by an early return or a panic.
#[derive(Debug)]
#[must_use = "the context is reset when the scope is dropped"]
pub struct RequestScope {
    _private: (),
}

impl RequestScope {
    /// Starts a request on the current thread.
    pub fn enter() -> Self {
        reset_current();
        Self { _private: () }
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        reset_current();
    }
}

#[cfg(test)]
mod tests {
    use railflux_protocol::FieldValue;

    use super::*;

    #[test]
    fn test_location() {
        let mut context = RequestContext::default();
        assert_eq!(context.location(), "raw");

        context.set_controller("Foo");
        assert_eq!(context.location(), "raw");

        context.set_action("bar");
        assert_eq!(context.location(), "Foo#bar");
    }

    #[test]
    fn test_reset() {
        let mut context = RequestContext::default();
        context.reset();
        assert_eq!(context.location(), "raw");

        context.set_controller("Foo");
        context.set_action("bar");
        context.set_request_data(RequestEnv::default());
        context.add_tags(Tags::from([("tenant".to_owned(), "acme".to_owned())]));
        context.add_values(Values::from([("items".to_owned(), FieldValue::Integer(3))]));
        context.reset();
        context.reset();

        assert_eq!(context, RequestContext::default());
        assert_eq!(context.location(), "raw");
    }

    #[test]
    fn test_reset_location_keeps_request() {
        let env = RequestEnv {
            method: Some("POST".to_owned()),
            ..RequestEnv::default()
        };

        let mut context = RequestContext::default();
        context.set_controller("Foo");
        context.set_action("bar");
        context.set_request_data(env.clone());
        context.add_tags(Tags::from([("tenant".to_owned(), "acme".to_owned())]));

        context.reset_location();

        assert_eq!(context.location(), "raw");
        assert_eq!(context.request_data(), Some(&env));
        assert_eq!(context.tags()["tenant"], "acme");
    }

    #[test]
    fn test_add_fields() {
        let mut context = RequestContext::default();
        context.add_tags(Tags::from([
            ("tenant".to_owned(), "acme".to_owned()),
            ("plan".to_owned(), "free".to_owned()),
        ]));
        context.add_tags(Tags::from([("plan".to_owned(), "pro".to_owned())]));
        context.add_values(Values::from([("items".to_owned(), FieldValue::Integer(3))]));

        assert_eq!(context.tags()["tenant"], "acme");
        assert_eq!(context.tags()["plan"], "pro");
        assert_eq!(context.values()["items"], FieldValue::Integer(3));
    }

    #[test]
    fn test_scope_resets_on_drop() {
        with_current_mut(|context| context.set_controller("Stale"));

        {
            let _scope = RequestScope::enter();
            assert!(with_current(|context| context.controller().is_none()));

            with_current_mut(|context| {
                context.set_controller("PostsController");
                context.set_action("show");
            });
            assert_eq!(current_location(), "PostsController#show");
        }

        assert_eq!(current_location(), "raw");
    }

    #[test]
    fn test_scope_resets_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _scope = RequestScope::enter();
            with_current_mut(|context| {
                context.set_controller("PostsController");
                context.set_action("show");
            });
            panic!("request aborted");
        });

        assert!(result.is_err());
        assert_eq!(current_location(), "raw");
    }

    #[test]
    fn test_threads_are_isolated() {
        with_current_mut(|context| {
            context.set_controller("Foo");
            context.set_action("bar");
        });

        let other = std::thread::spawn(current_location).join().unwrap();

        assert_eq!(other, "raw");
        assert_eq!(current_location(), "Foo#bar");
        reset_current();
    }
}
