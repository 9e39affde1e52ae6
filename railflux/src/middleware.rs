//! Request boundaries and failure reporting for request handlers.

use std::error::Error;
use std::sync::Arc;

use railflux_protocol::{ExceptionInfo, RequestEnv};

use crate::context::{self, RequestScope};
use crate::Reporter;

/// Wraps the handling of a request.
///
/// Marks the request boundaries for the request context and reports failures of the handler,
/// except for requests of ignored user agents.
#[derive(Clone, Debug)]
pub struct RequestMiddleware {
    reporter: Arc<Reporter>,
}

impl RequestMiddleware {
    /// Creates a middleware reporting to the given reporter.
    pub fn new(reporter: Arc<Reporter>) -> Self {
        Self { reporter }
    }

    /// Handles a request.
    ///
    /// The request data is registered in the context of the current thread while the handler
    /// runs. Errors of the handler are reported unless ignorable and then returned unchanged.
    /// The context is reset when this returns, also if the handler panics.
    pub fn call<T, E, F>(&self, env: RequestEnv, handler: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error,
    {
        let _scope = RequestScope::enter();
        context::set_request_data(env.clone());

        handler().map_err(|error| {
            let config = self.reporter.config();
            let user_agent = env.user_agent.as_deref();

            if !railflux_filter::ignorable_user_agent(&config.filters, user_agent) {
                let exception = ExceptionInfo::from_error(&error);
                self.reporter
                    .report_exception_unless_ignorable(&exception, &env);
            }

            error
        })
    }
}
