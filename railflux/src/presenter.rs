//! Conversion of exceptions into bounded, serializable records.

use railflux_config::{Config, TagsMiddleware};
use railflux_normalization::{clean_backtrace, is_internal_frame, strip_application_root};
use railflux_protocol::{ExceptionInfo, FieldValue, RequestEnv, Tags, Values};
use serde::Serialize;

use crate::context;
use crate::shapers::HOSTNAME;

/// An exception prepared for reporting.
///
/// Built once per reported exception by the [`ExceptionPresenter`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExceptionRecord {
    /// Timestamp of the report in the configured precision.
    ///
    /// Serialized first, so that it survives truncation of the log preview.
    pub ts: i64,
    /// Class name of the exception.
    pub class_name: String,
    /// The full message, or an empty string.
    pub message: String,
    /// Frames outside of railflux, innermost first.
    pub backtrace: Vec<String>,
    /// Where the exception was raised and by which application.
    pub context: Tags,
    /// Allow-listed metadata of the request that raised the exception.
    pub dimensions: Tags,
    /// Values the host attached to the request that raised the exception.
    #[serde(skip_serializing_if = "Values::is_empty")]
    pub request_values: Values,
}

impl ExceptionRecord {
    /// Merges context and dimensions into the tags of the point.
    ///
    /// Dimensions win over context fields with the same key. The middleware runs exactly once,
    /// on the merged tags.
    pub fn tags(&self, middleware: &TagsMiddleware) -> Tags {
        let mut tags = self.context.clone();
        tags.extend(self.dimensions.clone());
        middleware.apply(tags)
    }

    /// Returns the field values of the point.
    pub fn values(&self) -> Result<Values, serde_json::Error> {
        let mut values = Values::new();
        values.insert("class_name".to_owned(), self.class_name.as_str().into());
        values.insert("exception_message".to_owned(), self.message.as_str().into());
        values.insert(
            "backtrace".to_owned(),
            FieldValue::String(serde_json::to_string(&self.backtrace)?),
        );
        values.insert("ts".to_owned(), self.ts.into());

        for (key, value) in &self.request_values {
            values.entry(key.clone()).or_insert_with(|| value.clone());
        }

        Ok(values)
    }

    /// Serializes the full record.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Turns exceptions and the requests that raised them into [`ExceptionRecord`]s.
#[derive(Debug)]
pub struct ExceptionPresenter<'a> {
    config: &'a Config,
}

impl<'a> ExceptionPresenter<'a> {
    /// Creates a presenter for the given configuration.
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Builds the record of an exception reported at `ts`.
    pub fn present(&self, exception: &ExceptionInfo, env: &RequestEnv, ts: i64) -> ExceptionRecord {
        let backtrace = clean_backtrace(exception.frames(), self.config.application_root.as_deref());

        ExceptionRecord {
            class_name: exception.class_name().to_owned(),
            message: exception.message().to_owned(),
            dimensions: self.dimensions(exception, env),
            context: self.context(),
            request_values: context::with_current(|current| current.values().clone()),
            backtrace,
            ts,
        }
    }

    fn context(&self) -> Tags {
        let mut context = Tags::new();

        if let Some(ref name) = self.config.application_name {
            context.insert("application_name".to_owned(), name.clone());
        }

        context::with_current(|current| {
            context.insert("location".to_owned(), current.location());
            if let Some(controller) = current.controller() {
                context.insert("controller".to_owned(), controller.to_owned());
            }
            if let Some(action) = current.action() {
                context.insert("action".to_owned(), action.to_owned());
            }
            for (key, value) in current.tags() {
                context.entry(key.clone()).or_insert_with(|| value.clone());
            }
        });

        for (key, value) in &self.config.custom_context {
            context.entry(key.clone()).or_insert_with(|| value.clone());
        }

        context.retain(|_, value| !value.is_empty());
        context
    }

    fn dimensions(&self, exception: &ExceptionInfo, env: &RequestEnv) -> Tags {
        let filename = exception
            .frames()
            .iter()
            .find(|frame| !is_internal_frame(frame))
            .and_then(|frame| frame.filename.as_deref())
            .map(|filename| {
                strip_application_root(filename, self.config.application_root.as_deref(), true)
            });

        let mut dimensions = Tags::new();
        let mut insert = |key: &str, value: Option<&str>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                dimensions
                    .entry(key.to_owned())
                    .or_insert_with(|| value.to_owned());
            }
        };

        insert("class", Some(exception.class_name()));
        insert("http_method", env.method.as_deref());
        insert("path", env.path());
        insert("user_agent", env.user_agent.as_deref());
        insert("referer", env.referer.as_deref());
        insert("filename", filename.as_deref());
        insert("server", HOSTNAME.as_deref());

        for (key, value) in &env.extra {
            if self.config.allowed_dimensions.contains(key) {
                insert(key, Some(value.as_str()));
            }
        }

        dimensions
    }
}
