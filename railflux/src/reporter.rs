//! The service that turns events and exceptions into points and hands them to the client.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use railflux_common::{LOG_PREFIX, MAX_LOG_PREVIEW};
use railflux_config::Config;
use railflux_log::LogError;
use railflux_protocol::{
    Event, ExceptionInfo, Measurement, MetricPoint, MetricsClient, RequestEnv, TransportError,
};

use crate::context;
use crate::presenter::{ExceptionPresenter, ExceptionRecord};
use crate::shapers::{EventShaper, Shapers, PROCESS_ACTION_HOOK};

/// An error raised while reporting an exception.
///
/// These errors never reach the host. The reporter logs them and carries on.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The exception record could not be serialized.
    #[error("could not serialize exception")]
    Serialize(#[from] serde_json::Error),
    /// The metrics client failed to accept the point.
    #[error("could not write point")]
    Transport(#[from] TransportError),
    /// The point had no numeric value.
    #[error("exception point without values")]
    EmptyPoint,
    /// User code, such as the tags middleware, panicked.
    #[error("panicked while reporting exception")]
    Panicked,
}

/// Reports lifecycle events and exceptions to a [`MetricsClient`].
///
/// The reporter is shared by all threads serving requests. Reconfiguration replaces the entire
/// configuration at once, so a report in progress always sees one consistent configuration.
/// Reporting never fails from the perspective of the host: all errors are logged.
pub struct Reporter {
    config: ArcSwap<Config>,
    client: Box<dyn MetricsClient>,
    shapers: Shapers,
}

impl Reporter {
    /// Creates a reporter with the default shapers.
    pub fn new<C>(config: Config, client: C) -> Self
    where
        C: MetricsClient + 'static,
    {
        Self {
            config: ArcSwap::from_pointee(config),
            client: Box::new(client),
            shapers: Shapers::default(),
        }
    }

    /// Replaces the shapers used by [`instrument`](Self::instrument).
    #[must_use]
    pub fn with_shapers(mut self, shapers: Shapers) -> Self {
        self.shapers = shapers;
        self
    }

    /// Returns a snapshot of the current configuration.
    pub fn config(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Replaces the configuration.
    ///
    /// Reports already in progress finish with the previous configuration.
    pub fn reconfigure(&self, config: Config) {
        self.config.store(Arc::new(config));
    }

    /// Flushes the metrics client.
    pub fn shutdown(&self) {
        railflux_log::debug!("{LOG_PREFIX} flushing metrics client");
        self.client.flush();
    }

    /// Shapes a lifecycle event and writes the resulting point.
    ///
    /// Events are skipped in ignored environments and for hooks without a shaper. After the
    /// event that finishes a request, the controller and action of the current thread are
    /// forgotten. Request data and additional fields stay until the request scope ends.
    pub fn instrument(&self, event: &Event<'_>) {
        let config = self.config.load();

        if !config.ignorable_environment() {
            if let Some(shaper) = self.shapers.get(event.name) {
                self.write_event(shaper, event, &config);
            }
        }

        if event.name == PROCESS_ACTION_HOOK {
            context::reset_current_location();
        }
    }

    fn write_event(&self, shaper: &dyn EventShaper, event: &Event<'_>, config: &Config) {
        let Some(mut point) = shaper.process(event, config) else {
            return;
        };

        if let Some(ref app_name) = config.application_name {
            point = point.with_tag("app_name", app_name);
        }

        let measurement = point.measurement().as_str().to_owned();
        if let Err(error) = self.client.write_point(&measurement, &point) {
            railflux_log::error!(
                "{LOG_PREFIX} could not write {measurement} point: {}",
                LogError(&error)
            );
        }
    }

    /// Reports an exception.
    ///
    /// If `env` is empty, the request data registered in the current request context is used
    /// instead. Failures while reporting are logged and never propagate.
    pub fn report_exception(&self, exception: &ExceptionInfo, env: &RequestEnv) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_report_exception(exception, env)
        }))
        .unwrap_or(Err(ReportError::Panicked));

        if let Err(error) = result {
            railflux_log::error!(
                "{LOG_PREFIX} Something went terribly wrong. Exception failed to take off! {}",
                LogError(&error)
            );
        }
    }

    /// Reports an exception unless its class or the current environment is ignored.
    pub fn report_exception_unless_ignorable(&self, exception: &ExceptionInfo, env: &RequestEnv) {
        let config = self.config.load();

        let filtered = railflux_filter::should_filter_exception(
            &config.filters,
            exception,
            &config.environment,
        );

        match filtered {
            Ok(()) => self.report_exception(exception, env),
            Err(reason) => railflux_log::debug!(
                "{LOG_PREFIX} ignoring {}: {reason}",
                exception.class_name()
            ),
        }
    }

    fn try_report_exception(
        &self,
        exception: &ExceptionInfo,
        env: &RequestEnv,
    ) -> Result<(), ReportError> {
        let config = self.config.load_full();
        let ts = config.client.time_precision.now();

        let ambient;
        let env = if env.is_empty() {
            ambient = context::with_current(|current| current.request_data().cloned());
            ambient.as_ref().unwrap_or(env)
        } else {
            env
        };

        let record = ExceptionPresenter::new(&config).present(exception, env, ts);

        if config.debug {
            log_preview(&record);
        }

        let point = MetricPoint::builder(Measurement::Exceptions, ts)
            .values(record.values()?)
            .tags(record.tags(&config.tags_middleware))
            .build()
            .ok_or(ReportError::EmptyPoint)?;

        self.client
            .write_point(Measurement::Exceptions.as_str(), &point)?;

        Ok(())
    }
}

/// Logs the start of the serialized record. Failing to serialize it does not stop the report.
fn log_preview(record: &ExceptionRecord) {
    match record.to_json() {
        Ok(json) => railflux_log::info!(
            "{LOG_PREFIX} Exception: {}...",
            railflux_log::truncate(&json, MAX_LOG_PREVIEW)
        ),
        Err(error) => railflux_log::error!(
            "{LOG_PREFIX} could not serialize exception preview: {}",
            LogError(&error)
        ),
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.config())
            .field("shapers", &self.shapers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use railflux_common::TimePrecision;
    use railflux_protocol::{FieldValue, Payload};
    use railflux_test::{capture_logs, CapturingClient, FailingClient};
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::shapers::{SQL_HOOK, START_PROCESSING_HOOK};

    fn config() -> Config {
        let mut config = Config {
            environment: "production".to_owned(),
            ..Config::default()
        };
        config.client.time_precision = TimePrecision::Milliseconds;
        config
    }

    fn reporter(config: Config) -> (Reporter, CapturingClient) {
        let client = CapturingClient::new();
        (Reporter::new(config, client.clone()), client)
    }

    fn sql_payload() -> Payload {
        match json!({"sql": "SELECT * FROM POSTS WHERE id = 1", "name": "Post Load"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn event<'a>(name: &'a str, payload: &'a Payload) -> Event<'a> {
        Event {
            name,
            start: Utc.timestamp_opt(1_517_567_368, 0).unwrap(),
            end: Utc.timestamp_opt(1_517_567_370, 0).unwrap(),
            transaction_id: "4b4a1a4c",
            payload,
        }
    }

    #[test]
    fn test_report_exception() {
        railflux_test::setup();
        let (reporter, client) = reporter(config());

        let exception = ExceptionInfo::new("ZeroDivisionError").with_message("divided by 0");
        reporter.report_exception(&exception, &RequestEnv::default());

        let points = client.points();
        assert_eq!(points.len(), 1);

        let (measurement, point) = &points[0];
        assert_eq!(measurement, "exceptions");
        assert_eq!(point.values()["ts"], FieldValue::Integer(point.timestamp()));
        assert_eq!(
            point.values()["exception_message"],
            FieldValue::from("divided by 0")
        );
        assert_eq!(point.tags()["class"], "ZeroDivisionError");
        assert_eq!(point.tags()["location"], "raw");
    }

    #[test]
    fn test_debug_preview_matches_timestamp() {
        let (reporter, client) = reporter(Config {
            debug: true,
            ..config()
        });

        let exception = ExceptionInfo::new("ArgumentError").with_message("x".repeat(2000));
        let ((), logs) =
            capture_logs(|| reporter.report_exception(&exception, &RequestEnv::default()));

        let point = client.single_point();
        let preview = logs
            .lines()
            .find(|line| line.contains("[railflux] Exception: "))
            .unwrap();

        assert!(preview.contains(&format!("\"ts\":{}", point.timestamp())));
        assert!(preview.len() < 800);
        assert_eq!(
            point.values()["exception_message"],
            FieldValue::from("x".repeat(2000))
        );
    }

    #[test]
    fn test_debug_preview_with_request_values() {
        let (reporter, client) = reporter(Config {
            debug: true,
            ..config()
        });

        context::with_current_mut(|context| {
            context.add_values([("items".to_owned(), FieldValue::Integer(3))].into());
        });

        let exception = ExceptionInfo::new("ArgumentError");
        let ((), logs) =
            capture_logs(|| reporter.report_exception(&exception, &RequestEnv::default()));
        context::reset_current();

        assert!(logs.contains("\"request_values\":{\"items\":3}"));
        assert!(!logs.contains("could not serialize"));
        assert_eq!(client.single_point().values()["items"], FieldValue::Integer(3));
    }

    #[test]
    fn test_no_preview_without_debug() {
        let (reporter, _client) = reporter(config());

        let exception = ExceptionInfo::new("ArgumentError");
        let ((), logs) =
            capture_logs(|| reporter.report_exception(&exception, &RequestEnv::default()));

        assert!(!logs.contains("Exception: "));
    }

    #[test]
    fn test_failing_client() {
        let reporter = Reporter::new(config(), FailingClient);

        let exception = ExceptionInfo::new("ZeroDivisionError");
        let ((), logs) =
            capture_logs(|| reporter.report_exception(&exception, &RequestEnv::default()));

        assert!(logs.contains("ERROR"));
        assert!(logs.contains("Something went terribly wrong"));
        assert!(logs.contains("connection refused"));
    }

    #[test]
    fn test_panicking_middleware() {
        let config = config().with_tags_middleware(|_| panic!("broken middleware"));
        let (reporter, client) = reporter(config);

        let exception = ExceptionInfo::new("ZeroDivisionError");
        let ((), logs) =
            capture_logs(|| reporter.report_exception(&exception, &RequestEnv::default()));

        assert!(client.is_empty());
        assert!(logs.contains("panicked while reporting exception"));
    }

    #[test]
    fn test_unless_ignorable() {
        let mut config = config();
        config
            .filters
            .ignored_exceptions
            .insert("DummyException".to_owned());
        let (reporter, client) = reporter(config);

        let env = RequestEnv::default();
        reporter.report_exception_unless_ignorable(&ExceptionInfo::new("DummyException"), &env);
        reporter.report_exception_unless_ignorable(
            &ExceptionInfo::new("ActiveRecord::RecordNotFound"),
            &env,
        );
        assert!(client.is_empty());

        reporter.report_exception_unless_ignorable(&ExceptionInfo::new("ZeroDivisionError"), &env);
        assert_eq!(client.points().len(), 1);
    }

    #[test]
    fn test_unless_ignorable_environment() {
        let (reporter, client) = reporter(Config {
            environment: "test".to_owned(),
            ..config()
        });

        let exception = ExceptionInfo::new("ZeroDivisionError");
        reporter.report_exception_unless_ignorable(&exception, &RequestEnv::default());

        assert!(client.is_empty());
    }

    #[test]
    fn test_ambient_request_data() {
        let (reporter, client) = reporter(config());

        context::set_request_data(RequestEnv {
            method: Some("POST".to_owned()),
            url: Some("/posts?draft=1".to_owned()),
            ..RequestEnv::default()
        });

        let exception = ExceptionInfo::new("ZeroDivisionError");
        reporter.report_exception(&exception, &RequestEnv::default());
        context::reset_current();

        let point = client.single_point();
        assert_eq!(point.tags()["http_method"], "POST");
        assert_eq!(point.tags()["path"], "/posts");
    }

    #[test]
    fn test_instrument_sql() {
        let (reporter, client) = reporter(Config {
            application_name: Some("blog".to_owned()),
            ..config()
        });

        let payload = sql_payload();
        reporter.instrument(&event(SQL_HOOK, &payload));

        let points = client.points();
        let (measurement, point) = &points[0];
        assert_eq!(measurement, "sql");
        assert_eq!(point.tags()["app_name"], "blog");
        assert_eq!(point.timestamp(), 1_517_567_370_000);
    }

    #[test]
    fn test_instrument_resets_after_request() {
        let (reporter, client) = reporter(config());

        let request = match json!({"controller": "Foo", "action": "bar", "status": 200}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let sql = sql_payload();

        context::set_request_data(RequestEnv {
            method: Some("GET".to_owned()),
            ..RequestEnv::default()
        });

        reporter.instrument(&event(START_PROCESSING_HOOK, &request));
        reporter.instrument(&event(SQL_HOOK, &sql));
        reporter.instrument(&event(PROCESS_ACTION_HOOK, &request));

        let points = client.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].1.tags()["location"], "Foo#bar");
        assert_eq!(points[1].0, "requests");
        assert_eq!(context::current_location(), "raw");
        assert!(context::with_current(|context| context.request_data().is_some()));
        context::reset_current();
    }

    #[test]
    fn test_instrument_ignored_environment() {
        let (reporter, client) = reporter(Config {
            environment: "development".to_owned(),
            ..config()
        });

        let payload = sql_payload();
        reporter.instrument(&event(SQL_HOOK, &payload));

        assert!(client.is_empty());
    }

    #[test]
    fn test_instrument_failing_client() {
        let reporter = Reporter::new(config(), FailingClient);

        let payload = sql_payload();
        let ((), logs) = capture_logs(|| reporter.instrument(&event(SQL_HOOK, &payload)));

        assert!(logs.contains("ERROR"));
        assert!(logs.contains("could not write sql point"));
    }

    #[test]
    fn test_reconfigure() {
        let (reporter, client) = reporter(config());
        let exception = ExceptionInfo::new("ZeroDivisionError");

        reporter.reconfigure(Config {
            environment: "test".to_owned(),
            ..config()
        });
        reporter.report_exception_unless_ignorable(&exception, &RequestEnv::default());
        assert!(client.is_empty());
        assert_eq!(reporter.config().environment, "test");

        reporter.reconfigure(config());
        reporter.report_exception_unless_ignorable(&exception, &RequestEnv::default());
        assert_eq!(client.points().len(), 1);
    }

    #[test]
    fn test_shutdown_flushes() {
        let (reporter, client) = reporter(config());
        reporter.shutdown();
        assert_eq!(client.flushes(), 1);
    }
}
