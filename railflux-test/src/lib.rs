//! Helpers for testing railflux.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all console output is
//!    captured by the test runner. All logs emitted with [`railflux_log`] will show up for test
//!    failures or when run with `--nocapture`.
//!  - To assert on log output, run the code under test within [`capture_logs`]. Logs emitted
//!    inside the closure go to the returned buffer instead.
//!
//! # Example
//!
//! ```no_run
//! #[test]
//! fn my_test() {
//!     railflux_test::setup();
//!
//!     railflux_log::debug!("hello, world!");
//! }
//! ```

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use railflux_protocol::{MetricPoint, MetricsClient, TransportError};

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from this crate and mutes all other logs.
pub fn setup() {
    railflux_log::init_test!();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A metrics client that records all points in memory.
///
/// Clones share the recorded points, so a clone can be handed to the reporter while the test
/// keeps the original for assertions.
#[derive(Clone, Debug, Default)]
pub struct CapturingClient {
    points: Arc<Mutex<Vec<(String, MetricPoint)>>>,
    flushes: Arc<Mutex<usize>>,
}

impl CapturingClient {
    /// Creates an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all points written so far along with their measurement.
    pub fn points(&self) -> Vec<(String, MetricPoint)> {
        lock(&self.points).clone()
    }

    /// Returns the only point written so far.
    ///
    /// Panics if no point or more than one point was written.
    pub fn single_point(&self) -> MetricPoint {
        let points = lock(&self.points);
        assert_eq!(points.len(), 1, "expected exactly one point, got {points:#?}");
        points[0].1.clone()
    }

    /// Returns `true` if no point was written.
    pub fn is_empty(&self) -> bool {
        lock(&self.points).is_empty()
    }

    /// Returns how often the client was flushed.
    pub fn flushes(&self) -> usize {
        *lock(&self.flushes)
    }
}

impl MetricsClient for CapturingClient {
    fn write_point(&self, measurement: &str, point: &MetricPoint) -> Result<(), TransportError> {
        lock(&self.points).push((measurement.to_owned(), point.clone()));
        Ok(())
    }

    fn flush(&self) {
        *lock(&self.flushes) += 1;
    }
}

/// A metrics client that rejects every point.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingClient;

impl MetricsClient for FailingClient {
    fn write_point(&self, _measurement: &str, _point: &MetricPoint) -> Result<(), TransportError> {
        Err(TransportError::Connect(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs the closure and returns its result along with all log lines it emitted.
///
/// Logs of all levels are captured, formatted as `LEVEL target: message` without timestamps
/// and colors. The capturing subscriber is only active on the current thread for the duration
/// of the closure.
///
/// # Example
///
/// ```
/// let ((), logs) = railflux_test::capture_logs(|| {
///     railflux_log::error!("could not write point");
/// });
///
/// assert!(logs.contains("could not write point"));
/// ```
pub fn capture_logs<F, R>(f: F) -> (R, String)
where
    F: FnOnce() -> R,
{
    let buffer = LogBuffer::default();
    let writer = buffer.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&lock(&buffer.0)).into_owned();

    (result, logs)
}
