use std::io;
use std::sync::Arc;

use crate::MetricPoint;

/// An error returned by a [`MetricsClient`] when a point could not be handed off.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The metrics backend could not be reached.
    #[error("could not connect to metrics backend")]
    Connect(#[source] io::Error),
    /// The metrics backend refused the point.
    #[error("metrics backend rejected the point: {0}")]
    Rejected(String),
    /// The client was shut down and accepts no more points.
    #[error("metrics client is closed")]
    Closed,
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        Self::Connect(error)
    }
}

/// Transmits points to a metrics backend.
///
/// Implementations own batching, retries and connection handling. `write_point` may block, but
/// it must not panic. railflux never retries a failed write.
pub trait MetricsClient: Send + Sync {
    /// Hands a point off for transmission.
    fn write_point(&self, measurement: &str, point: &MetricPoint) -> Result<(), TransportError>;

    /// Transmits all buffered points.
    fn flush(&self) {}
}

impl<C: MetricsClient + ?Sized> MetricsClient for Arc<C> {
    fn write_point(&self, measurement: &str, point: &MetricPoint) -> Result<(), TransportError> {
        (**self).write_point(measurement, point)
    }

    fn flush(&self) {
        (**self).flush()
    }
}

impl<C: MetricsClient + ?Sized> MetricsClient for Box<C> {
    fn write_point(&self, measurement: &str, point: &MetricPoint) -> Result<(), TransportError> {
        (**self).write_point(measurement, point)
    }

    fn flush(&self) {
        (**self).flush()
    }
}
