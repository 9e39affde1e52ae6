use railflux_common::duration_millis;
use railflux_config::Config;
use railflux_normalization::strip_application_root;
use railflux_protocol::{Event, Measurement, MetricPoint};

use crate::context;
use crate::shapers::{event_timestamp, hook_tag, with_request_fields, EventShaper};

/// Shapes rendered templates, partials and collections into `renders` points.
///
/// Values:
///  - `value`: render duration in milliseconds.
///  - `count`, `cache_hits`: size and cache hits of a rendered collection.
///
/// Tags: `identifier` relative to the application root, `layout`, `location` and `hook`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderShaper;

impl EventShaper for RenderShaper {
    fn shape(&self, event: &Event<'_>, config: &Config) -> Option<MetricPoint> {
        let identifier = event.get_str("identifier")?;
        let identifier =
            strip_application_root(identifier, config.application_root.as_deref(), false);

        let builder = MetricPoint::builder(Measurement::Renders, event_timestamp(event, config))
            .value("value", duration_millis(event.start, event.end))
            .value_opt("count", event.get_i64("count"))
            .value_opt("cache_hits", event.get_i64("cache_hits"))
            .tag("identifier", Some(identifier))
            .tag("layout", event.get_tag("layout"))
            .tag("location", Some(context::current_location()))
            .tag("hook", Some(hook_tag(event.name)));

        with_request_fields(builder).build()
    }
}
