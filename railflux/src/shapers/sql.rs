use railflux_common::duration_millis;
use railflux_config::Config;
use railflux_normalization::{is_tracked_sql, normalize_sql, sql_class_name, sql_operation};
use railflux_protocol::{Event, Measurement, MetricPoint};

use crate::context;
use crate::shapers::{event_timestamp, with_request_fields, EventShaper};

/// Shapes database queries into `sql` points.
///
/// Only `SELECT`, `INSERT`, `UPDATE` and `DELETE` statements are shaped. Literal values in the
/// query are replaced before it becomes the `sql` value.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlShaper;

impl EventShaper for SqlShaper {
    fn shape(&self, event: &Event<'_>, config: &Config) -> Option<MetricPoint> {
        let query = event.get_str("sql")?;
        let name = event.get_str("name");

        if !is_tracked_sql(query, name) {
            return None;
        }

        let builder = MetricPoint::builder(Measurement::Sql, event_timestamp(event, config))
            .value("value", duration_millis(event.start, event.end))
            .value("sql", normalize_sql(query))
            .tag("location", Some(context::current_location()))
            .tag("operation", sql_operation(query))
            .tag("class_name", name.and_then(sql_class_name))
            .tag("hook", Some("sql"))
            .tag("name", name);

        with_request_fields(builder).build()
    }
}
