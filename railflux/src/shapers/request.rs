use once_cell::sync::Lazy;
use railflux_common::duration_millis;
use railflux_config::Config;
use railflux_protocol::{Event, Measurement, MetricPoint, Payload};

use crate::context;
use crate::shapers::{
    event_timestamp, hook_tag, with_request_fields, EventShaper, START_PROCESSING_HOOK,
};

/// Host name of this machine, reported as `server` tag.
pub(crate) static HOSTNAME: Lazy<Option<String>> = Lazy::new(|| {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
});

/// Shapes processed controller actions into `requests` points.
///
/// Values:
///  - `value`: total duration in milliseconds.
///  - `view`, `db`: time spent rendering and querying, as reported by the host.
///
/// Tags: `controller`, `action`, `format`, `method`, `status`, `hook` and `server`.
///
/// Both the start and the finish event of an action populate the [`RequestContext`], so that
/// render and SQL events fired while processing are attributed to the action.
///
/// [`RequestContext`]: crate::context::RequestContext
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestShaper;

impl RequestShaper {
    /// Records controller and action of the payload in the current request context.
    pub fn start(&self, payload: &Payload) {
        let controller = payload.get("controller").and_then(|v| v.as_str());
        let action = payload.get("action").and_then(|v| v.as_str());

        context::with_current_mut(|context| {
            if let Some(controller) = controller {
                context.set_controller(controller);
            }
            if let Some(action) = action {
                context.set_action(action);
            }
        });
    }
}

impl EventShaper for RequestShaper {
    fn shape(&self, event: &Event<'_>, config: &Config) -> Option<MetricPoint> {
        self.start(event.payload);

        if event.name == START_PROCESSING_HOOK {
            return None;
        }

        let controller = event.get_str("controller")?;

        let builder = MetricPoint::builder(Measurement::Requests, event_timestamp(event, config))
            .value("value", duration_millis(event.start, event.end))
            .value_opt("view", event.get_f64("view_runtime"))
            .value_opt("db", event.get_f64("db_runtime"))
            .tag("controller", Some(controller))
            .tag("action", event.get_tag("action"))
            .tag("format", event.get_tag("format"))
            .tag("method", event.get_tag("method"))
            .tag("status", event.get_tag("status"))
            .tag("hook", Some(hook_tag(event.name)))
            .tag("server", HOSTNAME.as_deref());

        with_request_fields(builder).build()
    }
}

#[cfg(test)]
mod tests {
    use railflux_protocol::{FieldValue, Tags, Values};
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;
    use crate::shapers::tests::{event, payload};
    use crate::shapers::PROCESS_ACTION_HOOK;

    #[test]
    fn test_process_action() {
        let payload = payload(json!({
            "controller": "PostsController",
            "action": "show",
            "format": "html",
            "method": "GET",
            "status": 200,
            "view_runtime": 12.5,
            "db_runtime": 3.25,
        }));

        let point = RequestShaper
            .process(&event(PROCESS_ACTION_HOOK, &payload), &Config::default())
            .unwrap();

        insta::assert_json_snapshot!(point, {".tags.server" => "[server]"}, @r###"
        {
          "values": {
            "db": 3.25,
            "value": 2000,
            "view": 12.5
          },
          "tags": {
            "action": "show",
            "controller": "PostsController",
            "format": "html",
            "hook": "process_action",
            "method": "GET",
            "server": "[server]",
            "status": "200"
          },
          "timestamp": 1517567370
        }
        "###);

        assert_eq!(context::current_location(), "PostsController#show");
        context::reset_current();
    }

    #[test]
    fn test_request_fields() {
        let payload = payload(json!({"controller": "PostsController", "action": "show"}));

        context::with_current_mut(|context| {
            context.add_tags(Tags::from([
                ("tenant".to_owned(), "acme".to_owned()),
                ("controller".to_owned(), "Overridden".to_owned()),
            ]));
            context.add_values(Values::from([
                ("items".to_owned(), FieldValue::Integer(3)),
                ("value".to_owned(), FieldValue::Integer(0)),
            ]));
        });

        let point = RequestShaper
            .process(&event(PROCESS_ACTION_HOOK, &payload), &Config::default())
            .unwrap();
        context::reset_current();

        assert_eq!(point.tags()["tenant"], "acme");
        assert_eq!(point.tags()["controller"], "PostsController");
        assert_eq!(point.values()["items"], FieldValue::Integer(3));
        assert_eq!(point.values()["value"], FieldValue::Integer(2000));
    }

    #[test]
    fn test_start_processing() {
        let payload = payload(json!({"controller": "PostsController", "action": "index"}));

        let point =
            RequestShaper.process(&event(START_PROCESSING_HOOK, &payload), &Config::default());

        assert_eq!(point, None);
        assert_eq!(context::current_location(), "PostsController#index");
        context::reset_current();
    }

    #[test]
    fn test_missing_controller() {
        let payload = payload(json!({"action": "index", "status": 500}));
        let point = RequestShaper.process(&event(PROCESS_ACTION_HOOK, &payload), &Config::default());
        assert_eq!(point, None);
        context::reset_current();
    }
}
