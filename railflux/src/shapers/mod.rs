//! Shaping of lifecycle events into metric points.
//!
//! Each [`EventShaper`] handles one family of instrumentation hooks. The [`Shapers`] registry
//! maps hook names to shapers, and comes with the shapers for requests, renders and SQL queries
//! registered under the default hook names.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use railflux_config::Config;
use railflux_protocol::{Event, MetricPoint, MetricPointBuilder};

use crate::context;

mod render;
mod request;
mod sql;

pub use self::render::*;
pub use self::request::*;
pub use self::sql::*;

/// Fired when a controller action finished processing.
pub const PROCESS_ACTION_HOOK: &str = "process_action.action_controller";
/// Fired when a controller action starts processing.
pub const START_PROCESSING_HOOK: &str = "start_processing.action_controller";
/// Fired when a template was rendered.
pub const RENDER_TEMPLATE_HOOK: &str = "render_template.action_view";
/// Fired when a partial was rendered.
pub const RENDER_PARTIAL_HOOK: &str = "render_partial.action_view";
/// Fired when a collection of partials was rendered.
pub const RENDER_COLLECTION_HOOK: &str = "render_collection.action_view";
/// Fired when a database query finished.
pub const SQL_HOOK: &str = "sql.active_record";

/// Turns events of an instrumentation hook into metric points.
pub trait EventShaper: Send + Sync {
    /// Shapes the event into a point.
    ///
    /// Returns `None` if the event does not produce a point, for instance because its payload
    /// lacks required fields.
    fn shape(&self, event: &Event<'_>, config: &Config) -> Option<MetricPoint>;

    /// Shapes the event unless its hook is ignored.
    ///
    /// Events of ignored hooks yield `None` without their payload being read.
    fn process(&self, event: &Event<'_>, config: &Config) -> Option<MetricPoint> {
        if railflux_filter::ignorable_hook(&config.filters, event.name) {
            return None;
        }

        self.shape(event, config)
    }
}

/// Returns the short hook name used as `hook` tag, e.g. `render_template`.
pub(crate) fn hook_tag(hook: &str) -> &str {
    hook.split('.').next().unwrap_or(hook)
}

/// Returns the timestamp of a point for the event, which is the time the event finished.
pub(crate) fn event_timestamp(event: &Event<'_>, config: &Config) -> i64 {
    config.client.time_precision.convert(event.end)
}

/// Merges the tags and values the host attached to the current request. Built-in keys win.
pub(crate) fn with_request_fields(builder: MetricPointBuilder) -> MetricPointBuilder {
    context::with_current(|context| {
        builder
            .default_tags(context.tags())
            .default_values(context.values())
    })
}

/// Maps instrumentation hooks to the shapers handling them.
#[derive(Clone)]
pub struct Shapers {
    by_hook: BTreeMap<String, Arc<dyn EventShaper>>,
}

impl Shapers {
    /// Creates a registry without any shapers.
    pub fn empty() -> Self {
        Self {
            by_hook: BTreeMap::new(),
        }
    }

    /// Registers a shaper for a hook, replacing any shaper registered before.
    pub fn register(&mut self, hook: impl Into<String>, shaper: Arc<dyn EventShaper>) {
        self.by_hook.insert(hook.into(), shaper);
    }

    /// Returns the shaper registered for a hook.
    pub fn get(&self, hook: &str) -> Option<&dyn EventShaper> {
        self.by_hook.get(hook).map(|shaper| shaper.as_ref())
    }

    /// Returns the names of all hooks with a registered shaper.
    pub fn hooks(&self) -> impl Iterator<Item = &str> {
        self.by_hook.keys().map(String::as_str)
    }
}

impl Default for Shapers {
    fn default() -> Self {
        let mut shapers = Self::empty();

        let request: Arc<dyn EventShaper> = Arc::new(RequestShaper);
        shapers.register(PROCESS_ACTION_HOOK, request.clone());
        shapers.register(START_PROCESSING_HOOK, request);

        let render: Arc<dyn EventShaper> = Arc::new(RenderShaper);
        for hook in [RENDER_TEMPLATE_HOOK, RENDER_PARTIAL_HOOK, RENDER_COLLECTION_HOOK] {
            shapers.register(hook, render.clone());
        }

        shapers.register(SQL_HOOK, Arc::new(SqlShaper));
        shapers
    }
}

impl fmt::Debug for Shapers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hooks()).finish()
    }
}
