use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use railflux_filter::FiltersConfig;
use railflux_log::LogConfig;
use railflux_protocol::Tags;
use serde::{Deserialize, Serialize};

use crate::{ClientConfig, TagsMiddleware};

/// Defines the source of a config error.
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating from an invalid value of a field.
    Field(&'static str),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    origin: ConfigErrorSource,
    inner: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            kind,
            origin: ConfigErrorSource::None,
            inner: None,
        }
    }

    #[inline]
    fn wrap<E>(inner: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            kind,
            origin: ConfigErrorSource::None,
            inner: Some(Box::new(inner)),
        }
    }

    #[inline]
    fn file<P: AsRef<Path>>(mut self, p: P) -> Self {
        self.origin = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.origin = ConfigErrorSource::Field(name);
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            ConfigErrorSource::None => self.kind.fmt(f),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::Field(name) => write!(f, "{} (field {})", self.kind, name),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// The file extension is neither YAML nor JSON.
    #[error("unsupported config file format")]
    UnsupportedFormat,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config file")]
    BadJson,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
}

enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// The railflux configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the environment the application runs in, e.g. `production`.
    pub environment: String,

    /// Name of the application.
    ///
    /// Added as `app_name` tag to every event point and as `application_name` to the context of
    /// every reported exception.
    pub application_name: Option<String>,

    /// Absolute path of the application.
    ///
    /// Removed from template identifiers and replaced by `[APP_ROOT]` in backtraces.
    pub application_root: Option<String>,

    /// Emits diagnostic lines about every reported exception.
    pub debug: bool,

    /// Ignore rules.
    #[serde(flatten)]
    pub filters: FiltersConfig,

    /// Fields added to the context of every reported exception.
    pub custom_context: BTreeMap<String, String>,

    /// Keys of host-specific request metadata that are reported as exception dimensions.
    pub allowed_dimensions: BTreeSet<String>,

    /// Options of the metrics client.
    pub client: ClientConfig,

    /// Logging options, used if the host lets railflux install the log subscriber.
    pub logging: LogConfig,

    /// Rewrites the tags of every reported exception.
    #[serde(skip)]
    pub tags_middleware: TagsMiddleware,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "production".to_owned(),
            application_name: None,
            application_root: None,
            debug: false,
            filters: FiltersConfig::default(),
            custom_context: BTreeMap::new(),
            allowed_dimensions: BTreeSet::new(),
            client: ClientConfig::default(),
            logging: LogConfig::default(),
            tags_middleware: TagsMiddleware::default(),
        }
    }
}

impl Config {
    /// Loads a config from a YAML or JSON file.
    ///
    /// The format is chosen by the file extension: `.yml` and `.yaml` for YAML, `.json` for
    /// JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::new(ConfigErrorKind::UnsupportedFormat).file(path))?;

        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(path))?;

        let config = match format {
            ConfigFormat::Yaml => Self::parse_yaml(&contents),
            ConfigFormat::Json => serde_json::from_str(&contents)
                .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson)),
        };

        config
            .and_then(Self::validate)
            .map_err(|e| e.file(path))
    }

    /// Creates a config from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_yaml(yaml).and_then(Self::validate)
    }

    /// Creates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson))
            .and_then(Self::validate)
    }

    /// Sets the tags middleware.
    #[must_use]
    pub fn with_tags_middleware<F>(mut self, f: F) -> Self
    where
        F: Fn(Tags) -> Tags + Send + Sync + 'static,
    {
        self.tags_middleware = TagsMiddleware::new(f);
        self
    }

    /// Returns `true` if reporting is suppressed in the configured environment.
    pub fn ignorable_environment(&self) -> bool {
        railflux_filter::ignorable_environment(&self.filters, &self.environment)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit rather than an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(yaml).map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.environment.is_empty() {
            return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("environment"));
        }

        if self.client.hosts.iter().all(|host| host.is_empty()) {
            return Err(ConfigError::new(ConfigErrorKind::InvalidValue).field("client.hosts"));
        }

        Ok(self)
    }
}
