use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Low-cardinality dimensions of a point.
pub type Tags = BTreeMap<String, String>;

/// Measured fields of a point.
pub type Values = BTreeMap<String, FieldValue>;

/// A scalar field value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A signed integer, e.g. a duration in milliseconds or a timestamp.
    Integer(i64),
    /// A floating point number, e.g. a runtime reported by the host framework.
    Float(f64),
    /// A string, e.g. a normalized SQL query.
    String(String),
    /// A boolean flag.
    Boolean(bool),
}

impl FieldValue {
    /// Returns `true` for integer and float values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Returns the numeric value as float, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Integer(value) => Some(value as f64),
            Self::Float(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => value.fmt(f),
            Self::Float(value) => value.fmt(f),
            Self::String(value) => value.fmt(f),
            Self::Boolean(value) => value.fmt(f),
        }
    }
}

/// The series a point is written to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Measurement {
    /// Processed controller actions.
    Requests,
    /// Rendered templates, partials and collections.
    Renders,
    /// Database queries.
    Sql,
    /// Reported exceptions.
    Exceptions,
    /// Any other series defined by an extension.
    Custom(String),
}

impl Measurement {
    /// Returns the name of the series.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Requests => "requests",
            Self::Renders => "renders",
            Self::Sql => "sql",
            Self::Exceptions => "exceptions",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for Measurement {
    fn from(name: &str) -> Self {
        match name {
            "requests" => Self::Requests,
            "renders" => Self::Renders,
            "sql" => Self::Sql,
            "exceptions" => Self::Exceptions,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Measurement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One timestamped metric observation.
///
/// Points are immutable once built. Use [`MetricPoint::builder`] to create one; the builder
/// guarantees that tags never carry empty values and that at least one numeric value is present.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricPoint {
    #[serde(skip)]
    measurement: Measurement,
    values: Values,
    tags: Tags,
    timestamp: i64,
}

impl MetricPoint {
    /// Starts building a point for the given series and timestamp.
    pub fn builder(measurement: Measurement, timestamp: i64) -> MetricPointBuilder {
        MetricPointBuilder {
            measurement,
            values: Values::new(),
            tags: Tags::new(),
            timestamp,
        }
    }

    /// The series this point is written to.
    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// The measured fields.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// The dimensions.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// The timestamp in the configured precision.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns a copy of this point with an additional tag.
    ///
    /// Empty values are ignored and existing tags are never overwritten.
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() && !self.tags.contains_key(key) {
            self.tags.insert(key.to_owned(), value.to_owned());
        }
        self
    }
}

/// Builder for [`MetricPoint`].
#[derive(Debug)]
#[must_use]
pub struct MetricPointBuilder {
    measurement: Measurement,
    values: Values,
    tags: Tags,
    timestamp: i64,
}

impl MetricPointBuilder {
    /// Adds a field value.
    pub fn value(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.values.insert(key.to_owned(), value.into());
        self
    }

    /// Adds a field value if it is present.
    pub fn value_opt(self, key: &str, value: Option<impl Into<FieldValue>>) -> Self {
        match value {
            Some(value) => self.value(key, value),
            None => self,
        }
    }

    /// Adds all given field values.
    pub fn values(mut self, values: Values) -> Self {
        self.values.extend(values);
        self
    }

    /// Adds a tag if it is present and not empty.
    pub fn tag<S: Into<String>>(mut self, key: &str, value: Option<S>) -> Self {
        if let Some(value) = value.map(Into::into).filter(|v| !v.is_empty()) {
            self.tags.insert(key.to_owned(), value);
        }
        self
    }

    /// Replaces all tags with the given ones, dropping empty values.
    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self.tags.retain(|_, value| !value.is_empty());
        self
    }

    /// Adds the given tags where no tag with the same key was set, dropping empty values.
    pub fn default_tags(mut self, tags: &Tags) -> Self {
        for (key, value) in tags {
            if !value.is_empty() && !self.tags.contains_key(key) {
                self.tags.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// Adds the given field values where no value with the same key was set.
    pub fn default_values(mut self, values: &Values) -> Self {
        for (key, value) in values {
            self.values
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Finishes the point.
    ///
    /// Returns `None` if no numeric value was added, since such a point carries no measurement.
    pub fn build(self) -> Option<MetricPoint> {
        if !self.values.values().any(FieldValue::is_numeric) {
            return None;
        }

        Some(MetricPoint {
            measurement: self.measurement,
            values: self.values,
            tags: self.tags,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_skips_empty_tags() {
        let point = MetricPoint::builder(Measurement::Renders, 1)
            .value("value", 12)
            .tag("identifier", Some("posts/index.html.erb"))
            .tag("layout", Some(""))
            .tag::<String>("location", None)
            .build()
            .unwrap();

        assert_eq!(point.tags().len(), 1);
        assert_eq!(point.tags()["identifier"], "posts/index.html.erb");
    }

    #[test]
    fn test_builder_requires_numeric_value() {
        let point = MetricPoint::builder(Measurement::Sql, 1)
            .value("sql", "SELECT 1")
            .build();

        assert_eq!(point, None);
    }

    #[test]
    fn test_builder_defaults_never_overwrite() {
        let tags = Tags::from([
            ("location".to_owned(), "Foo#bar".to_owned()),
            ("tenant".to_owned(), "acme".to_owned()),
            ("empty".to_owned(), String::new()),
        ]);
        let values = Values::from([
            ("value".to_owned(), FieldValue::Integer(1)),
            ("items".to_owned(), FieldValue::Integer(3)),
        ]);

        let point = MetricPoint::builder(Measurement::Renders, 1)
            .value("value", 12)
            .tag("location", Some("raw"))
            .default_tags(&tags)
            .default_values(&values)
            .build()
            .unwrap();

        assert_eq!(point.tags()["location"], "raw");
        assert_eq!(point.tags()["tenant"], "acme");
        assert!(!point.tags().contains_key("empty"));
        assert_eq!(point.values()["value"], FieldValue::Integer(12));
        assert_eq!(point.values()["items"], FieldValue::Integer(3));
    }

    #[test]
    fn test_with_tag_keeps_existing() {
        let point = MetricPoint::builder(Measurement::Requests, 1)
            .value("value", 1)
            .tag("app_name", Some("mine"))
            .build()
            .unwrap()
            .with_tag("app_name", "other")
            .with_tag("server", "");

        assert_eq!(point.tags()["app_name"], "mine");
        assert!(!point.tags().contains_key("server"));
    }

    #[test]
    fn test_measurement_names() {
        assert_eq!(Measurement::from("sql"), Measurement::Sql);
        assert_eq!(
            Measurement::from("jobs"),
            Measurement::Custom("jobs".to_owned())
        );
        assert_eq!(Measurement::Exceptions.to_string(), "exceptions");
    }

    #[test]
    fn test_serialize_point() {
        let point = MetricPoint::builder(Measurement::Sql, 1_517_567_370_000)
            .value("value", 2000)
            .value("sql", "SELECT * FROM POSTS WHERE id = xxx")
            .tag("operation", Some("SELECT"))
            .build()
            .unwrap();

        insta::assert_json_snapshot!(point, @r###"
        {
          "values": {
            "sql": "SELECT * FROM POSTS WHERE id = xxx",
            "value": 2000
          },
          "tags": {
            "operation": "SELECT"
          },
          "timestamp": 1517567370000
        }
        "###);
    }
}
