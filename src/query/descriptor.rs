//! Query document parsing and translation.
//!
//! The host sends each query as a loosely-typed JSON object. It is read once
//! into a [`QueryDescriptor`] and then translated into either a time-series
//! request or a raw SQL batch.

use serde_json::{json, Map, Value as JsonValue};

use crate::error::{BridgeError, Result};
use crate::tsdb::{MetricType, Selector, TsdbQuery, ORDER_ASC};

/// A `name:value` tag filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// Which metrics a descriptor addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `queryBy == "tags"`.
    Tags(Vec<Tag>),
    /// Any other `queryBy`; the raw `target` string is the only id.
    Ids(String),
}

/// Query window in milliseconds since epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    from_ms: i64,
    to_ms: i64,
}

impl TimeRange {
    pub fn new(from_ms: i64, to_ms: i64) -> Result<Self> {
        if from_ms > to_ms {
            return Err(BridgeError::invalid_query(format!(
                "time range starts after it ends ({from_ms} > {to_ms})"
            )));
        }
        Ok(Self { from_ms, to_ms })
    }

    pub fn from_ms(&self) -> i64 {
        self.from_ms
    }

    pub fn to_ms(&self) -> i64 {
        self.to_ms
    }
}

/// A query document after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub ref_id: String,
    pub target: Target,
    pub metric_type: String,
    pub measurement: String,
    pub time_agg_fn: String,
    pub interval: String,
    /// Statement batch when `raw_query` is set.
    pub query: String,
    pub raw_query: bool,
    pub key: String,
    pub value: String,
    pub operator: String,
    pub alert_name: String,
}

/// The backend request a descriptor translates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatedQuery {
    TimeSeries {
        query: TsdbQuery,
        metric_type: MetricType,
    },
    Sql(String),
}

impl QueryDescriptor {
    /// Parses a host query document.
    ///
    /// Absent or non-string fields read as `""`. When `queryBy` is `"tags"`
    /// every tag must carry string `name` and `value` fields.
    pub fn from_json(document: &JsonValue) -> Result<Self> {
        let object = document
            .as_object()
            .ok_or_else(|| BridgeError::invalid_query("query document is not a JSON object"))?;

        let target = if text(object, "queryBy") == "tags" {
            Target::Tags(parse_tags(object)?)
        } else {
            Target::Ids(text(object, "target"))
        };

        Ok(Self {
            ref_id: text(object, "refId"),
            target,
            metric_type: text(object, "type"),
            measurement: text(object, "measurement"),
            time_agg_fn: text(object, "timeAggFn"),
            interval: text(object, "interval"),
            query: text(object, "query"),
            raw_query: flag(object, "rawQuery"),
            key: text(object, "key"),
            value: text(object, "value"),
            operator: text(object, "operator"),
            alert_name: text(object, "alert.name"),
        })
    }

    /// Translates the descriptor for the given window.
    ///
    /// Time-series queries without a metric type fail here, before any
    /// query of the batch is sent.
    pub fn translate(&self, range: &TimeRange) -> Result<TranslatedQuery> {
        if self.raw_query {
            return Ok(TranslatedQuery::Sql(self.query.clone()));
        }

        let metric_type = MetricType::parse(&self.metric_type);
        if metric_type.is_empty() {
            return Err(BridgeError::request_build("query has no metric type"));
        }

        let selector = match &self.target {
            Target::Tags(tags) => Selector::Tags(join_tags(tags)),
            Target::Ids(id) => Selector::Ids(vec![id.clone()]),
        };

        Ok(TranslatedQuery::TimeSeries {
            query: TsdbQuery {
                start: range.from_ms(),
                end: range.to_ms(),
                order: ORDER_ASC,
                selector,
            },
            metric_type,
        })
    }

    /// Diagnostic summary of the query, as logged per request.
    pub fn metric_summary(&self) -> JsonValue {
        let mut metric = Map::new();
        metric.insert("metric".into(), json!(self.measurement));
        metric.insert("timeAggFn".into(), json!(self.time_agg_fn));
        metric.insert("name".into(), json!(self.alert_name));
        metric.insert("query".into(), json!(self.query));
        metric.insert("rawQuery".into(), json!(self.raw_query));
        metric.insert("interval".into(), json!(self.interval));
        metric.insert("key".into(), json!(self.key));
        metric.insert("value".into(), json!(self.value));
        metric.insert("operator".into(), json!(self.operator));

        if let Target::Tags(tags) = &self.target {
            if !tags.is_empty() {
                let tags: Map<String, JsonValue> = tags
                    .iter()
                    .map(|t| (t.name.clone(), json!(t.value)))
                    .collect();
                metric.insert("tags".into(), JsonValue::Object(tags));
            }
        }

        JsonValue::Object(metric)
    }
}

/// Joins tags as `name:value` pairs separated by commas, in order.
pub fn join_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| format!("{}:{}", t.name, t.value))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_tags(object: &Map<String, JsonValue>) -> Result<Vec<Tag>> {
    let Some(entries) = object.get("tags").and_then(JsonValue::as_array) else {
        return Ok(Vec::new());
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let field = |name: &'static str| {
                entry
                    .get(name)
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .ok_or(BridgeError::MalformedTag { index, field: name })
            };
            Ok(Tag {
                name: field("name")?,
                value: field("value")?,
            })
        })
        .collect()
}

fn text(object: &Map<String, JsonValue>, key: &str) -> String {
    object
        .get(key)
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn flag(object: &Map<String, JsonValue>, key: &str) -> bool {
    match object.get(key) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
