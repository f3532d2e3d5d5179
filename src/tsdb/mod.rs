//! Time-series HTTP path.
//!
//! Builds raw-query requests for a Hawkular-style metrics API, sends them and
//! decodes the returned series.

mod client;
mod request;
mod resource;
mod response;

pub use client::TsdbClient;
pub use request::{build_request, TsdbEndpoint};
pub use resource::MetricType;
pub use response::{parse_response, read_response};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sort order of returned points. The backend is always asked for ascending.
pub const ORDER_ASC: &str = "ASC";

/// Body of a raw-query request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TsdbQuery {
    /// Range start, ms since epoch.
    pub start: i64,
    /// Range end, ms since epoch.
    pub end: i64,
    pub order: &'static str,
    #[serde(flatten)]
    pub selector: Selector,
}

/// Which metrics a query addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Selector {
    /// Explicit metric ids.
    #[serde(rename = "ids")]
    Ids(Vec<String>),
    /// Comma-joined `name:value` tag filter.
    #[serde(rename = "tags")]
    Tags(String),
}

impl TsdbQuery {
    /// Returns the ids, if this is an id query.
    pub fn ids(&self) -> Option<&[String]> {
        match &self.selector {
            Selector::Ids(ids) => Some(ids),
            Selector::Tags(_) => None,
        }
    }

    /// Returns the tag filter, if this is a tag query.
    pub fn tags(&self) -> Option<&str> {
        match &self.selector {
            Selector::Tags(tags) => Some(tags),
            Selector::Ids(_) => None,
        }
    }
}

/// One point of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Epoch milliseconds.
    pub timestamp: f64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// A named, time-ordered series as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
}
