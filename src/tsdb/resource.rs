//! Metric type to resource path mapping.

use tracing::warn;

/// Metric types known to the backend, each served under its own resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
    Availability,
    String,
    /// A type token with no table entry; served under `<token>s`.
    Other(String),
}

impl MetricType {
    /// Parses the `type` token of a query document.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "gauge" => Self::Gauge,
            "counter" => Self::Counter,
            "availability" => Self::Availability,
            "string" => Self::String,
            _ => Self::Other(token.trim().to_string()),
        }
    }

    /// Returns the path segment of the resource collection.
    pub fn path_segment(&self) -> String {
        match self {
            Self::Gauge => "gauges".to_string(),
            Self::Counter => "counters".to_string(),
            Self::Availability => "availability".to_string(),
            Self::String => "strings".to_string(),
            Self::Other(token) => {
                warn!("Unknown metric type '{}', using '{}s'", token, token);
                format!("{token}s")
            }
        }
    }

    /// Returns true if no usable type token was given.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Other(token) if token.is_empty())
    }
}
