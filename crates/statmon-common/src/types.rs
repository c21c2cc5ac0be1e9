use serde::{Deserialize, Serialize};

/// Metric kind, determining how repeated updates combine.
///
/// # Examples
///
/// ```
/// use statmon_common::types::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Latest reported value fully replaces the previous one.
    Gauge,
    /// Reported deltas accumulate into a running total.
    Counter,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Counter => write!(f, "counter"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            _ => Err(MetricError::UnknownKind(s.to_string())),
        }
    }
}

/// A single metric record as carried on the wire and held in the store.
///
/// Exactly one of `value`/`delta` is set, matching `kind`. A record with the
/// wrong payload for its kind fails [`Metric::validate`] and is rejected,
/// never coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge,
            value: Some(value),
            delta: None,
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter,
            value: None,
            delta: Some(delta),
        }
    }

    /// Checks the record's internal consistency: non-empty id and exactly
    /// the payload field matching `kind`.
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.id.is_empty() {
            return Err(MetricError::EmptyId);
        }
        match self.kind {
            MetricKind::Gauge => {
                if self.value.is_none() || self.delta.is_some() {
                    return Err(MetricError::WrongPayload {
                        id: self.id.clone(),
                        kind: self.kind,
                    });
                }
            }
            MetricKind::Counter => {
                if self.delta.is_none() || self.value.is_some() {
                    return Err(MetricError::WrongPayload {
                        id: self.id.clone(),
                        kind: self.kind,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn key(&self) -> MetricKey {
        MetricKey {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// Store key: a metric is unique within its `(kind, id)` namespace.
///
/// `Display` renders the snapshot map key format `"<kind>:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub kind: MetricKind,
    pub id: String,
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Validation errors for metric records. Rejected immediately, never retried.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MetricError {
    #[error("metric id must not be empty")]
    EmptyId,

    #[error("unknown metric kind '{0}'")]
    UnknownKind(String),

    /// The record carries the wrong payload field for its declared kind
    /// (a gauge without `value`, a counter without `delta`, or both set).
    #[error("metric '{id}' has the wrong payload for kind '{kind}'")]
    WrongPayload { id: String, kind: MetricKind },
}
