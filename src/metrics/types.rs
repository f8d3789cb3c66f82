use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// A single computed metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Null,
    Text(String),
    Count(u64),
    Points(f64),
}

impl MetricValue {
    /// Numeric view of the value. Text and null read as zero.
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Count(n) => *n as f64,
            MetricValue::Points(p) => *p,
            MetricValue::Null | MetricValue::Text(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Null => Ok(()),
            MetricValue::Text(s) => f.write_str(s),
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Points(p) if p.fract() == 0.0 => write!(f, "{p:.0}"),
            MetricValue::Points(p) => write!(f, "{p}"),
        }
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

impl From<Option<&str>> for MetricValue {
    fn from(s: Option<&str>) -> Self {
        s.map_or(MetricValue::Null, MetricValue::from)
    }
}

/// Accumulator of metric values keyed by transformer id, in write order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricBag(IndexMap<String, MetricValue>);

impl MetricBag {
    pub fn set(&mut self, id: &str, value: MetricValue) {
        self.0.insert(id.to_string(), value);
    }

    pub fn get(&self, id: &str) -> Option<&MetricValue> {
        self.0.get(id)
    }

    /// Numeric value of a metric; absent metrics read as zero.
    pub fn number(&self, id: &str) -> f64 {
        self.get(id).map_or(0.0, MetricValue::as_f64)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(MetricValue::as_str)
    }

    /// Add `delta` to a points metric, creating it at zero if absent.
    pub fn add_points(&mut self, id: &str, delta: f64) {
        let current = self.number(id);
        self.set(id, MetricValue::Points(current + delta));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One rendered column of a report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub id: String,
    pub title: String,
    pub value: MetricValue,
    /// Derived display value, e.g. a percentage.
    pub aggregate: Option<String>,
    /// Drill-down link into the planner.
    pub link: Option<String>,
}

/// Fully computed statistics for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub metrics: MetricBag,
    pub cells: Vec<Cell>,
}

impl ReportRow {
    pub fn name(&self) -> &str {
        self.metrics.text(super::ids::NAME).unwrap_or("")
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    pub fn value(&self, id: &str) -> Option<&MetricValue> {
        self.metrics.get(id)
    }

    pub fn aggregate(&self, id: &str) -> Option<&str> {
        self.cell(id).and_then(|c| c.aggregate.as_deref())
    }
}
