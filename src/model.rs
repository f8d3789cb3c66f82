use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metrics::MetricBag;

/// An iteration (sprint) of a space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Iteration {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    /// Work item count reported by the service (children and all types included).
    pub total: u64,
    /// Metric values written by transformers.
    pub metrics: MetricBag,
}

impl Iteration {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            total: 0,
            metrics: MetricBag::default(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }
}

impl From<IterationRecord> for Iteration {
    fn from(r: IterationRecord) -> Self {
        Self {
            id: r.id,
            name: r.attributes.name,
            parent_id: r.relationships.parent.and_then(|p| p.data).map(|d| d.id),
            total: r
                .relationships
                .workitems
                .and_then(|w| w.meta)
                .map(|m| m.total)
                .unwrap_or(0),
            metrics: MetricBag::default(),
        }
    }
}

/// A single tracked item belonging to an iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkItem {
    pub id: String,
    pub story_points: Option<f64>,
    pub state: Option<String>,
    pub description: Option<String>,
    pub item_type: Option<String>,
}

impl WorkItem {
    /// Story points counted as "estimated": present and non-zero.
    pub fn estimated_points(&self) -> Option<f64> {
        self.story_points.filter(|sp| sp.is_finite() && *sp != 0.0)
    }

    pub fn is_closed(&self) -> bool {
        self.state.as_deref() == Some("Closed")
    }
}

impl From<WorkItemRecord> for WorkItem {
    fn from(r: WorkItemRecord) -> Self {
        let description = match r.attributes.description {
            Some(Value::String(s)) => Some(s),
            Some(Value::Object(map)) => map
                .get("content")
                .and_then(|c| c.as_str())
                .map(|s| s.to_string()),
            _ => None,
        };
        Self {
            id: r.id,
            story_points: r.attributes.storypoints.and_then(|v| v.as_f64()),
            state: r.attributes.state,
            description,
            item_type: r.relationships.base_type.and_then(|b| b.data).map(|d| d.id),
        }
    }
}

/// A work item type defined for a space (story, task, bug...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItemType {
    pub id: String,
    pub name: String,
}

impl From<WorkItemTypeRecord> for WorkItemType {
    fn from(r: WorkItemTypeRecord) -> Self {
        Self {
            id: r.id,
            name: r.attributes.name,
        }
    }
}

// ── Wire records ───────────────────────────────────────────────────

/// Top level JSON:API document. `data` may be missing or null on empty results.
#[derive(Debug, Deserialize)]
pub(crate) struct Document<T> {
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Relation {
    pub data: Option<RelationData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelationData {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpaceRecord {
    #[serde(default)]
    pub links: SpaceLinks,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SpaceLinks {
    pub workitemtypes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IterationRecord {
    pub id: String,
    pub attributes: NamedAttributes,
    #[serde(default)]
    pub relationships: IterationRelationships,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedAttributes {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IterationRelationships {
    pub parent: Option<Relation>,
    pub workitems: Option<WorkItemsRelation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkItemsRelation {
    pub meta: Option<WorkItemsMeta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkItemsMeta {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkItemRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub attributes: WorkItemAttributes,
    #[serde(default)]
    pub relationships: WorkItemRelationships,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WorkItemAttributes {
    pub storypoints: Option<Value>,
    #[serde(rename = "system.state")]
    pub state: Option<String>,
    #[serde(rename = "system.description")]
    pub description: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WorkItemRelationships {
    #[serde(rename = "baseType")]
    pub base_type: Option<Relation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkItemTypeRecord {
    pub id: String,
    pub attributes: NamedAttributes,
}
