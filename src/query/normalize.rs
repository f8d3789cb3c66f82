use serde_json::Value;

use super::builder::{Field, OP_EQ};
use crate::model::{Iteration, WorkItemType};
use crate::url::is_uuid;

/// Name to identifier tables for one space.
#[derive(Debug, Clone, Default)]
pub struct NameLookup {
    iterations: Vec<(String, String)>,
    item_types: Vec<(String, String)>,
}

impl NameLookup {
    pub fn new(iterations: &[Iteration], item_types: &[WorkItemType]) -> Self {
        Self {
            iterations: iterations
                .iter()
                .map(|i| (i.name.clone(), i.id.clone()))
                .collect(),
            item_types: item_types
                .iter()
                .map(|t| (t.name.clone(), t.id.clone()))
                .collect(),
        }
    }

    /// Identifier of the first entry named exactly `name`.
    pub fn resolve(&self, field: Field, name: &str) -> Option<&str> {
        let table = match field {
            Field::Iteration => &self.iterations,
            Field::WorkItemType => &self.item_types,
        };
        table
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.as_str())
    }
}

fn field_for_path(path: &str) -> Option<Field> {
    [Field::Iteration, Field::WorkItemType]
        .into_iter()
        .find(|f| path.ends_with(&format!("{}.{OP_EQ}", f.as_str())))
}

fn child_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Replace iteration and work item type names in `expr` with identifiers.
///
/// A string is rewritten when its dotted path (array positions as numeric
/// segments) ends in `iteration.$EQ` or `workitemtype.$EQ`. Values already in
/// identifier form are left alone, as are names with no match in `lookup`.
/// Such a name is still sent to the service and will most likely match
/// nothing. The shape of `expr` is never changed.
pub fn normalize(expr: &Value, lookup: &NameLookup) -> Value {
    let mut out = expr.clone();
    resolve_names(&mut out, "", lookup);
    out
}

fn resolve_names(node: &mut Value, path: &str, lookup: &NameLookup) {
    match node {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                resolve_names(child, &child_path(path, key), lookup);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter_mut().enumerate() {
                resolve_names(child, &child_path(path, &idx.to_string()), lookup);
            }
        }
        Value::String(name) => {
            let Some(field) = field_for_path(path) else {
                return;
            };
            if is_uuid(name) {
                return;
            }
            match lookup.resolve(field, name) {
                Some(id) => *name = id.to_string(),
                None => log::warn!("No {} named '{name}', leaving as-is", field.as_str()),
            }
        }
        _ => {}
    }
}
