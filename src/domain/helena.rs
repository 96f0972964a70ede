// Helena CRM records, normalized from loosely-typed upstream JSON
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A sales panel (pipeline) and its ordered steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: String,
    pub title: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub position: i64,
}

/// A card (deal) sitting on a panel step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    pub panel_id: Option<String>,
    pub step_id: Option<String>,
    pub owner: Option<String>,
    pub value: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub contact_ids: Vec<String>,
    pub custom_fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub custom_fields: BTreeMap<String, String>,
}

impl Contact {
    pub fn custom_field(&self, key: &str) -> Option<&str> {
        self.custom_fields.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub id: String,
    pub name: String,
    pub value: Option<f64>,
}

impl Panel {
    /// Returns `None` when the record carries no usable id.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = id_at(value, &["id"])?;
        let mut steps: Vec<Step> = value
            .get("steps")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| Step::from_value(item, index as i64))
                    .collect()
            })
            .unwrap_or_default();
        steps.sort_by_key(|s| s.position);

        Some(Self {
            title: first_string(value, &[&["title"], &["name"]]).unwrap_or_else(|| id.clone()),
            id,
            steps,
        })
    }

    /// Zero-based stage index of a step within this panel.
    pub fn stage_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }
}

impl Step {
    fn from_value(value: &Value, fallback_position: i64) -> Option<Self> {
        let id = id_at(value, &["id"])?;
        Some(Self {
            title: first_string(value, &[&["title"], &["name"]]).unwrap_or_else(|| id.clone()),
            position: value
                .get("position")
                .and_then(Value::as_i64)
                .unwrap_or(fallback_position),
            id,
        })
    }
}

impl Card {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = id_at(value, &["id"])?;
        let contact_ids = value
            .get("contactIds")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(scalar_string).collect())
            .unwrap_or_default();

        Some(Self {
            title: first_string(value, &[&["title"]]).unwrap_or_default(),
            panel_id: id_at(value, &["panelId"]),
            step_id: id_at(value, &["stepId"]),
            owner: first_string(
                value,
                &[&["owner"], &["responsibleUser", "name"], &["responsibleUserName"]],
            ),
            value: value
                .get("monetaryAmount")
                .or_else(|| value.get("value"))
                .and_then(Value::as_f64),
            created_at: timestamp(value, "createdAt"),
            updated_at: timestamp(value, "updatedAt"),
            contact_ids,
            custom_fields: custom_fields(value),
            id,
        })
    }

    pub fn custom_field(&self, key: &str) -> Option<&str> {
        self.custom_fields.get(key).map(String::as_str)
    }
}

impl Contact {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = id_at(value, &["id"])?;
        Some(Self {
            name: first_string(value, &[&["name"]]).unwrap_or_default(),
            created_at: timestamp(value, "createdAt"),
            custom_fields: custom_fields(value),
            id,
        })
    }
}

impl Metric {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = id_at(value, &["id"])?;
        Some(Self {
            name: first_string(value, &[&["name"], &["title"]]).unwrap_or_else(|| id.clone()),
            value: value.get("value").and_then(Value::as_f64),
            id,
        })
    }
}

/// Parses every record, dropping the ones `parse` rejects.
pub fn parse_records<T>(items: &[Value], parse: fn(&Value) -> Option<T>) -> Vec<T> {
    items.iter().filter_map(parse).collect()
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn first_string(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn id_at(value: &Value, path: &[&str]) -> Option<String> {
    lookup(value, path).and_then(scalar_string)
}

/// Strings and numbers become strings; anything else is absent.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Accepts `{"key": "value"}` objects and `[{"key": .., "value": ..}]` lists.
fn custom_fields(value: &Value) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    match value.get("customFields") {
        Some(Value::Object(map)) => {
            for (key, field) in map {
                if let Some(text) = scalar_string(field) {
                    fields.insert(key.clone(), text);
                }
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                let key = first_string(entry, &[&["key"], &["name"]]);
                let text = entry.get("value").and_then(scalar_string);
                if let (Some(key), Some(text)) = (key, text) {
                    fields.insert(key, text);
                }
            }
        }
        _ => {}
    }
    fields
}
