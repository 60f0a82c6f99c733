use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DirectoryError, ErrorKind};

/// A user, group or membership entry as returned by the directory
pub type Entity = Map<String, Value>;

/// Marker attached to the fallback overview
pub const NOT_RECOGNIZED_MESSAGE: &str = "Query not recognized, fetching general tenant info";

/// Outcome of a directory query
///
/// Serializes without an outer tag so the language model sees the same
/// shapes the directory returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    /// A page of entities, as `{"value": [...]}`
    Collection {
        value: Vec<Entity>,
        #[serde(rename = "@odata.nextLink", skip_serializing_if = "Option::is_none")]
        next_link: Option<String>,
    },

    /// Fallback payload for unrecognized queries
    Overview {
        message: String,
        users: Box<QueryResult>,
        groups: Box<QueryResult>,
    },

    /// Structured failure, as `{"error": "...", "kind": "..."}`
    Error { error: String, kind: ErrorKind },

    /// A single entity
    Entity(Entity),
}

impl QueryResult {
    /// Interpret a successful directory response body
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) => match map.remove("value") {
                Some(Value::Array(items)) => QueryResult::Collection {
                    value: items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::Object(entity) => Some(entity),
                            _ => None,
                        })
                        .collect(),
                    next_link: map
                        .get("@odata.nextLink")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                },
                Some(other) => {
                    // A scalar `value` is an ordinary property of a single entity
                    map.insert("value".to_string(), other);
                    QueryResult::Entity(strip_odata(map))
                }
                None => QueryResult::Entity(strip_odata(map)),
            },
            other => DirectoryError::Upstream {
                status: None,
                message: format!("Unexpected response body: {}", other),
            }
            .into(),
        }
    }

    pub fn collection(value: Vec<Entity>) -> Self {
        QueryResult::Collection {
            value,
            next_link: None,
        }
    }

    /// Entities of a page; empty for any other variant
    pub fn entities(&self) -> &[Entity] {
        match self {
            QueryResult::Collection { value, .. } => value,
            _ => &[],
        }
    }
}

impl From<DirectoryError> for QueryResult {
    fn from(err: DirectoryError) -> Self {
        QueryResult::Error {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Directory object id of an entity, if present
pub fn entity_id(entity: &Entity) -> Option<&str> {
    entity.get("id").and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn strip_odata(mut map: Entity) -> Entity {
    map.retain(|key, _| !key.starts_with("@odata."));
    map
}
