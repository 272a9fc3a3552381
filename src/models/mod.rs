use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hypermedia links attached by the backend serializers.
///
/// `self` is always present on stored entities; the related links vary per
/// resource and may be null.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Links {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(flatten)]
    pub related: BTreeMap<String, Option<String>>,
}

impl Links {
    pub fn related(&self, name: &str) -> Option<&str> {
        self.related.get(name).and_then(|v| v.as_deref())
    }
}

/// An entity that lives in a REST collection.
pub trait Resource {
    /// Value identifying the entity inside its collection URL.
    fn key(&self) -> Option<String>;

    fn links(&self) -> &Links;

    /// Prefers the backend-provided `self` link and falls back to
    /// `<collection_url><key>/`.
    fn url(&self, collection_url: &str) -> Option<String> {
        if let Some(url) = &self.links().self_url {
            return Some(url.clone());
        }
        self.key().map(|key| member_url(collection_url, &key))
    }
}

/// `<collection_url><key>/`, the backend's detail URL convention.
pub fn member_url(collection_url: &str, key: &str) -> String {
    let base = collection_url.trim_end_matches('/');
    format!("{base}/{}/", urlencoding::encode(key))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Sprint {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// ISO date (`YYYY-MM-DD`).
    pub end: String,
    #[serde(default)]
    pub links: Links,
}

impl Resource for Sprint {
    fn key(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn links(&self) -> &Links {
        &self.links
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(from = "i64", into = "i64")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Testing,
    Done,
    Other(i64),
}

impl From<i64> for TaskStatus {
    fn from(v: i64) -> Self {
        match v {
            1 => Self::Todo,
            2 => Self::InProgress,
            3 => Self::Testing,
            4 => Self::Done,
            other => Self::Other(other),
        }
    }
}

impl From<TaskStatus> for i64 {
    fn from(s: TaskStatus) -> Self {
        match s {
            TaskStatus::Todo => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Testing => 3,
            TaskStatus::Done => 4,
            TaskStatus::Other(v) => v,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Task {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sprint: Option<i64>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing)]
    pub status_display: String,
    #[serde(default)]
    pub order: i64,
    /// Username of the assignee.
    #[serde(default)]
    pub assigned: Option<String>,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default)]
    pub links: Links,
}

impl Resource for Task {
    fn key(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn links(&self) -> &Links {
        &self.links
    }
}

/// Users are addressed by username rather than id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub links: Links,
}

fn default_active() -> bool {
    true
}

impl Resource for User {
    fn key(&self) -> Option<String> {
        (!self.username.is_empty()).then(|| self.username.clone())
    }

    fn links(&self) -> &Links {
        &self.links
    }
}
