mod ready;

pub use ready::{ReadinessGate, ReadinessState};

use crate::api::{ApiError, ApiResult};
use crate::models::{member_url, Resource, Sprint, Task, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Base URL of every collection, as listed by the API root.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct CollectionUrls(BTreeMap<String, String>);

impl CollectionUrls {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> ApiResult<&str> {
        self.get(name)
            .ok_or_else(|| ApiError::missing_collection(name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for CollectionUrls {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One page of a paginated list response.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Client-side copy of one page of a REST collection.
#[derive(Clone, Debug)]
pub struct Collection<T> {
    url: String,
    items: Vec<T>,
    meta: CollectionMetadata,
}

impl<T> Collection<T> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            items: Vec::new(),
            meta: CollectionMetadata::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn meta(&self) -> &CollectionMetadata {
        &self.meta
    }

    /// Replaces the contents with a freshly fetched page.
    pub fn apply_page(&mut self, page: Page<T>) {
        self.meta = CollectionMetadata {
            count: page.count,
            next: page.next,
            previous: page.previous,
        };
        self.items = page.results;
    }

    pub fn member_url(&self, key: &str) -> String {
        member_url(&self.url, key)
    }

    pub fn has_next(&self) -> bool {
        self.meta.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.meta.previous.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Resource> Collection<T> {
    /// Adds or replaces an entity created by the backend.
    pub fn insert(&mut self, item: T) {
        match item
            .key()
            .and_then(|k| self.items.iter().position(|x| x.key().as_deref() == Some(k.as_str())))
        {
            Some(i) => self.items[i] = item,
            None => {
                self.items.push(item);
                self.meta.count += 1;
            }
        }
    }

    pub fn find(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|x| x.key().as_deref() == Some(key))
    }

    /// URL of `item`, as used for detail fetches and updates.
    pub fn url_of(&self, item: &T) -> Option<String> {
        item.url(&self.url)
    }
}

/// The shared collections, built once the API root is known.
#[derive(Clone, Debug)]
pub struct Collections {
    pub sprints: Collection<Sprint>,
    pub tasks: Collection<Task>,
    pub users: Collection<User>,
}

impl Collections {
    pub fn from_urls(urls: &CollectionUrls) -> ApiResult<Self> {
        Ok(Self {
            sprints: Collection::new(urls.require("sprints")?),
            tasks: Collection::new(urls.require("tasks")?),
            users: Collection::new(urls.require("users")?),
        })
    }
}
