use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One test case of a benchmark sweep. Identity is the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub grouping_keys: BTreeMap<String, String>,
}

impl Story {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: String::new(),
            tags: BTreeSet::new(),
            grouping_keys: BTreeMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_grouping_key(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.grouping_keys.insert(key.into(), value.into());
        self
    }

    /// Grouping key values ordered by key and joined with `_`.
    pub fn grouping_label(&self) -> Option<String> {
        if self.grouping_keys.is_empty() {
            return None;
        }
        let parts: Vec<&str> =
            self.grouping_keys.values().map(String::as_str).collect();
        Some(parts.join("_"))
    }

    /// The URL (or the name, for URL-less stories) with every
    /// non-alphanumeric character replaced by `_`.
    pub fn file_safe_name(&self) -> String {
        let source = if self.url.is_empty() { &self.name } else { &self.url };
        file_safe(source)
    }
}

impl PartialEq for Story {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Story {}

impl Hash for Story {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

pub(crate) fn file_safe(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
