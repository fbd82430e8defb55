//! Keyword contexts that expressions resolve against.

use super::Value;
use crate::model::Tree;
use indexmap::IndexMap;
use std::fmt;

/// Named values (`stage`, `workspace`, `port`, `item`, ...) plus the tree
/// that node and port handles point into.
#[derive(Debug, Clone, Default)]
pub struct Keywords<'t> {
    tree: Option<&'t Tree>,
    values: IndexMap<String, Value>,
}

impl Keywords<'static> {
    /// Creates an empty context with no tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'t> Keywords<'t> {
    /// Creates an empty context bound to `tree`.
    #[must_use]
    pub fn with_tree(tree: &'t Tree) -> Self {
        Self {
            tree: Some(tree),
            values: IndexMap::new(),
        }
    }

    /// Adds a keyword.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or rebinds a keyword.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Gets a keyword.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the bound tree.
    #[must_use]
    pub fn tree(&self) -> Option<&'t Tree> {
        self.tree
    }

    /// Returns all keyword names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no keywords.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Keywords<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={}", v.describe(self.tree)))
            .collect();
        write!(f, "{{{}}}", entries.join(", "))
    }
}
