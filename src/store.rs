//! Structured configuration store.
//!
//! An ordered tree of string keys to arbitrary values, addressed by dotted
//! paths such as `database.connections.mysql.password`.

use serde_json::{Map, Value};

/// Dotted-path configuration tree the engine writes resolved secrets into.
pub trait ConfigStore {
    /// Value at `path`, if present.
    fn get(&self, path: &str) -> Option<&Value>;

    /// Set `path` to `value`, creating intermediate tables as needed.
    fn set(&mut self, path: &str, value: Value);
}

/// JSON-backed configuration tree. Key order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object. Non-object values give an empty tree.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    /// Load a tree from TOML text.
    pub fn from_toml(text: &str) -> crate::error::Result<Self> {
        let table: toml::Table = toml::from_str(text)
            .map_err(|e| crate::error::Error::Config(format!("bad config tree: {e}")))?;
        let value = serde_json::to_value(table)
            .map_err(|e| crate::error::Error::Config(format!("bad config tree: {e}")))?;
        Ok(Self::from_value(value))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl ConfigStore for ConfigTree {
    fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut node = self.root.get(first)?;
        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut table = &mut self.root;
        for segment in parents {
            let slot = table
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            table = next;
        }

        table.insert((*last).to_string(), value);
    }
}
