// src/template/node.rs

use std::collections::BTreeMap;

use crate::template::parse::{KeyPath, Template};

/// A single value in the configuration tree.
///
/// Scalars, ordered lists and string-keyed maps mirror the TOML/JSON inputs.
/// `Deferred` only appears after resolution: it holds a template whose
/// remaining references point into the runtime `run.*` namespace and are
/// rendered by the scheduler right before the owning task executes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ConfigNode>),
    Map(BTreeMap<String, ConfigNode>),
    Deferred(Template),
}

impl ConfigNode {
    pub fn empty_map() -> Self {
        ConfigNode::Map(BTreeMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Text form of a scalar, used when a placeholder sits inside a longer
    /// string. Floats keep their fractional part (`1.0`, not `1`). Lists and
    /// maps have no text form.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            ConfigNode::Str(s) => Some(s.clone()),
            ConfigNode::Int(i) => Some(i.to_string()),
            ConfigNode::Float(f) => Some(format!("{f:?}")),
            ConfigNode::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Direct child by map key, or by list index when `key` is all digits.
    pub fn child(&self, key: &str) -> Option<&ConfigNode> {
        match self {
            ConfigNode::Map(m) => m.get(key),
            ConfigNode::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub fn lookup(&self, path: &KeyPath) -> Option<&ConfigNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, seg| node.child(seg))
    }

    pub fn from_toml(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ConfigNode::Str(s),
            toml::Value::Integer(i) => ConfigNode::Int(i),
            toml::Value::Float(f) => ConfigNode::Float(f),
            toml::Value::Boolean(b) => ConfigNode::Bool(b),
            toml::Value::Datetime(dt) => ConfigNode::Str(dt.to_string()),
            toml::Value::Array(items) => {
                ConfigNode::List(items.into_iter().map(ConfigNode::from_toml).collect())
            }
            toml::Value::Table(table) => ConfigNode::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, ConfigNode::from_toml(v)))
                    .collect(),
            ),
        }
    }

    /// Convert back to a TOML value so typed sections can be deserialized
    /// with serde. Deferred templates become their canonical `<%= %>` text.
    pub fn to_toml(&self) -> toml::Value {
        match self {
            ConfigNode::Str(s) => toml::Value::String(s.clone()),
            ConfigNode::Int(i) => toml::Value::Integer(*i),
            ConfigNode::Float(f) => toml::Value::Float(*f),
            ConfigNode::Bool(b) => toml::Value::Boolean(*b),
            ConfigNode::List(items) => {
                toml::Value::Array(items.iter().map(ConfigNode::to_toml).collect())
            }
            ConfigNode::Map(m) => {
                let mut table = toml::Table::new();
                for (k, v) in m {
                    table.insert(k.clone(), v.to_toml());
                }
                toml::Value::Table(table)
            }
            ConfigNode::Deferred(t) => toml::Value::String(t.to_string()),
        }
    }

    /// JSON `null` has no TOML counterpart; it becomes an empty string.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigNode::Str(String::new()),
            serde_json::Value::Bool(b) => ConfigNode::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Int(i),
                None => ConfigNode::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => ConfigNode::Str(s),
            serde_json::Value::Array(items) => {
                ConfigNode::List(items.into_iter().map(ConfigNode::from_json).collect())
            }
            serde_json::Value::Object(obj) => ConfigNode::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, ConfigNode::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Fully resolved configuration tree.
///
/// Only [`crate::template::resolve_tree`] constructs this, so holding a
/// `ConfigTree` means no static placeholder is left anywhere in it. It is
/// read-only for the rest of the process and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: ConfigNode,
}

impl ConfigTree {
    pub(crate) fn from_resolved(root: ConfigNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn lookup(&self, path: &KeyPath) -> Option<&ConfigNode> {
        self.root.lookup(path)
    }

    /// Look up a dotted path and return it if it is a string.
    pub fn get_str(&self, dotted: &str) -> Option<&str> {
        let path = KeyPath::parse(dotted)?;
        self.lookup(&path).and_then(ConfigNode::as_str)
    }
}
