// src/pipeline/metadata.rs

use std::collections::BTreeMap;

use crate::exec::TaskReport;
use crate::template::{ConfigNode, KeyPath, Scope, RUN_NAMESPACE};

/// Values written back by executors, addressable as `run.<task>.<key>`.
///
/// Lives for the whole session: a watch re-run of `index` still sees the
/// `run.concat:js.*` values recorded by the initial build.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    root: ConfigNode,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetadata {
    pub fn new() -> Self {
        let mut root = BTreeMap::new();
        root.insert(RUN_NAMESPACE.to_string(), ConfigNode::empty_map());
        Self {
            root: ConfigNode::Map(root),
        }
    }

    /// Replace everything recorded for `task` with the report's metadata.
    pub fn record(&mut self, task: &str, report: &TaskReport) {
        let values: BTreeMap<String, ConfigNode> = report
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), ConfigNode::Str(v.clone())))
            .collect();

        if let ConfigNode::Map(root) = &mut self.root {
            if let Some(ConfigNode::Map(run)) = root.get_mut(RUN_NAMESPACE) {
                run.insert(task.to_string(), ConfigNode::Map(values));
            }
        }
    }

    pub fn get(&self, task: &str, key: &str) -> Option<&str> {
        self.root
            .child(RUN_NAMESPACE)
            .and_then(|run| run.child(task))
            .and_then(|t| t.child(key))
            .and_then(ConfigNode::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.root
            .child(RUN_NAMESPACE)
            .and_then(ConfigNode::as_map)
            .is_none_or(|m| m.is_empty())
    }
}

impl Scope for RunMetadata {
    fn lookup_node(&self, path: &KeyPath) -> Option<&ConfigNode> {
        self.root.lookup(path)
    }
}
