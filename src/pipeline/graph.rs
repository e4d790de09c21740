// src/pipeline/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{AssetpipeError, Result};
use crate::types::TaskName;

/// What a name inside a pipeline refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef<'a> {
    Task(&'a str),
    Pipeline(&'a str),
    /// Every task named `<prefix>:*`, in name order.
    MultiTarget(Vec<&'a str>),
}

/// Declared pipelines plus the task names they may refer to.
///
/// Pipelines may list tasks, other pipelines (aliases) or a multi-target
/// prefix: `less` stands for every task named `less:<target>`.
#[derive(Debug)]
pub struct PipelineGraph<'a> {
    declared: &'a BTreeMap<String, Vec<String>>,
    tasks: &'a BTreeSet<TaskName>,
}

impl<'a> PipelineGraph<'a> {
    pub fn new(declared: &'a BTreeMap<String, Vec<String>>, tasks: &'a BTreeSet<TaskName>) -> Self {
        Self { declared, tasks }
    }

    /// Resolve one name. Exact task names win over pipelines, which win
    /// over multi-target prefixes.
    pub fn target(&self, name: &str) -> Option<TargetRef<'a>> {
        if let Some(task) = self.tasks.get(name) {
            return Some(TargetRef::Task(task.as_str()));
        }
        if let Some((key, _)) = self.declared.get_key_value(name) {
            return Some(TargetRef::Pipeline(key.as_str()));
        }
        let prefix = format!("{name}:");
        let members: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| t.starts_with(&prefix))
            .map(String::as_str)
            .collect();
        if members.is_empty() {
            None
        } else {
            Some(TargetRef::MultiTarget(members))
        }
    }

    /// Check references and alias cycles, then flatten every pipeline into
    /// its ordered task list.
    pub fn flatten(&self) -> Result<BTreeMap<String, Vec<TaskName>>> {
        for name in self.declared.keys() {
            if self.tasks.contains(name) {
                return Err(AssetpipeError::ConfigError(format!(
                    "pipeline '{name}' has the same name as a task"
                )));
            }
        }

        let declared = self.declared;

        // Edge direction: alias -> pipeline it includes.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (name, entries) in declared {
            graph.add_node(name.as_str());
            for entry in entries {
                match self.target(entry) {
                    Some(TargetRef::Pipeline(p)) => {
                        graph.add_edge(name.as_str(), p, ());
                    }
                    Some(_) => {}
                    None => {
                        return Err(AssetpipeError::UnknownTaskReference {
                            task: entry.clone(),
                            referrer: format!("pipeline '{name}'"),
                        });
                    }
                }
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            AssetpipeError::PipelineCycle(format!(
                "pipeline '{}' includes itself through its aliases",
                cycle.node_id()
            ))
        })?;

        // Reverse topological order visits included pipelines first.
        let mut flat: BTreeMap<String, Vec<TaskName>> = BTreeMap::new();
        for name in order.into_iter().rev() {
            let mut tasks = Vec::new();
            for entry in &declared[name] {
                match self.target(entry) {
                    Some(TargetRef::Task(t)) => tasks.push(t.to_string()),
                    Some(TargetRef::MultiTarget(members)) => {
                        tasks.extend(members.into_iter().map(str::to_string))
                    }
                    Some(TargetRef::Pipeline(p)) => {
                        tasks.extend(flat.get(p).cloned().unwrap_or_default())
                    }
                    None => {}
                }
            }
            flat.insert(name.to_string(), tasks);
        }
        Ok(flat)
    }

    /// Expand a list of names (e.g. a watch rule's tasks) against already
    /// flattened pipelines.
    pub fn expand_names(
        &self,
        names: &[String],
        flat: &BTreeMap<String, Vec<TaskName>>,
        referrer: &str,
    ) -> Result<Vec<TaskName>> {
        let mut out = Vec::new();
        for name in names {
            match self.target(name) {
                Some(TargetRef::Task(t)) => out.push(t.to_string()),
                Some(TargetRef::MultiTarget(members)) => {
                    out.extend(members.into_iter().map(str::to_string))
                }
                Some(TargetRef::Pipeline(p)) => {
                    out.extend(flat.get(p).cloned().unwrap_or_default())
                }
                None => {
                    return Err(AssetpipeError::UnknownTaskReference {
                        task: name.clone(),
                        referrer: referrer.to_string(),
                    });
                }
            }
        }
        Ok(out)
    }
}
