// src/pipeline/registry.rs

use std::collections::BTreeMap;

use crate::config::{ConfigFile, TaskConfig};
use crate::errors::{AssetpipeError, Result};
use crate::exec::ExecutorSet;
use crate::patterns::PatternGroup;
use crate::template::has_placeholders;
use crate::types::{PostCondition, TaskName};

/// One named input group of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    /// Sub-directory of the project root the patterns are relative to.
    pub cwd: String,
    pub patterns: Vec<String>,
}

impl InputSpec {
    /// Accepts a pattern string, a (nested) list of pattern strings, or a
    /// table `{ cwd = "...", patterns = [...] }`.
    pub fn parse(task: &str, name: &str, value: &toml::Value) -> Result<Self> {
        let at = format!("task '{task}' input '{name}'");
        let (cwd, patterns) = match value {
            toml::Value::Table(t) => {
                let cwd = match t.get("cwd") {
                    None => String::new(),
                    Some(toml::Value::String(s)) => s.clone(),
                    Some(_) => {
                        return Err(AssetpipeError::ConfigError(format!(
                            "{at}: `cwd` must be a string"
                        )));
                    }
                };
                let patterns = t.get("patterns").ok_or_else(|| {
                    AssetpipeError::ConfigError(format!("{at}: missing `patterns`"))
                })?;
                (cwd, flatten_patterns(patterns, &at)?)
            }
            other => (String::new(), flatten_patterns(other, &at)?),
        };

        // Static patterns are compiled now so bad globs fail at startup;
        // ones with run-time placeholders are checked when rendered.
        let static_patterns: Vec<&String> =
            patterns.iter().filter(|p| !has_placeholders(p)).collect();
        PatternGroup::new(static_patterns)
            .map_err(|e| AssetpipeError::ConfigError(format!("{at}: {e:#}")))?;

        Ok(Self {
            name: name.to_string(),
            cwd,
            patterns,
        })
    }
}

fn flatten_patterns(value: &toml::Value, at: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    collect_patterns(value, at, &mut out)?;
    Ok(out)
}

fn collect_patterns(value: &toml::Value, at: &str, out: &mut Vec<String>) -> Result<()> {
    match value {
        toml::Value::String(s) => {
            out.push(s.clone());
            Ok(())
        }
        toml::Value::Array(items) => items
            .iter()
            .try_for_each(|item| collect_patterns(item, at, out)),
        other => Err(AssetpipeError::ConfigError(format!(
            "{at}: patterns must be strings, got {}",
            other.type_str()
        ))),
    }
}

/// Static description of a task, built from its `[task."<name>"]` section.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub name: TaskName,
    pub executor: String,
    pub description: Option<String>,
    pub inputs: Vec<InputSpec>,
    /// Output path template, relative to the project root.
    pub output: Option<String>,
    pub options: toml::Table,
    pub post_condition: Option<PostCondition>,
    pub require_inputs: bool,
}

impl TaskDefinition {
    pub fn from_config(name: &str, cfg: &TaskConfig) -> Result<Self> {
        let inputs = cfg
            .inputs
            .iter()
            .map(|(input, value)| InputSpec::parse(name, input, value))
            .collect::<Result<Vec<_>>>()?;

        if cfg.post_condition == Some(PostCondition::OutputExists) && cfg.output.is_none() {
            return Err(AssetpipeError::ConfigError(format!(
                "task '{name}' has post_condition = \"output_exists\" but no `output`"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            executor: cfg.executor.clone(),
            description: cfg.description.clone(),
            inputs,
            output: cfg.output.clone(),
            options: cfg.options.clone(),
            post_condition: cfg.post_condition,
            require_inputs: cfg.require_inputs,
        })
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// A named, ordered list of tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: String,
    pub tasks: Vec<TaskName>,
}

/// All task definitions and flattened pipelines of a config.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDefinition>,
    pipelines: BTreeMap<String, Pipeline>,
}

impl TaskRegistry {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let tasks = cfg
            .task
            .iter()
            .map(|(name, task)| Ok((name.clone(), TaskDefinition::from_config(name, task)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let pipelines = cfg
            .pipelines
            .iter()
            .map(|(name, tasks)| {
                (
                    name.clone(),
                    Pipeline {
                        name: name.clone(),
                        tasks: tasks.clone(),
                    },
                )
            })
            .collect();

        Ok(Self { tasks, pipelines })
    }

    pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }

    /// Tasks to run for a name given on the command line: a pipeline, a
    /// single task, or a multi-target prefix (`less` -> `less:*`).
    pub fn resolve(&self, name: &str) -> Result<Vec<TaskName>> {
        if let Some(p) = self.pipelines.get(name) {
            return Ok(p.tasks.clone());
        }
        if self.tasks.contains_key(name) {
            return Ok(vec![name.to_string()]);
        }
        let prefix = format!("{name}:");
        let members: Vec<TaskName> = self
            .tasks
            .keys()
            .filter(|t| t.starts_with(&prefix))
            .cloned()
            .collect();
        if members.is_empty() {
            return Err(AssetpipeError::UnknownTaskReference {
                task: name.to_string(),
                referrer: "the command line".to_string(),
            });
        }
        Ok(members)
    }

    /// Every task must name a known executor whose option checks pass.
    pub fn check_executors(&self, executors: &ExecutorSet) -> Result<()> {
        for task in self.tasks.values() {
            let executor = executors.get(&task.executor).ok_or_else(|| {
                AssetpipeError::ConfigError(format!(
                    "task '{}' uses unknown executor '{}'",
                    task.name, task.executor
                ))
            })?;
            executor.check_options(task)?;
        }
        Ok(())
    }
}
