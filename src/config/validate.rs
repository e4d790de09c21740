// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::config::model::{
    ConfigFile, ConfigSource, RawConfigFile, TaskConfig, WatchRuleConfig, CONFIG_VALIDATE_TASK,
    CONFIG_WATCH_RULE,
};
use crate::errors::{AssetpipeError, Result};
use crate::patterns::PatternGroup;
use crate::pipeline::graph::PipelineGraph;
use crate::template::{ConfigNode, KeyPath};

/// Pipelines every config must declare.
pub const REQUIRED_PIPELINES: [&str; 2] = ["build", "compile"];

/// Validate a raw config and turn it into a [`ConfigFile`].
///
/// Everything that can be checked without touching the filesystem is
/// checked here, so configuration errors surface before any task runs.
pub fn validate_config(mut raw: RawConfigFile, source: ConfigSource) -> Result<ConfigFile> {
    ensure_has_tasks(&raw)?;
    validate_global_config(&raw)?;
    add_implicit_config_watch(&mut raw, &source)?;

    raw.pipeline
        .entry("default".to_string())
        .or_insert_with(|| REQUIRED_PIPELINES.iter().map(|s| s.to_string()).collect());
    for required in REQUIRED_PIPELINES {
        if !raw.pipeline.contains_key(required) {
            return Err(AssetpipeError::ConfigError(format!(
                "missing required pipeline `{required}` in [pipeline]"
            )));
        }
    }

    let task_names: BTreeSet<String> = raw.task.keys().cloned().collect();
    let graph = PipelineGraph::new(&raw.pipeline, &task_names);
    let pipelines = graph.flatten()?;
    warn_duplicates(&pipelines);

    if !pipelines.contains_key(&raw.config.watch_pipeline) {
        return Err(AssetpipeError::ConfigError(format!(
            "[config].watch_pipeline names unknown pipeline '{}'",
            raw.config.watch_pipeline
        )));
    }

    let mut watch = Vec::with_capacity(raw.watch.len());
    for rule in &raw.watch {
        watch.push(validate_watch_rule(rule, &graph, &pipelines)?);
    }

    validate_run_references(&source, &task_names)?;

    raw.watch = watch;
    Ok(ConfigFile::new_unchecked(raw, pipelines, source))
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetpipeError::ConfigError(
            "config must contain at least one [task.\"<name>\"] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(AssetpipeError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    for (name, task) in &cfg.task {
        if name.trim().is_empty() {
            return Err(AssetpipeError::ConfigError(
                "task names must not be empty".to_string(),
            ));
        }
        if task.executor.trim().is_empty() {
            return Err(AssetpipeError::ConfigError(format!(
                "task '{name}' has an empty `executor`"
            )));
        }
    }

    let mut seen = BTreeSet::new();
    for rule in &cfg.watch {
        if !seen.insert(rule.name.as_str()) {
            return Err(AssetpipeError::ConfigError(format!(
                "duplicate watch rule name '{}'",
                rule.name
            )));
        }
    }

    Ok(())
}

/// Add the `config:validate` task and the `config` watch rule, and make
/// sure no rule reloads the browser because the config file changed.
fn add_implicit_config_watch(cfg: &mut RawConfigFile, source: &ConfigSource) -> Result<()> {
    if cfg.task.contains_key(CONFIG_VALIDATE_TASK) {
        return Err(AssetpipeError::ConfigError(format!(
            "task name '{CONFIG_VALIDATE_TASK}' is reserved"
        )));
    }
    if cfg.watch.iter().any(|r| r.name == CONFIG_WATCH_RULE) {
        return Err(AssetpipeError::ConfigError(format!(
            "watch rule name '{CONFIG_WATCH_RULE}' is reserved"
        )));
    }

    let mut task = TaskConfig::new("validate_config");
    task.description = Some("Re-validate the config file".to_string());
    cfg.task.insert(CONFIG_VALIDATE_TASK.to_string(), task);

    let file_name = source
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            AssetpipeError::ConfigError(format!("config path {:?} has no file name", source.path))
        })?;

    cfg.watch.push(WatchRuleConfig {
        name: CONFIG_WATCH_RULE.to_string(),
        files: vec![file_name],
        tasks: vec![CONFIG_VALIDATE_TASK.to_string()],
        livereload: Some(false),
    });
    Ok(())
}

fn warn_duplicates(pipelines: &BTreeMap<String, Vec<String>>) {
    for (name, tasks) in pipelines {
        let mut seen = BTreeSet::new();
        for task in tasks {
            if !seen.insert(task) {
                warn!(pipeline = %name, task = %task, "task listed more than once; it will run each time");
            }
        }
    }
}

fn validate_watch_rule(
    rule: &WatchRuleConfig,
    graph: &PipelineGraph<'_>,
    pipelines: &BTreeMap<String, Vec<String>>,
) -> Result<WatchRuleConfig> {
    if rule.files.is_empty() {
        return Err(AssetpipeError::ConfigError(format!(
            "watch rule '{}' has no `files`",
            rule.name
        )));
    }
    PatternGroup::new(&rule.files).map_err(|e| {
        AssetpipeError::ConfigError(format!("watch rule '{}': {e:#}", rule.name))
    })?;

    let referrer = format!("watch rule '{}'", rule.name);
    let mut tasks = graph.expand_names(&rule.tasks, pipelines, &referrer)?;
    let mut seen = BTreeSet::new();
    tasks.retain(|t| seen.insert(t.clone()));

    Ok(WatchRuleConfig {
        name: rule.name.clone(),
        files: rule.files.clone(),
        tasks,
        livereload: rule.livereload,
    })
}

/// Every deferred `run.<task>.<key>` reference must name a defined task.
fn validate_run_references(source: &ConfigSource, tasks: &BTreeSet<String>) -> Result<()> {
    fn visit(node: &ConfigNode, at: &KeyPath, tasks: &BTreeSet<String>) -> Result<()> {
        match node {
            ConfigNode::Deferred(t) => {
                for path in t.refs() {
                    if let Some(task) = path.run_task() {
                        if !tasks.contains(task) {
                            return Err(AssetpipeError::UnknownTaskReference {
                                task: task.to_string(),
                                referrer: format!("'{at}'"),
                            });
                        }
                    }
                }
                Ok(())
            }
            ConfigNode::List(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| visit(item, &at.child(i.to_string()), tasks)),
            ConfigNode::Map(m) => m
                .iter()
                .try_for_each(|(k, v)| visit(v, &at.child(k.clone()), tasks)),
            _ => Ok(()),
        }
    }

    visit(source.tree.root(), &KeyPath::root(), tasks)
}
