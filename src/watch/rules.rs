// src/watch/rules.rs

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use anyhow::{Context, Result};

use crate::config::{ConfigFile, CONFIG_VALIDATE_TASK, CONFIG_WATCH_RULE};
use crate::patterns::PatternGroup;
use crate::types::TaskName;

/// A compiled `[[watch]]` rule.
#[derive(Clone)]
pub struct WatchRule {
    name: String,
    patterns: PatternGroup,
    tasks: Vec<TaskName>,
    livereload: bool,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .field("livereload", &self.livereload)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    pub fn new<I, S>(name: impl Into<String>, files: I, tasks: Vec<TaskName>, livereload: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        let patterns =
            PatternGroup::new(files).with_context(|| format!("compiling watch rule '{name}'"))?;
        Ok(Self {
            name,
            patterns,
            tasks,
            livereload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn livereload(&self) -> bool {
        self.livereload
    }

    pub fn patterns(&self) -> &PatternGroup {
        &self.patterns
    }

    /// `rel_path` is relative to the project root, `/`-separated.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.patterns.matches(rel_path)
    }
}

/// What a batch of changed paths should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub tasks: Vec<TaskName>,
    /// True if any contributing rule wants a browser reload afterwards.
    pub livereload: bool,
    /// Names of the rules that matched, in rule order.
    pub rules: Vec<String>,
}

/// All watch rules plus the ordering used to merge their task lists.
#[derive(Debug, Clone)]
pub struct WatchRules {
    rules: Vec<WatchRule>,
    /// Position of each task in the reference pipeline.
    pipeline_order: HashMap<TaskName, usize>,
    /// First appearance of each task across the rules' task lists.
    rule_order: HashMap<TaskName, usize>,
    /// The config file's path relative to the project root.
    config_file: String,
}

impl WatchRules {
    /// A change to `config_file` itself is dispatched to the config rule
    /// only and never triggers a livereload.
    pub fn new(rules: Vec<WatchRule>, reference_pipeline: &[TaskName], config_file: impl Into<String>) -> Self {
        let config_file = config_file.into();

        let mut pipeline_order = HashMap::new();
        for (i, task) in reference_pipeline.iter().enumerate() {
            pipeline_order.entry(task.clone()).or_insert(i);
        }

        let mut rule_order = HashMap::new();
        for task in rules.iter().flat_map(|r| r.tasks.iter()) {
            let next = rule_order.len();
            rule_order.entry(task.clone()).or_insert(next);
        }

        Self {
            rules,
            pipeline_order,
            rule_order,
            config_file,
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let rules = cfg
            .watch
            .iter()
            .map(|r| {
                WatchRule::new(
                    r.name.clone(),
                    &r.files,
                    r.tasks.clone(),
                    r.livereload.unwrap_or(cfg.config.livereload),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let reference = cfg
            .pipeline(&cfg.config.watch_pipeline)
            .unwrap_or_default();

        let config_file = cfg
            .source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(rules, reference, config_file))
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Map changed paths to the tasks that must re-run.
    ///
    /// A change to the config file only contributes `config:validate`.
    /// Returns `None` if no rule matched any path.
    pub fn dispatch(&self, paths: &[String]) -> Option<Dispatch> {
        let mut tasks: BTreeSet<TaskName> = BTreeSet::new();
        let mut matched: BTreeSet<usize> = BTreeSet::new();

        for path in paths {
            let path = path.strip_prefix("./").unwrap_or(path);
            if path == self.config_file {
                if let Some(i) = self.rules.iter().position(|r| r.name == CONFIG_WATCH_RULE) {
                    matched.insert(i);
                }
                tasks.insert(CONFIG_VALIDATE_TASK.to_string());
                continue;
            }
            for (i, rule) in self.rules.iter().enumerate() {
                if rule.matches(path) {
                    matched.insert(i);
                    tasks.extend(rule.tasks.iter().cloned());
                }
            }
        }

        if tasks.is_empty() {
            return None;
        }

        let livereload = matched
            .iter()
            .any(|&i| self.rules[i].livereload && self.rules[i].name != CONFIG_WATCH_RULE);

        Some(Dispatch {
            tasks: self.sort_tasks(tasks),
            livereload,
            rules: matched.iter().map(|&i| self.rules[i].name.clone()).collect(),
        })
    }

    /// Order tasks by their position in the reference pipeline; tasks outside
    /// it follow in the order they first appear in the rules.
    pub fn sort_tasks(&self, tasks: impl IntoIterator<Item = TaskName>) -> Vec<TaskName> {
        let mut tasks: Vec<TaskName> = tasks.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        tasks.sort_by_key(|t| match self.pipeline_order.get(t) {
            Some(&i) => (0, i),
            None => (1, self.rule_order.get(t).copied().unwrap_or(usize::MAX)),
        });
        tasks
    }
}
