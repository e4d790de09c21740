// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::template::ConfigTree;
use crate::types::PostCondition;

/// Name of the implicit task that re-validates the config file on change.
pub const CONFIG_VALIDATE_TASK: &str = "config:validate";

/// Name of the implicit watch rule for the config file.
pub const CONFIG_WATCH_RULE: &str = "config";

/// Typed sections of the config file, read from the *resolved* tree.
///
/// Everything else in the document (free-form variable tables such as
/// `[dir]` or `[vendor_files]`) only exists to be referenced by placeholders
/// and is ignored here.
///
/// ```toml
/// [config]
/// debounce_ms = 200
///
/// [dir]
/// build = "build"
///
/// [task."concat:css"]
/// executor = "concat"
/// inputs = { src = ["<%= dir.build %>/css/*.css"] }
/// output = "<%= dir.build %>/app.css"
///
/// [pipeline]
/// build = ["concat:css"]
/// compile = []
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task."<name>"]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Named pipelines: ordered lists of task, pipeline or multi-target names.
    #[serde(default, deserialize_with = "flat_string_map")]
    pub pipeline: BTreeMap<String, Vec<String>>,

    /// `[[watch]]` rules.
    #[serde(default)]
    pub watch: Vec<WatchRuleConfig>,

    #[serde(default)]
    pub server: Option<ServerSection>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Package descriptor, relative to the project root. Mounted at `pkg`.
    #[serde(default = "default_package")]
    pub package: String,

    /// Quiet window before a batch of file changes is dispatched.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Default livereload flag for watch rules that don't set one.
    #[serde(default = "default_livereload")]
    pub livereload: bool,

    /// Skip change events whose file content hash did not change.
    #[serde(default)]
    pub use_hash: bool,

    /// Pipeline whose order decides how tasks from several rules are sorted.
    #[serde(default = "default_watch_pipeline")]
    pub watch_pipeline: String,
}

fn default_package() -> String {
    "package.json".to_string()
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_livereload() -> bool {
    true
}

fn default_watch_pipeline() -> String {
    "build".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            package: default_package(),
            debounce_ms: default_debounce_ms(),
            livereload: default_livereload(),
            use_hash: false,
            watch_pipeline: default_watch_pipeline(),
        }
    }
}

/// `[task."<name>"]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Executor id, e.g. `"concat"` or `"command"`.
    pub executor: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Named input groups. Each value is a pattern string, a (possibly
    /// nested) list of pattern strings, or a table `{ cwd, patterns }`.
    #[serde(default)]
    pub inputs: BTreeMap<String, toml::Value>,

    /// Output path, relative to the project root.
    #[serde(default)]
    pub output: Option<String>,

    /// Executor-specific options, passed through untouched.
    #[serde(default)]
    pub options: toml::Table,

    #[serde(default)]
    pub post_condition: Option<PostCondition>,

    /// Fail the task when its inputs expand to zero files.
    #[serde(default)]
    pub require_inputs: bool,
}

impl TaskConfig {
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: executor.into(),
            description: None,
            inputs: BTreeMap::new(),
            output: None,
            options: toml::Table::new(),
            post_condition: None,
            require_inputs: false,
        }
    }
}

/// `[[watch]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    pub name: String,

    /// Trigger patterns, relative to the project root (`!` excludes).
    #[serde(deserialize_with = "flat_strings")]
    pub files: Vec<String>,

    /// Tasks (or pipelines / multi-target names) to run on a match.
    #[serde(deserialize_with = "flat_strings")]
    pub tasks: Vec<String>,

    /// Overrides `[config].livereload` for this rule.
    #[serde(default)]
    pub livereload: Option<bool>,
}

/// A string or a nested list of strings. A lone placeholder such as
/// `"<%= app_files.js %>"` inside a list resolves to a whole list, so
/// `["<%= app_files.js %>", "!src/legacy/**"]` arrives nested.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringTree {
    One(String),
    Many(Vec<StringTree>),
}

impl StringTree {
    fn flatten_into(self, out: &mut Vec<String>) {
        match self {
            StringTree::One(s) => out.push(s),
            StringTree::Many(items) => items.into_iter().for_each(|i| i.flatten_into(out)),
        }
    }

    fn flatten(self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }
}

fn flat_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    StringTree::deserialize(deserializer).map(StringTree::flatten)
}

fn flat_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, StringTree>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.flatten())).collect())
}

/// `[server]` section: an optional preview server started by `watch`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub cmd: String,

    #[serde(default)]
    pub cwd: Option<String>,
}

/// Where the config came from and the tree its placeholders resolved to.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path of the config file as given on the command line.
    pub path: PathBuf,
    /// Project root; every relative path in the config is joined onto it.
    pub root: PathBuf,
    pub tree: Arc<ConfigTree>,
}

/// Validated configuration.
///
/// Produced only by [`crate::config::validate::validate_config`]:
/// pipelines are flattened to plain task lists, every referenced task exists
/// and the implicit config-validation task and watch rule have been added.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
    /// Pipelines as declared (before alias expansion), for display.
    pub declared_pipelines: BTreeMap<String, Vec<String>>,
    /// Pipelines flattened to ordered task names.
    pub pipelines: BTreeMap<String, Vec<String>>,
    /// Watch rules with task names flattened.
    pub watch: Vec<WatchRuleConfig>,
    pub server: Option<ServerSection>,
    pub source: ConfigSource,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        pipelines: BTreeMap<String, Vec<String>>,
        source: ConfigSource,
    ) -> Self {
        Self {
            config: raw.config,
            task: raw.task,
            declared_pipelines: raw.pipeline,
            pipelines,
            watch: raw.watch,
            server: raw.server,
            source,
        }
    }

    pub fn tree(&self) -> &Arc<ConfigTree> {
        &self.source.tree
    }

    pub fn root(&self) -> &std::path::Path {
        &self.source.root
    }

    pub fn pipeline(&self, name: &str) -> Option<&[String]> {
        self.pipelines.get(name).map(Vec::as_slice)
    }
}
