#![allow(dead_code)]

use std::path::PathBuf;

use assetpipe::config::{load_from_str, validate_config, ConfigFile};
use assetpipe::errors::Result;

/// Builder for a config document, loaded and validated through the same
/// path as a real `Assetpipe.toml`.
pub struct ConfigFileBuilder {
    root: PathBuf,
    doc: toml::Table,
}

impl ConfigFileBuilder {
    /// Config rooted at `"."`, matching the `MockFileSystem` convention.
    pub fn new() -> Self {
        Self::at(".")
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            doc: toml::Table::new(),
        }
    }

    /// Set a free-form variable, e.g. `with_var("build_dir", "build")`.
    pub fn with_var(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.doc.insert(key.to_string(), value.into());
        self
    }

    /// Set a key in the `[config]` section.
    pub fn with_config(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        table(&mut self.doc, "config").insert(key.to_string(), value.into());
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfigBuilder) -> Self {
        table(&mut self.doc, "task").insert(name.to_string(), toml::Value::Table(task.build()));
        self
    }

    pub fn with_pipeline(mut self, name: &str, tasks: &[&str]) -> Self {
        table(&mut self.doc, "pipeline").insert(name.to_string(), strings(tasks));
        self
    }

    pub fn with_watch(mut self, name: &str, files: &[&str], tasks: &[&str]) -> Self {
        self.push_watch(name, files, tasks, None);
        self
    }

    pub fn with_watch_livereload(
        mut self,
        name: &str,
        files: &[&str],
        tasks: &[&str],
        livereload: bool,
    ) -> Self {
        self.push_watch(name, files, tasks, Some(livereload));
        self
    }

    fn push_watch(&mut self, name: &str, files: &[&str], tasks: &[&str], livereload: Option<bool>) {
        let mut rule = toml::Table::new();
        rule.insert("name".into(), name.into());
        rule.insert("files".into(), strings(files));
        rule.insert("tasks".into(), strings(tasks));
        if let Some(lr) = livereload {
            rule.insert("livereload".into(), lr.into());
        }
        let watch = self
            .doc
            .entry("watch")
            .or_insert_with(|| toml::Value::Array(Vec::new()));
        if let toml::Value::Array(rules) = watch {
            rules.push(toml::Value::Table(rule));
        }
    }

    /// The TOML text this builder would load.
    pub fn to_toml_string(&self) -> String {
        toml::to_string(&self.doc).expect("config document serializes")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("Assetpipe.toml")
    }

    /// Load and validate; errors are returned for tests that expect them.
    pub fn try_build(self) -> Result<ConfigFile> {
        let text = self.to_toml_string();
        let (raw, source) = load_from_str(&text, &self.config_path())?;
        validate_config(raw, source)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build().expect("Failed to build valid config from builder")
    }

    /// Write the config to `Assetpipe.toml` under the builder's root.
    pub fn write(&self) -> PathBuf {
        let path = self.config_path();
        std::fs::write(&path, self.to_toml_string()).expect("write config file");
        path
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[task."<name>"]` table.
pub struct TaskConfigBuilder {
    task: toml::Table,
}

impl TaskConfigBuilder {
    pub fn new(executor: &str) -> Self {
        let mut task = toml::Table::new();
        task.insert("executor".into(), executor.into());
        Self { task }
    }

    /// Input group given as a list of patterns.
    pub fn input(mut self, group: &str, patterns: &[&str]) -> Self {
        table(&mut self.task, "inputs").insert(group.to_string(), strings(patterns));
        self
    }

    /// Input group with its own working directory.
    pub fn input_in(mut self, group: &str, cwd: &str, patterns: &[&str]) -> Self {
        let mut spec = toml::Table::new();
        spec.insert("cwd".into(), cwd.into());
        spec.insert("patterns".into(), strings(patterns));
        table(&mut self.task, "inputs").insert(group.to_string(), toml::Value::Table(spec));
        self
    }

    /// Input group given as a raw TOML value (string, nested list, table).
    pub fn input_value(mut self, group: &str, value: impl Into<toml::Value>) -> Self {
        table(&mut self.task, "inputs").insert(group.to_string(), value.into());
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.task.insert("output".into(), output.into());
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        table(&mut self.task, "options").insert(key.to_string(), value.into());
        self
    }

    pub fn option_list(self, key: &str, values: &[&str]) -> Self {
        self.option(key, strings(values))
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.insert("description".into(), text.into());
        self
    }

    pub fn require_inputs(mut self) -> Self {
        self.task.insert("require_inputs".into(), true.into());
        self
    }

    pub fn output_exists(mut self) -> Self {
        self.task.insert("post_condition".into(), "output_exists".into());
        self
    }

    pub fn build(self) -> toml::Table {
        self.task
    }
}

fn table<'a>(doc: &'a mut toml::Table, key: &str) -> &'a mut toml::Table {
    let entry = doc
        .entry(key.to_string())
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    match entry {
        toml::Value::Table(t) => t,
        _ => panic!("`{key}` is not a table"),
    }
}

fn strings(items: &[&str]) -> toml::Value {
    toml::Value::Array(items.iter().map(|s| toml::Value::from(*s)).collect())
}
