// src/render/index.rs

use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::exec::builtin::{option_error, require_output};
use crate::exec::{ExecContext, ExecFuture, TaskExecutor, TaskInvocation, TaskReport};
use crate::pipeline::TaskDefinition;
use crate::template::render_text;

pub const SCRIPTS_MARKER: &str = "<!-- inject:scripts -->";
pub const STYLES_MARKER: &str = "<!-- inject:styles -->";

/// Script and style references for one entry point, in injection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAssets {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl IndexAssets {
    /// Split root-relative `files` into scripts and styles, keeping their
    /// order, and rewrite each one relative to the served root.
    ///
    /// `root` is removed first, then the first matching `strip` prefix.
    /// Files that are neither `.js` nor `.css` are ignored.
    pub fn collect<I, S>(files: I, root: &str, strip: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut assets = Self::default();
        for file in files {
            let file = file.as_ref();
            let under_root = strip_dir_prefix(file, root);
            let rel = strip
                .iter()
                .map(|p| strip_dir_prefix(under_root, p))
                .find(|s| s.len() != under_root.len())
                .unwrap_or(under_root);

            match Path::new(rel).extension().and_then(|e| e.to_str()) {
                Some("js") => assets.scripts.push(rel.to_string()),
                Some("css") => assets.styles.push(rel.to_string()),
                _ => debug!(file, "not a script or style; skipping"),
            }
        }
        assets
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty()
    }
}

/// Remove `prefix` as a whole leading directory of `path`.
///
/// `build` strips `build/a.js` but not `builder/a.js`. An empty or `.`
/// prefix leaves the path alone.
pub fn strip_dir_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let path = path.strip_prefix("./").unwrap_or(path);
    let prefix = prefix.strip_prefix("./").unwrap_or(prefix).trim_end_matches('/');
    if prefix.is_empty() || prefix == "." {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => path,
    }
}

pub fn script_tag(src: &str) -> String {
    format!(r#"<script type="text/javascript" src="{src}"></script>"#)
}

pub fn style_tag(href: &str) -> String {
    format!(r#"<link rel="stylesheet" type="text/css" href="{href}">"#)
}

/// Replace the injection markers in `template` with one tag per asset.
///
/// Each tag after the first is placed on its own line with the same
/// indentation as the marker. A marker with nothing to inject is removed.
pub fn inject(template: &str, assets: &IndexAssets) -> String {
    let scripts: Vec<String> = assets.scripts.iter().map(|s| script_tag(s)).collect();
    let styles: Vec<String> = assets.styles.iter().map(|s| style_tag(s)).collect();

    let mut out = String::with_capacity(template.len());
    for (i, line) in template.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&inject_line(line, &scripts, &styles));
    }
    out
}

fn inject_line(line: &str, scripts: &[String], styles: &[String]) -> String {
    if !line.contains(SCRIPTS_MARKER) && !line.contains(STYLES_MARKER) {
        return line.to_string();
    }
    let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
    let joiner = format!("\n{indent}");
    line.replace(SCRIPTS_MARKER, &scripts.join(&joiner))
        .replace(STYLES_MARKER, &styles.join(&joiner))
}

/// Render a complete entry point: placeholders first, then the asset tags.
pub fn render_index(
    template: &str,
    at: &str,
    scope: &dyn crate::template::Scope,
    assets: &IndexAssets,
) -> Result<String> {
    let rendered = render_text(template, at, scope)?;
    Ok(inject(&rendered, assets))
}

/// Parent directory of a root-relative output path, `/`-separated.
fn output_parent(output: &str) -> String {
    Path::new(output)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}

/// Writes the HTML entry point.
///
/// Options: `template` (path relative to the project root, required),
/// `root` (served root, default the output's directory), `strip` (extra
/// prefixes to remove from each reference).
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexExecutor;

impl TaskExecutor for IndexExecutor {
    fn check_options(&self, task: &TaskDefinition) -> Result<()> {
        require_output(task)?;
        match task.options.get("template") {
            Some(toml::Value::String(_)) => {}
            Some(_) => return Err(option_error(task, "`options.template` must be a string")),
            None => return Err(option_error(task, "index needs `options.template`")),
        }
        if let Some(root) = task.options.get("root") {
            if !root.is_str() {
                return Err(option_error(task, "`options.root` must be a string"));
            }
        }
        match task.options.get("strip") {
            None | Some(toml::Value::String(_)) => Ok(()),
            Some(toml::Value::Array(items)) if items.iter().all(toml::Value::is_str) => Ok(()),
            Some(_) => Err(option_error(
                task,
                "`options.strip` must be a string or a list of strings",
            )),
        }
    }

    fn execute<'a>(&'a self, invocation: &'a TaskInvocation, ctx: &'a ExecContext) -> ExecFuture<'a> {
        Box::pin(async move {
            let output = invocation.require_output(&ctx.root)?;
            let template_rel = invocation
                .option_str("template")?
                .ok_or_else(|| invocation.fail("missing option `template`"))?;

            let root = match invocation.option_str("root")? {
                Some(r) => r.to_string(),
                None => output_parent(invocation.output.as_deref().unwrap_or_default()),
            };
            let strip = invocation.option_list("strip")?;

            let files = invocation.all_inputs().flat_map(|g| g.root_relative());
            let assets = IndexAssets::collect(files, &root, &strip);

            let template = ctx
                .fs
                .read_to_string(&ctx.root.join(template_rel))
                .map_err(|e| invocation.fail(format!("{e:#}")))?;

            let at = format!("task.{}.options.template", invocation.task);
            let html = render_index(&template, &at, &*ctx.tree, &assets)
                .map_err(|e| invocation.fail(e.to_string()))?;

            ctx.fs
                .write(&output, html.as_bytes())
                .map_err(|e| invocation.fail(format!("{e:#}")))?;

            debug!(
                task = %invocation.task,
                scripts = assets.scripts.len(),
                styles = assets.styles.len(),
                "rendered entry point"
            );
            Ok(TaskReport {
                files_written: vec![output],
                ..TaskReport::default()
            }
            .with_meta("scripts", assets.scripts.len().to_string())
            .with_meta("styles", assets.styles.len().to_string()))
        })
    }
}
