// src/template/render.rs

use crate::errors::{AssetpipeError, Result};
use crate::template::node::{ConfigNode, ConfigTree};
use crate::template::parse::{has_placeholders, KeyPath, Segment, Template};

/// Something placeholders can be looked up in.
pub trait Scope {
    fn lookup_node(&self, path: &KeyPath) -> Option<&ConfigNode>;
}

impl Scope for ConfigTree {
    fn lookup_node(&self, path: &KeyPath) -> Option<&ConfigNode> {
        self.lookup(path)
    }
}

impl Scope for ConfigNode {
    fn lookup_node(&self, path: &KeyPath) -> Option<&ConfigNode> {
        self.lookup(path)
    }
}

/// Render a template to text. Every reference must name a scalar in `scope`.
pub fn render_template(template: &Template, at: &str, scope: &dyn Scope) -> Result<String> {
    let mut out = String::new();
    for seg in template.segments() {
        match seg {
            Segment::Literal(l) => out.push_str(l),
            Segment::Ref(path) => {
                let node = scope
                    .lookup_node(path)
                    .ok_or_else(|| AssetpipeError::UndefinedReference {
                        path: path.to_string(),
                        referrer: at.to_string(),
                    })?;
                let text = node.scalar_text().ok_or_else(|| {
                    AssetpipeError::ConfigError(format!(
                        "'{at}' interpolates non-scalar value '{path}' into text"
                    ))
                })?;
                out.push_str(&text);
            }
        }
    }
    Ok(out)
}

/// Parse and render free text (used for HTML templates).
pub fn render_text(text: &str, at: &str, scope: &dyn Scope) -> Result<String> {
    if !has_placeholders(text) {
        return Ok(text.to_string());
    }
    let template = Template::parse(text, at)?;
    render_template(&template, at, scope)
}

/// Replace every deferred template in `node` with its rendered text.
///
/// Deferred templates may arrive either as [`ConfigNode::Deferred`] or, after
/// a trip through TOML, as strings in canonical `<%= run.x.y %>` form.
pub fn render_deferred(node: &ConfigNode, at: &str, scope: &dyn Scope) -> Result<ConfigNode> {
    match node {
        ConfigNode::Deferred(t) => Ok(ConfigNode::Str(render_template(t, at, scope)?)),
        ConfigNode::Str(s) if has_placeholders(s) => {
            Ok(ConfigNode::Str(render_text(s, at, scope)?))
        }
        ConfigNode::List(items) => items
            .iter()
            .map(|item| render_deferred(item, at, scope))
            .collect::<Result<Vec<_>>>()
            .map(ConfigNode::List),
        ConfigNode::Map(m) => {
            let mut out = std::collections::BTreeMap::new();
            for (k, v) in m {
                out.insert(k.clone(), render_deferred(v, &format!("{at}.{k}"), scope)?);
            }
            Ok(ConfigNode::Map(out))
        }
        other => Ok(other.clone()),
    }
}
