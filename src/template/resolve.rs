// src/template/resolve.rs

//! Whole-tree placeholder resolution.
//!
//! Every node is resolved through [`Resolver::resolve_path`], which:
//! - returns the memoized value if the node was already resolved,
//! - fails with `CyclicReference` if the node is currently on the visiting
//!   stack,
//! - otherwise resolves the raw node (recursing into whatever it references)
//!   and memoizes the result.
//!
//! Referencing an ancestor of the node being resolved is therefore a cycle,
//! while referencing a sibling (resolved or not) is fine.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::errors::{AssetpipeError, Result};
use crate::template::node::{ConfigNode, ConfigTree};
use crate::template::parse::{has_placeholders, KeyPath, Segment, Template};

/// Resolve every placeholder in `raw`, producing the read-only [`ConfigTree`].
///
/// `run.*` references are validated and kept as [`ConfigNode::Deferred`].
/// Resolving an already-resolved tree yields an identical tree.
pub fn resolve_tree(raw: &ConfigNode) -> Result<ConfigTree> {
    let mut resolver = Resolver::new(raw);
    let root = resolver.resolve_root()?;
    debug!(nodes = resolver.memo.len(), "config tree resolved");
    Ok(ConfigTree::from_resolved(root))
}

/// Either a node borrowed from the raw tree, or one produced by resolving an
/// intermediate placeholder on the way down a path.
enum Cursor<'a> {
    Raw(&'a ConfigNode),
    Owned(ConfigNode),
}

struct Resolver<'a> {
    raw: &'a ConfigNode,
    memo: HashMap<KeyPath, ConfigNode>,
    visiting: Vec<KeyPath>,
}

impl<'a> Resolver<'a> {
    fn new(raw: &'a ConfigNode) -> Self {
        Self {
            raw,
            memo: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    fn resolve_root(&mut self) -> Result<ConfigNode> {
        let raw = self.raw;
        match raw {
            ConfigNode::Map(entries) => {
                let mut out = BTreeMap::new();
                for key in entries.keys() {
                    let path = KeyPath::root().child(key.clone());
                    let value = self.resolve_path(&path, "<root>")?;
                    out.insert(key.clone(), value);
                }
                Ok(ConfigNode::Map(out))
            }
            other => self.resolve_raw(&KeyPath::root(), other),
        }
    }

    fn resolve_path(&mut self, path: &KeyPath, referrer: &str) -> Result<ConfigNode> {
        if let Some(done) = self.memo.get(path) {
            return Ok(done.clone());
        }

        if let Some(pos) = self.visiting.iter().position(|p| p == path) {
            let mut chain: Vec<String> =
                self.visiting[pos..].iter().map(ToString::to_string).collect();
            chain.push(path.to_string());
            return Err(AssetpipeError::CyclicReference { chain });
        }

        self.visiting.push(path.clone());
        let result = self
            .lookup_raw(path, referrer)
            .and_then(|cursor| match cursor {
                Cursor::Raw(node) => self.resolve_raw(path, node),
                Cursor::Owned(node) => Ok(node),
            });
        self.visiting.pop();

        let resolved = result?;
        trace!(path = %path, "resolved config node");
        self.memo.insert(path.clone(), resolved.clone());
        Ok(resolved)
    }

    /// Walk `path` through the raw tree. If a segment lands on a string that
    /// is itself a placeholder (e.g. `x = "<%= y %>"` while looking up `x.z`),
    /// that prefix is resolved first and the walk continues in the result.
    fn lookup_raw(&mut self, path: &KeyPath, referrer: &str) -> Result<Cursor<'a>> {
        let mut cursor = Cursor::Raw(self.raw);

        for (i, seg) in path.segments().iter().enumerate() {
            if let Cursor::Raw(ConfigNode::Str(s)) = &cursor {
                if i > 0 && has_placeholders(s) {
                    let resolved = self.resolve_path(&path.prefix(i), referrer)?;
                    cursor = Cursor::Owned(resolved);
                }
            }

            cursor = match cursor {
                Cursor::Raw(node) => Cursor::Raw(
                    node.child(seg)
                        .ok_or_else(|| undefined(path, referrer))?,
                ),
                Cursor::Owned(node) => Cursor::Owned(
                    node.child(seg)
                        .cloned()
                        .ok_or_else(|| undefined(path, referrer))?,
                ),
            };
        }

        Ok(cursor)
    }

    fn resolve_raw(&mut self, at: &KeyPath, node: &'a ConfigNode) -> Result<ConfigNode> {
        match node {
            ConfigNode::Str(s) if has_placeholders(s) => self.interpolate(at, s),
            ConfigNode::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for i in 0..items.len() {
                    out.push(self.resolve_path(&at.child(i.to_string()), &at.to_string())?);
                }
                Ok(ConfigNode::List(out))
            }
            ConfigNode::Map(entries) => {
                let mut out = BTreeMap::new();
                for key in entries.keys() {
                    let value = self.resolve_path(&at.child(key.clone()), &at.to_string())?;
                    out.insert(key.clone(), value);
                }
                Ok(ConfigNode::Map(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn interpolate(&mut self, at: &KeyPath, text: &str) -> Result<ConfigNode> {
        let at_str = at.to_string();
        let template = Template::parse(text, &at_str)?;

        // A lone placeholder takes the referenced node verbatim, so lists and
        // maps can be spliced by reference.
        if let Some(path) = template.single_ref() {
            if path.is_run() {
                check_run_ref(path, &at_str)?;
                return Ok(ConfigNode::Deferred(template));
            }
            return self.resolve_path(path, &at_str);
        }

        let mut out = Vec::with_capacity(template.segments().len());
        for seg in template.segments() {
            match seg {
                Segment::Literal(l) => out.push(Segment::Literal(l.clone())),
                Segment::Ref(path) if path.is_run() => {
                    check_run_ref(path, &at_str)?;
                    out.push(Segment::Ref(path.clone()));
                }
                Segment::Ref(path) => match self.resolve_path(path, &at_str)? {
                    ConfigNode::Deferred(inner) => out.extend(inner.segments().iter().cloned()),
                    value => {
                        let text = value.scalar_text().ok_or_else(|| {
                            AssetpipeError::ConfigError(format!(
                                "'{at_str}' interpolates non-scalar value '{path}' into text"
                            ))
                        })?;
                        out.push(Segment::Literal(text));
                    }
                },
            }
        }

        let merged = Template::from_segments(out);
        merged.check_literals(&at_str)?;

        if merged.is_literal() {
            Ok(ConfigNode::Str(merged.literal_text()))
        } else {
            Ok(ConfigNode::Deferred(merged))
        }
    }
}

fn check_run_ref(path: &KeyPath, at: &str) -> Result<()> {
    if path.segments().len() < 3 {
        return Err(AssetpipeError::MalformedPlaceholder {
            at: at.to_string(),
            detail: format!("runtime reference '{path}' must have the form run.<task>.<key>"),
        });
    }
    Ok(())
}

fn undefined(path: &KeyPath, referrer: &str) -> AssetpipeError {
    AssetpipeError::UndefinedReference {
        path: path.to_string(),
        referrer: referrer.to_string(),
    }
}
