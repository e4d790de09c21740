// src/template/parse.rs

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{AssetpipeError, Result};

/// Root namespace for values written back by executors at run time.
///
/// `<%= run.<task>.<key> %>` is never looked up in the static tree; it stays
/// deferred until the scheduler renders it.
pub const RUN_NAMESPACE: &str = "run";

const OPEN: &str = "<%=";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<%=\s*(.*?)\s*%>").expect("placeholder regex is valid"));

/// Cheap pre-check: does `text` contain placeholder syntax at all?
pub fn has_placeholders(text: &str) -> bool {
    text.contains(OPEN)
}

/// A dotted reference into the config tree, e.g. `dir.filename` or
/// `vendor_files.js.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// The empty path, addressing the root of the tree.
    pub fn root() -> Self {
        KeyPath(Vec::new())
    }

    /// Parse a dotted path. Returns `None` for empty paths, empty segments or
    /// segments with characters outside `[A-Za-z0-9_$:-]`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut segments = Vec::new();
        for seg in text.split('.') {
            if seg.is_empty() || !seg.chars().all(is_segment_char) {
                return None;
            }
            segments.push(seg.to_string());
        }
        Some(KeyPath(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        KeyPath(segments)
    }

    /// The first `len` segments.
    pub fn prefix(&self, len: usize) -> Self {
        KeyPath(self.0[..len.min(self.0.len())].to_vec())
    }

    /// True for paths under the runtime `run.*` namespace.
    pub fn is_run(&self) -> bool {
        self.0.first().map(String::as_str) == Some(RUN_NAMESPACE)
    }

    /// For `run.<task>.<key...>` paths, the task segment.
    pub fn run_task(&self) -> Option<&str> {
        if self.is_run() {
            self.0.get(1).map(String::as_str)
        } else {
            None
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | ':' | '-')
}

/// One piece of a parsed template string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Ref(KeyPath),
}

/// A string split into literal text and typed path references.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `text`, reporting problems against the config location `at`.
    pub fn parse(text: &str, at: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let literal = &text[last..whole.start()];
            check_literal(literal, at)?;
            if !literal.is_empty() {
                segments.push(Segment::Literal(literal.to_string()));
            }

            let expr = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let path = KeyPath::parse(expr).ok_or_else(|| AssetpipeError::MalformedPlaceholder {
                at: at.to_string(),
                detail: format!("'{expr}' is not a dotted path"),
            })?;
            segments.push(Segment::Ref(path));
            last = whole.end();
        }

        let tail = &text[last..];
        check_literal(tail, at)?;
        if !tail.is_empty() {
            segments.push(Segment::Literal(tail.to_string()));
        }

        Ok(Self { segments })
    }

    /// Build from segments, merging adjacent literals.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut merged: Vec<Segment> = Vec::new();
        for seg in segments {
            if let Segment::Literal(s) = &seg {
                if s.is_empty() {
                    continue;
                }
                if let Some(Segment::Literal(prev)) = merged.last_mut() {
                    prev.push_str(s);
                    continue;
                }
            }
            merged.push(seg);
        }
        Self { segments: merged }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn refs(&self) -> impl Iterator<Item = &KeyPath> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Ref(p) => Some(p),
            Segment::Literal(_) => None,
        })
    }

    /// True when the template has no references left.
    pub fn is_literal(&self) -> bool {
        self.refs().next().is_none()
    }

    /// If the whole string is exactly one placeholder, its path.
    pub fn single_ref(&self) -> Option<&KeyPath> {
        match self.segments.as_slice() {
            [Segment::Ref(p)] => Some(p),
            _ => None,
        }
    }

    /// Concatenated literal text (references are skipped).
    pub fn literal_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(l) => Some(l.as_str()),
                Segment::Ref(_) => None,
            })
            .collect()
    }

    /// Reject literal text that would read as placeholder syntax once the
    /// segments are joined back together.
    pub fn check_literals(&self, at: &str) -> Result<()> {
        for seg in &self.segments {
            if let Segment::Literal(l) = seg {
                check_literal(l, at)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            match seg {
                Segment::Literal(l) => f.write_str(l)?,
                Segment::Ref(p) => write!(f, "<%= {p} %>")?,
            }
        }
        Ok(())
    }
}

fn check_literal(literal: &str, at: &str) -> Result<()> {
    if has_placeholders(literal) {
        return Err(AssetpipeError::MalformedPlaceholder {
            at: at.to_string(),
            detail: "unterminated or nested '<%=' placeholder".to_string(),
        });
    }
    Ok(())
}
