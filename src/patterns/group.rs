// src/patterns/group.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

/// Whether an expression adds or removes paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

/// One compiled glob expression from a pattern group.
#[derive(Clone)]
pub struct PatternExpr {
    source: String,
    glob: String,
    polarity: Polarity,
    matcher: GlobMatcher,
}

impl fmt::Debug for PatternExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternExpr")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl PatternExpr {
    /// Compile one expression. A leading `!` marks an exclusion; a leading
    /// `./` is dropped since paths are always matched relative to the base.
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        let (polarity, rest) = match trimmed.strip_prefix('!') {
            Some(rest) => (Polarity::Exclude, rest),
            None => (Polarity::Include, trimmed),
        };
        let glob = rest.strip_prefix("./").unwrap_or(rest).to_string();
        if glob.is_empty() {
            anyhow::bail!("empty glob pattern: {source:?}");
        }

        // `*` must not cross `/`; only `**` spans directories.
        let matcher = GlobBuilder::new(&glob)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {source}"))?
            .compile_matcher();

        Ok(Self {
            source: source.to_string(),
            glob,
            polarity,
            matcher,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The glob without its `!` marker or leading `./`.
    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn is_match(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Directory prefix before the first glob metacharacter, e.g. `src/app`
    /// for `src/app/**/*.js`. Empty when the pattern starts with a wildcard.
    pub fn literal_base(&self) -> &str {
        let meta = self
            .glob
            .find(|c| matches!(c, '*' | '?' | '[' | '{'))
            .unwrap_or(self.glob.len());
        if meta == self.glob.len() {
            return match self.glob.rfind('/') {
                Some(i) => &self.glob[..i],
                None => "",
            };
        }
        match self.glob[..meta].rfind('/') {
            Some(i) => &self.glob[..i],
            None => "",
        }
    }

    /// The path itself if the pattern contains no metacharacters.
    pub fn literal_path(&self) -> Option<&str> {
        if self.glob.contains(|c| matches!(c, '*' | '?' | '[' | '{')) {
            None
        } else {
            Some(&self.glob)
        }
    }
}

/// Ordered list of include/exclude glob expressions.
///
/// Membership follows last-match-wins: a path belongs to the group if the
/// last expression matching it is an include.
#[derive(Debug, Clone, Default)]
pub struct PatternGroup {
    exprs: Vec<PatternExpr>,
}

impl PatternGroup {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exprs = patterns
            .into_iter()
            .map(|p| PatternExpr::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { exprs })
    }

    pub fn exprs(&self) -> &[PatternExpr] {
        &self.exprs
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn sources(&self) -> Vec<&str> {
        self.exprs.iter().map(PatternExpr::source).collect()
    }

    /// Returns true if `rel_path` (forward slashes, relative to the group's
    /// base) belongs to this group.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.strip_prefix("./").unwrap_or(rel_path);
        self.exprs
            .iter()
            .rev()
            .find(|e| e.is_match(rel_path))
            .is_some_and(|e| e.polarity == Polarity::Include)
    }
}
