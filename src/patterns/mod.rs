// src/patterns/mod.rs

//! Pattern groups and glob expansion.
//!
//! A [`PatternGroup`] is an ordered list of include / `!`-exclude globs.
//! [`expand`] turns a group into a concrete, deterministically ordered list
//! of files; [`PatternGroup::matches`] answers the same question for a single
//! path without touching the filesystem (used by watch rules).

pub mod expand;
pub mod group;

pub use expand::{expand, Expansion};
pub use group::{PatternExpr, PatternGroup, Polarity};
