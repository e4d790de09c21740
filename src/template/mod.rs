// src/template/mod.rs

//! Config Tree and template placeholder resolution.
//!
//! - [`node`] defines [`ConfigNode`], the nested value tree built from the
//!   config file plus the package descriptor, and [`ConfigTree`], the
//!   read-only resolved form.
//! - [`parse`] turns strings containing `<%= a.b.c %>` placeholders into
//!   typed [`Template`]s.
//! - [`resolve`] substitutes placeholders across the whole tree with
//!   memoization and cycle detection.
//! - [`render`] renders single templates against a [`Scope`], which is used
//!   for runtime (`run.*`) references and by the HTML renderer.

pub mod node;
pub mod parse;
pub mod render;
pub mod resolve;

pub use node::{ConfigNode, ConfigTree};
pub use parse::{has_placeholders, KeyPath, Segment, Template, RUN_NAMESPACE};
pub use render::{render_deferred, render_template, render_text, Scope};
pub use resolve::resolve_tree;
