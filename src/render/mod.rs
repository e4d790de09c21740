// src/render/mod.rs

//! HTML entry point rendering.
//!
//! The `index` executor splits a task's inputs into script and style
//! references, makes them relative to the served root and injects them into
//! an HTML template whose `<%= ... %>` placeholders are rendered against the
//! config tree.

pub mod index;

pub use index::{inject, render_index, strip_dir_prefix, IndexAssets, IndexExecutor};
