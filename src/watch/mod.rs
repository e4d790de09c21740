// src/watch/mod.rs

//! Filesystem watching for `assetpipe watch`.
//!
//! - [`watcher`] wraps `notify` and forwards changed paths.
//! - [`debounce`] coalesces bursts of paths into batches, optionally
//!   dropping content-identical changes via [`cache`] and [`hash`].
//! - [`rules`] maps a batch to the ordered tasks that must re-run.
//! - [`reload`] receives livereload notifications.

pub mod cache;
pub mod debounce;
pub mod hash;
pub mod path_utils;
pub mod reload;
pub mod rules;
pub mod watcher;

pub use debounce::{spawn_debouncer, HashFilter};
pub use reload::{LogReloadNotifier, ReloadNotifier};
pub use rules::{Dispatch, WatchRule, WatchRules};
pub use watcher::{spawn_watcher, WatcherHandle};
