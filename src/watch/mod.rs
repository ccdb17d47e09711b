// src/watch/mod.rs

//! File watching for interactive sessions.
//!
//! This module is responsible for:
//! - Compiling a serve profile's watch bindings (`patterns.rs`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Routing changed paths to task triggers or reload-only notifications.
//!
//! It does **not** know about task dependencies; it only turns filesystem
//! changes into runtime events.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::{route_changes, ChangeRoute};
pub use patterns::{build_bindings, WatchBinding};
pub use watcher::{spawn_watcher, WatcherHandle};
