//! Mustash is a Mustache-style view engine with a hot-reloading template
//! cache. Point it at a directory of templates and render them by name:
//! every file is compiled once, renders are served from an in-memory
//! index, and a filesystem watch re-scans the directory whenever
//! something under it changes.
//!
//! # Getting started
//!
//! Mustash is built on top of Tokio and can be added to any binary or
//! library Rust project:
//!
//! ```bash
//! cargo add mustash
//! cargo add tokio@1 --features full
//! ```
//!
//! Create an [`Engine`] pointed at your template directory and render:
//!
//! ```no_run
//! use mustash::prelude::*;
//!
//! let engine = Engine::new("templates");
//!
//! let html = engine
//!     .render("index.mustache", &serde_json::json!({ "title": "Hello" }))
//!     .unwrap();
//! ```
//!
//! The first render scans the directory, compiles every template matching
//! the configured filter, and indexes each one under its path relative to
//! the root with the extension stripped. A file at
//! `templates/partials/header.mustache` is indexed as `partials/header`,
//! and also as plain `header` unless flattening is disabled.
//!
//! ### Partials
//!
//! The whole index doubles as the partial table. Any template can include
//! any other indexed template by its key:
//!
//! ```handlebars
//! <main>
//!   {{> partials/header}}
//! </main>
//! ```
//!
//! ### Hot reload
//!
//! With watching enabled (the default), the engine subscribes to change
//! notifications for every directory under the root and rebuilds the
//! whole index when anything changes. Renders that are in flight during a
//! rebuild keep the snapshot they started with; the new index becomes
//! visible atomically once the rebuild completes. Watching needs a Tokio
//! runtime; without one the cache still works, it just has to be
//! refreshed by hand with [`Engine::refresh`].
//!
//! ### Configuration
//!
//! Settings can be built in code or loaded from TOML, where a typo'd key
//! is a hard error:
//!
//! ```
//! use mustash::Config;
//!
//! let config = Config::new()
//!     .filter(&["**/*.mustache", "**/*.stache"])
//!     .flatten(false)
//!     .watch(false);
//!
//! assert!(Config::from_toml("banana = true").is_err());
//! ```
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod logging;
pub mod prelude;
pub mod scan;
pub mod watch;

pub use config::Config;
pub use engine::{Engine, Template};
pub use error::Error;
pub use logging::Logger;

/// Templates are compiled and rendered by Handlebars.
pub use handlebars;
/// Serde is used for (de)serialization.
pub use serde;
/// Tokio is an asynchronous runtime for Rust.
pub use tokio;
