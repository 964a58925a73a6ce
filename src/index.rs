//! Compiled template index.
//!
//! A refresh builds one [`TemplateIndex`] from scratch: every file the
//! scanner finds is read, compiled and registered under its lookup keys.
//! Once built, an index is never mutated; the engine swaps the whole
//! thing out on the next refresh. Renders therefore always run against a
//! complete, consistent snapshot.
//!
//! Keys follow the layout of the template root. A file at
//! `views/partials/header.mustache` indexes as `partials/header`, and
//! additionally as `header` when flattening is on. When two files contest
//! a flattened key, the lexicographically last path wins; scan order is
//! sorted, so the winner is the same on every platform.
use crate::config::Config;
use crate::error::Error;
use crate::scan;

use std::collections::HashMap;
use std::fmt;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use handlebars::template::Template as Compiled;
use handlebars::{Handlebars, TemplateError};
use serde::Serialize;
use tracing::{debug, warn};

/// A template source that did not compile.
///
/// Stored in the index in place of the compiled template and surfaced
/// when something tries to render that key, so one broken file never
/// takes the rest of the index down with it.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    path: PathBuf,
    line: Option<usize>,
    column: Option<usize>,
    message: String,
}

impl CompileFailure {
    fn new(path: &Path, err: &TemplateError) -> Self {
        let (line, column) = match err.pos() {
            Some((line, column)) => (Some(line), Some(column)),
            None => (None, None),
        };

        Self {
            path: path.to_owned(),
            line,
            column,
            message: err.reason().to_string(),
        }
    }

    /// Path of the file that failed to compile.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// The compiler's description of what went wrong.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;

        if let Some(line) = self.line {
            write!(f, ":{}", line)?;

            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }

        write!(f, ": {}", self.message)
    }
}

/// One template discovered by a refresh, indexed under one key.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    key: String,
    source: PathBuf,
    failure: Option<CompileFailure>,
}

impl TemplateRecord {
    /// The key this record is indexed under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The file this template was compiled from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Whether the source failed to compile.
    pub fn broken(&self) -> bool {
        self.failure.is_some()
    }

    pub(crate) fn failure(&self) -> Option<&CompileFailure> {
        self.failure.as_ref()
    }
}

/// Immutable mapping from lookup key to compiled template.
///
/// The compiled templates live in a [`Handlebars`] registry, which doubles
/// as the partial-resolution table: a template can reference any other
/// indexed template as `{{> key}}`.
pub struct TemplateIndex {
    registry: Handlebars<'static>,
    records: HashMap<String, TemplateRecord>,
}

impl TemplateIndex {
    /// Scan `root` and compile everything matching the configured filter
    /// into a brand-new index.
    ///
    /// A file that fails to compile is indexed as broken and reported when
    /// its key is used; it does not abort the refresh. A file that
    /// disappears between the scan and the read is skipped.
    pub fn build(root: &Path, config: &Config) -> Result<Self, Error> {
        let files = scan::templates(root, &config.filter)?;

        let mut registry = Handlebars::new();
        let mut records = HashMap::new();

        for path in &files {
            let relative = match path.strip_prefix(root) {
                Ok(relative) => relative,
                Err(_) => {
                    warn!("template {} is outside the root, skipping", path.display());
                    continue;
                }
            };

            let mut keys = vec![path_key(relative)];

            if config.flatten {
                if let Some(flat) = stem_key(relative) {
                    if !keys.contains(&flat) {
                        keys.push(flat);
                    }
                }
            }

            let source = match read_to_string(path) {
                Ok(source) => source,
                Err(err) => {
                    warn!("cannot read template {}: {}", path.display(), err);
                    continue;
                }
            };

            match Compiled::compile(source.as_str()) {
                Ok(template) => {
                    debug!("compiled {}", path.display());

                    for key in keys {
                        registry.register_template(&key, template.clone());
                        records.insert(
                            key.clone(),
                            TemplateRecord {
                                key,
                                source: path.clone(),
                                failure: None,
                            },
                        );
                    }
                }

                Err(err) => {
                    let failure = CompileFailure::new(path, &err);
                    warn!("{}", failure);

                    for key in keys {
                        // A record from an earlier file may still hold this
                        // key; the registry has to lose it too, or partials
                        // would resolve to a template the index calls broken.
                        registry.unregister_template(&key);
                        records.insert(
                            key.clone(),
                            TemplateRecord {
                                key,
                                source: path.clone(),
                                failure: Some(failure.clone()),
                            },
                        );
                    }
                }
            }
        }

        Ok(Self { registry, records })
    }

    /// Render the template indexed under `key`.
    ///
    /// The whole index serves as the partial table, so the template may
    /// reference any other indexed key as a partial.
    pub fn render<T: Serialize>(&self, key: &str, data: &T) -> Result<String, Error> {
        let record = match self.records.get(key) {
            Some(record) => record,
            None => return Err(Error::TemplateMissing(key.to_string())),
        };

        if let Some(failure) = record.failure() {
            return Err(Error::Compile(failure.clone()));
        }

        Ok(self.registry.render(key, data)?)
    }

    /// Look up a record by exact key.
    pub fn get(&self, key: &str) -> Option<&TemplateRecord> {
        self.records.get(key)
    }

    /// All keys in the index, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of keys in the index. Larger than the number of files
    /// when flattening is on.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Debug for TemplateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateIndex")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Relative path with the extension stripped, `/`-separated regardless
/// of platform.
pub(crate) fn path_key(relative: &Path) -> String {
    relative
        .with_extension("")
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// File name with the extension stripped.
pub(crate) fn stem_key(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
