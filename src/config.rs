//! Engine configuration.
//!
//! The three recognized settings are `filter`, `flatten` and `watch`.
//! They can be set in code with the builder methods, or loaded from a
//! TOML document:
//!
//! ```toml
//! filter = ["**/*.mustache"]
//! flatten = true
//! watch = true
//! ```
//!
//! An unrecognized setting is a hard error naming the offending key,
//! so a typo can't be silently ignored.
use std::fs::read_to_string;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file not found")]
    Io(#[from] std::io::Error),
}

/// Engine settings. Immutable once the engine is constructed.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Glob patterns, relative to the template root, selecting which
    /// files are templates.
    #[serde(default = "Config::default_filter")]
    pub(crate) filter: Vec<String>,

    /// Index every template under its bare file name in addition to its
    /// path relative to the root.
    #[serde(default = "Config::default_flatten")]
    pub(crate) flatten: bool,

    /// Watch the template root and refresh the cache when files change.
    #[serde(default = "Config::default_watch")]
    pub(crate) watch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
            flatten: Self::default_flatten(),
            watch: Self::default_watch(),
        }
    }
}

impl Config {
    /// Create the default configuration: all `.mustache` files, flattened
    /// keys, watching enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the glob patterns selecting template files.
    pub fn filter(mut self, patterns: &[impl ToString]) -> Self {
        self.filter = patterns.iter().map(|pattern| pattern.to_string()).collect();
        self
    }

    /// Enable or disable indexing templates under their bare file names.
    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// Enable or disable watching the template root for changes.
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Load the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = read_to_string(path)?;
        Self::from_toml(&file)
    }

    /// Parse the configuration from a TOML document. Keys left out keep
    /// their defaults; keys that aren't recognized are an error.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    fn default_filter() -> Vec<String> {
        vec!["**/*.mustache".to_string()]
    }

    fn default_flatten() -> bool {
        true
    }

    fn default_watch() -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();

        assert_eq!(config.filter, vec!["**/*.mustache"]);
        assert!(config.flatten);
        assert!(config.watch);
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .filter(&["**/*.hbs", "**/*.mustache"])
            .flatten(false)
            .watch(false);

        assert_eq!(config.filter, vec!["**/*.hbs", "**/*.mustache"]);
        assert!(!config.flatten);
        assert!(!config.watch);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<(), Error> {
        let config = Config::from_toml(r#"flatten = false"#)?;

        assert_eq!(config.filter, vec!["**/*.mustache"]);
        assert!(!config.flatten);
        assert!(config.watch);

        Ok(())
    }

    #[test]
    fn test_unknown_key_names_the_key() {
        let err = Config::from_toml("banana = true").expect_err("unknown key must fail");

        assert!(err.to_string().contains("banana"));
    }

    #[test]
    fn test_load_from_file() -> Result<(), Error> {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "filter = [\"**/*.stache\"]").unwrap();

        let config = Config::load(file.path())?;
        assert_eq!(config.filter, vec!["**/*.stache"]);

        Ok(())
    }
}
