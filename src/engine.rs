//! Template cache manager.
//!
//! The [`Engine`] owns the compiled template index for one directory tree.
//! Templates are compiled once, on the first render, and served from
//! memory afterwards; a filesystem watch triggers a full re-scan whenever
//! anything under the root changes.
//!
//! The engine is a cheap handle. Clone it freely and share it across
//! tasks; every clone reads the same index.
use crate::config::Config;
use crate::error::Error;
use crate::index::{self, TemplateIndex};
use crate::watch::{self, WatchSet};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use notify::Event;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// How long to sit on a filesystem notification before refreshing.
/// Editors save in bursts; one refresh per burst is plenty.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Mustache-style view engine with a hot-reloading template cache.
///
/// ### Example
///
/// ```no_run
/// use mustash::Engine;
///
/// let engine = Engine::new("templates");
/// let html = engine
///     .render("index.mustache", &serde_json::json!({ "title": "Hello" }))
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    config: Config,
    /// The published index. Replaced wholesale by a refresh, never
    /// mutated in place, so a render always sees a complete snapshot.
    index: RwLock<Option<Arc<TemplateIndex>>>,
    /// Serializes cold start and refreshes.
    maintenance: Mutex<Maintenance>,
    events: UnboundedSender<Event>,
}

struct Maintenance {
    watches: Option<WatchSet>,
    /// Taken by the refresh worker when it starts.
    events: Option<UnboundedReceiver<Event>>,
}

impl Engine {
    /// Create an engine serving templates from `root` with the default
    /// configuration.
    ///
    /// No I/O happens here; the first render scans the directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_config(root, Config::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(root: impl AsRef<Path>, config: Config) -> Self {
        let (events, receiver) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(Inner {
                root: root.as_ref().to_owned(),
                config,
                index: RwLock::new(None),
                maintenance: Mutex::new(Maintenance {
                    watches: None,
                    events: Some(receiver),
                }),
                events,
            }),
        }
    }

    /// The template root this engine serves.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Render a template.
    ///
    /// `template` is a filesystem-style path; its file name with the
    /// extension stripped is the lookup key, so `"index.mustache"`,
    /// `"index"` and `"views/index.mustache"` all render the template
    /// indexed as `index`. The template may reference any other indexed
    /// template as a partial by its key.
    ///
    /// The first call scans and compiles the whole directory
    /// synchronously; subsequent calls render from memory.
    pub fn render<T: Serialize>(
        &self,
        template: impl AsRef<Path>,
        data: &T,
    ) -> Result<String, Error> {
        let template = template.as_ref();

        let key = match index::stem_key(template) {
            Some(key) => key,
            None => return Err(Error::TemplateMissing(template.display().to_string())),
        };

        self.index()?.render(&key, data)
    }

    /// Resolve a template by its exact key and pin it to the current
    /// index snapshot.
    ///
    /// Unlike [`Engine::render`], the key is not reduced to a file name,
    /// so path keys like `partials/header` resolve even with flattening
    /// off. A template that failed to compile reports its failure here.
    pub fn template(&self, key: &str) -> Result<Template, Error> {
        let index = self.index()?;

        let record = match index.get(key) {
            Some(record) => record,
            None => return Err(Error::TemplateMissing(key.to_string())),
        };

        if let Some(failure) = record.failure() {
            return Err(Error::Compile(failure.clone()));
        }

        Ok(Template {
            key: key.to_string(),
            source: record.source().to_owned(),
            index,
        })
    }

    /// All template keys currently indexed, sorted.
    pub fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.index()?.keys())
    }

    /// The current index snapshot, building it if this is the first
    /// access.
    ///
    /// The snapshot is immutable; holding on to it across a refresh keeps
    /// serving the old set of templates, which is exactly what an
    /// in-flight render wants.
    pub fn index(&self) -> Result<Arc<TemplateIndex>, Error> {
        if let Some(index) = self.inner.index.read().clone() {
            return Ok(index);
        }

        let mut maintenance = self.inner.maintenance.lock();

        // Lost the race for the first build.
        if let Some(index) = self.inner.index.read().clone() {
            return Ok(index);
        }

        let index = self.rebuild(&mut maintenance)?;
        self.start_worker(&mut maintenance);

        Ok(index)
    }

    /// Re-scan the template root and replace the index.
    ///
    /// Safe to call at any time: concurrent refreshes serialize, in-flight
    /// renders keep their snapshot, and the last completed refresh wins.
    /// This happens automatically behind a filesystem watch; call it
    /// directly to force an invalidation with watching disabled.
    pub fn refresh(&self) -> Result<(), Error> {
        let mut maintenance = self.inner.maintenance.lock();

        self.rebuild(&mut maintenance)?;
        self.start_worker(&mut maintenance);

        Ok(())
    }

    /// Build a fresh index and watch set and publish them. Caller holds
    /// the maintenance lock.
    fn rebuild(&self, maintenance: &mut Maintenance) -> Result<Arc<TemplateIndex>, Error> {
        let started = Instant::now();
        let root = self.inner.root.canonicalize()?;

        watch::refresh(
            &root,
            &self.inner.config,
            &mut maintenance.watches,
            &self.inner.events,
        );

        if let Some(watches) = maintenance.watches.as_ref() {
            debug!("watching {} directories", watches.directories());
        }

        let index = Arc::new(TemplateIndex::build(&root, &self.inner.config)?);

        *self.inner.index.write() = Some(index.clone());

        info!(
            "{} template keys indexed from {} ({:.3} ms)",
            index.len(),
            self.inner.root.display(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(index)
    }

    /// Spawn the refresh worker draining watch notifications, if it isn't
    /// running yet. Without a Tokio runtime the worker can't run; the
    /// cache still works, it just won't notice filesystem changes.
    fn start_worker(&self, maintenance: &mut Maintenance) {
        if !self.inner.config.watch {
            return;
        }

        let mut events = match maintenance.events.take() {
            Some(events) => events,
            None => return, // already running
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                // Nothing will drain the channel, so the watch set just
                // installed must not keep feeding it. A later refresh
                // inside a runtime rebuilds both.
                maintenance.watches = None;
                maintenance.events = Some(events);
                warn!(
                    "template watching needs a tokio runtime; \
                     templates will not hot-reload until a refresh runs inside one"
                );
                return;
            }
        };

        let engine = Arc::downgrade(&self.inner);

        handle.spawn(async move {
            while let Some(event) = events.recv().await {
                debug!("template change: {:?}", event.kind);

                // Coalesce the burst, then re-scan everything once. The
                // notification doesn't say reliably what happened, so any
                // signal means a full refresh.
                sleep(DEBOUNCE).await;
                while events.try_recv().is_ok() {}

                let engine = match engine.upgrade() {
                    Some(inner) => Engine { inner },
                    None => break,
                };

                if let Err(err) = engine.refresh() {
                    warn!("template refresh failed: {}", err);
                }
            }

            debug!("template watch worker stopped");
        });
    }
}

/// A template resolved from the cache, pinned to one index snapshot.
///
/// Cheap to pass around; rendering it repeatedly always produces output
/// from the same snapshot, even if the engine refreshes in between.
#[derive(Clone, Debug)]
pub struct Template {
    key: String,
    source: PathBuf,
    index: Arc<TemplateIndex>,
}

impl Template {
    /// Render this template.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, Error> {
        self.index.render(&self.key, data)
    }

    /// The key this template was resolved by.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The file this template was compiled from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}
