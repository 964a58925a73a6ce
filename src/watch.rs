//! Filesystem watch fan-out.
//!
//! A refresh opens one non-recursive subscription per directory under the
//! template root, the root itself included. The whole set is torn down and
//! rebuilt on every refresh rather than diffed against the directory tree;
//! dropping the previous [`WatchSet`] closes every stale handle before new
//! ones are opened, so handles can't leak and a directory is never
//! subscribed twice.
//!
//! A directory created after the current refresh has no subscription until
//! the next refresh enumerates it. Changes inside it still land eventually:
//! creating the directory touches its parent, which is watched, and the
//! refresh that triggers picks the new directory up.
use crate::config::Config;
use crate::scan;

use std::path::Path;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// The active watch subscriptions for one directory tree.
///
/// Dropping the set closes every subscription it holds.
pub struct WatchSet {
    _watcher: RecommendedWatcher,
    directories: usize,
}

impl WatchSet {
    /// Number of directories subscribed.
    pub fn directories(&self) -> usize {
        self.directories
    }
}

/// Replace the active watch set with a fresh one covering the current
/// directory tree under `root`.
///
/// No-op beyond a debug line when watching is disabled. Watch failures are
/// logged and skipped; rendering works without notifications, the cache is
/// just stale until the next manual refresh.
pub(crate) fn refresh(
    root: &Path,
    config: &Config,
    watches: &mut Option<WatchSet>,
    events: &UnboundedSender<Event>,
) {
    // Stale handles close before new ones open.
    *watches = None;

    if !config.watch {
        debug!("template watching disabled");
        return;
    }

    *watches = install(root, events.clone());
}

fn install(root: &Path, events: UnboundedSender<Event>) -> Option<WatchSet> {
    // The callback runs on the notify thread. It only forwards the event
    // into the channel; it must not touch engine state, since the engine
    // drops this watcher while holding its maintenance lock.
    let result = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
        Ok(event) => {
            // Our own refresh reads every template; reacting to reads
            // would feed the scan back into itself.
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }

            let _ = events.send(event);
        }
        Err(err) => warn!("template watch error: {}", err),
    });

    let mut watcher = match result {
        Ok(watcher) => watcher,
        Err(err) => {
            warn!("template watching unavailable: {}", err);
            return None;
        }
    };

    let mut directories = 0;

    for dir in scan::directories(root) {
        match watcher.watch(&dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                debug!("watching {}", dir.display());
                directories += 1;
            }
            Err(err) => warn!("cannot watch {}: {}", dir.display(), err),
        }
    }

    Some(WatchSet {
        _watcher: watcher,
        directories,
    })
}
