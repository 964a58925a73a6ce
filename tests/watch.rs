//! Watch-driven cache invalidation.
//!
//! These tests drive the full lifecycle: first render installs the
//! watches, filesystem changes trigger a refresh, and render output
//! changes without any manual invalidation. Timing depends on the
//! platform's notification backend, so assertions poll with a generous
//! deadline instead of sleeping a fixed amount.
use mustash::prelude::*;

use std::fs::{create_dir_all, remove_file, write};

use tempfile::TempDir;
use tokio::time::{sleep, Duration};

const DEADLINE: u32 = 100;

async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..DEADLINE {
        if check() {
            return;
        }

        sleep(Duration::from_millis(100)).await;
    }

    panic!("timed out waiting for {}", what);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_show_up_without_a_manual_refresh() {
    let root = TempDir::new().unwrap();
    write(root.path().join("index.mustache"), "v1").unwrap();

    let engine = Engine::new(root.path());
    assert_eq!(engine.render("index", &()).unwrap(), "v1");

    write(root.path().join("index.mustache"), "v2").unwrap();

    let reader = engine.clone();
    eventually("the edited template to be re-indexed", move || {
        reader.render("index", &()).unwrap() == "v2"
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_files_are_picked_up() {
    let root = TempDir::new().unwrap();
    create_dir_all(root.path().join("partials")).unwrap();
    write(root.path().join("index.mustache"), "home").unwrap();

    let engine = Engine::new(root.path());
    assert_eq!(engine.keys().unwrap(), vec!["index"]);

    write(root.path().join("partials/nav.mustache"), "<nav/>").unwrap();

    let reader = engine.clone();
    eventually("the new template to appear in the index", move || {
        reader.keys().unwrap().contains(&"partials/nav".to_string())
    })
    .await;

    assert_eq!(engine.render("nav", &()).unwrap(), "<nav/>");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleted_files_drop_out_of_the_index() {
    let root = TempDir::new().unwrap();
    write(root.path().join("index.mustache"), "home").unwrap();
    write(root.path().join("old.mustache"), "old").unwrap();

    let engine = Engine::new(root.path());
    assert_eq!(engine.render("old", &()).unwrap(), "old");

    remove_file(root.path().join("old.mustache")).unwrap();

    let reader = engine.clone();
    eventually("the deleted template to drop out", move || {
        matches!(reader.render("old", &()), Err(Error::TemplateMissing(_)))
    })
    .await;

    // The survivor is unaffected.
    assert_eq!(engine.render("index", &()).unwrap(), "home");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watching_disabled_means_no_invalidation() {
    let root = TempDir::new().unwrap();
    write(root.path().join("index.mustache"), "v1").unwrap();

    let engine = Engine::with_config(root.path(), Config::new().watch(false));
    assert_eq!(engine.render("index", &()).unwrap(), "v1");

    write(root.path().join("index.mustache"), "v2").unwrap();

    // Give a watcher, if one were wrongly installed, ample time to act.
    sleep(Duration::from_millis(500)).await;
    assert_eq!(engine.render("index", &()).unwrap(), "v1");

    // A manual refresh still invalidates.
    engine.refresh().unwrap();
    assert_eq!(engine.render("index", &()).unwrap(), "v2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_refresh_inside_a_runtime_starts_watching_late() {
    let root = TempDir::new().unwrap();
    write(root.path().join("index.mustache"), "v1").unwrap();

    let engine = Engine::new(root.path());

    // Cold start on a thread outside any runtime. The cache works, but
    // nothing can drain watch notifications, so watching stays off.
    {
        let engine = engine.clone();
        std::thread::spawn(move || assert_eq!(engine.render("index", &()).unwrap(), "v1"))
            .join()
            .unwrap();
    }

    // Back inside the runtime, a manual refresh arms the watches and
    // the worker; edits invalidate from here on.
    engine.refresh().unwrap();

    write(root.path().join("index.mustache"), "v2").unwrap();

    let reader = engine.clone();
    eventually("the late-armed watch to pick up the edit", move || {
        reader.render("index", &()).unwrap() == "v2"
    })
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fixing_a_broken_template_heals_its_key() {
    let root = TempDir::new().unwrap();
    write(root.path().join("page.mustache"), "{{#if ready}}").unwrap();

    let engine = Engine::new(root.path());
    assert!(matches!(
        engine.render("page", &()),
        Err(Error::Compile(_))
    ));

    write(root.path().join("page.mustache"), "{{#if ready}}ok{{/if}}").unwrap();

    let reader = engine.clone();
    eventually("the fixed template to compile", move || {
        matches!(
            reader.render("page", &serde_json::json!({ "ready": true })),
            Ok(output) if output == "ok"
        )
    })
    .await;
}
