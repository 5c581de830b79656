//! Engine integration tests.
//!
//! Runs the decision engine end-to-end against in-memory collaborators and
//! real directory trees.

use std::fs;
use std::path::{Path, PathBuf};

use safeupdate::core::{AbortKind, LogLevel, OutcomeKind, PluginId, RunLogger, RunState, Version};
use safeupdate::registry::MemoryRegistry;
use safeupdate::upstream::{FetchErrorKind, MemoryArtifactSource};
use safeupdate::{Engine, EngineOptions};
use tempfile::TempDir;

/// An installation directory with one folder per plugin.
struct Site {
    root: TempDir,
}

impl Site {
    fn new() -> Self {
        Self { root: TempDir::new().unwrap() }
    }

    fn plugin(&self, slug: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.path().join("wp-content/plugins").join(slug);
        fs::create_dir_all(&dir).unwrap();
        for (path, content) in files {
            let file = dir.join(path);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, content).unwrap();
        }
        dir
    }

    fn scratch(&self) -> PathBuf {
        self.root.path().join("scratch")
    }

    fn log_file(&self) -> PathBuf {
        self.root.path().join("safeupdate.log")
    }
}

fn read_log(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_identical_plugin_is_updated() {
    let site = Site::new();
    let dir = site.plugin("hello", &[("a.txt", "x")]);

    let registry = MemoryRegistry::new().with_plugin("hello", "1.7.2", &dir, true);
    let source = MemoryArtifactSource::new().with_release("hello", "1.7.2", &[("a.txt", b"x")]);
    let mut engine =
        Engine::new(registry, source, EngineOptions::new(site.scratch()), RunLogger::memory());

    let outcome = engine.process_plugin(&PluginId::from("hello"));

    assert_eq!(outcome.kind, OutcomeKind::UpdateApplied);
    assert_eq!(engine.state().updated, 1);
    assert_eq!(engine.registry().applied_updates().len(), 1);
}

#[test]
fn test_modified_plugin_is_never_updated() {
    let site = Site::new();
    let dir = site.plugin("hello", &[("a.txt", "x")]);

    let registry = MemoryRegistry::new().with_plugin("hello", "1.7.2", &dir, true);
    let source = MemoryArtifactSource::new().with_release("hello", "1.7.2", &[("a.txt", b"y")]);
    let mut engine =
        Engine::new(registry, source, EngineOptions::new(site.scratch()), RunLogger::memory());

    let outcome = engine.process_plugin(&PluginId::from("hello"));

    assert_eq!(outcome.kind, OutcomeKind::SkippedModified);
    assert_eq!(engine.state().differing, 1);
    assert!(engine.registry().applied_updates().is_empty());

    let report = outcome.report.unwrap();
    assert_eq!(report.changed_content(), ["a.txt".to_string()]);
    assert!(report.unified_diff().contains("-y"));
    assert!(report.unified_diff().contains("+x"));

    // The plugin's files are untouched
    assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "x");
}

#[cfg(unix)]
#[test]
fn test_non_utf8_local_names_block_the_update() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let site = Site::new();
    let dir = site.plugin("demo", &[("a.txt", "x")]);
    fs::write(dir.join(OsStr::from_bytes(b"\xff.php")), "<?php").unwrap();
    fs::write(dir.join(OsStr::from_bytes(b"\xfe.php")), "<?php").unwrap();

    let registry = MemoryRegistry::new().with_plugin("demo", "1.0", &dir, true);
    let release: [(&str, &[u8]); 2] = [("a.txt", b"x"), ("\u{fffd}.php", b"<?php")];
    let source = MemoryArtifactSource::new().with_release("demo", "1.0", &release);
    let mut engine =
        Engine::new(registry, source, EngineOptions::new(site.scratch()), RunLogger::memory());

    let outcome = engine.process_plugin(&PluginId::from("demo"));

    assert_eq!(outcome.kind, OutcomeKind::SkippedModified);
    assert!(engine.registry().applied_updates().is_empty());

    let report = outcome.report.unwrap();
    assert_eq!(report.only_local(), ["\\xfe.php".to_string(), "\\xff.php".to_string()]);
    assert_eq!(report.only_upstream(), ["\u{fffd}.php".to_string()]);
}

#[test]
fn test_fetch_not_found_counts_nothing() {
    let site = Site::new();
    let dir = site.plugin("hello", &[("a.txt", "x")]);

    let registry = MemoryRegistry::new().with_plugin("hello", "1.7.2", &dir, true);
    let mut engine = Engine::new(
        registry,
        MemoryArtifactSource::new(),
        EngineOptions::new(site.scratch()),
        RunLogger::memory(),
    );

    let outcome = engine.process_plugin(&PluginId::from("hello"));

    assert_eq!(outcome.kind, OutcomeKind::Aborted(AbortKind::FetchFailed(FetchErrorKind::NotFound)));
    let state = engine.state();
    assert_eq!(state.updated + state.differing + state.up_to_date, 0);
    assert_eq!(state.completed(), 0);
}

#[test]
fn test_process_all_over_empty_registry() {
    let site = Site::new();
    let mut engine = Engine::new(
        MemoryRegistry::new(),
        MemoryArtifactSource::new(),
        EngineOptions::new(site.scratch()),
        RunLogger::memory(),
    );

    let outcomes = engine.process_all().unwrap();
    let summary = engine.conclude();

    assert!(outcomes.is_empty());
    assert_eq!(summary.state, RunState::default());
    assert!(summary.to_string().contains("Updated:          0"));
}

// ============================================================================
// Multi-plugin Runs
// ============================================================================

#[test]
fn test_mixed_run_counts_each_plugin_once() {
    let site = Site::new();
    let clean = site.plugin("clean", &[("clean.php", "<?php // clean")]);
    let custom = site.plugin("custom", &[("custom.php", "<?php // patched"), ("extra.css", "a{}")]);
    let current = site.plugin("current", &[("current.php", "<?php")]);
    let missing_upstream = site.plugin("missing", &[("missing.php", "<?php")]);

    let registry = MemoryRegistry::new()
        .with_plugin("clean", "2.0", &clean, true)
        .with_plugin("custom", "1.1", &custom, true)
        .with_plugin("current", "3.0", &current, false)
        .with_plugin("missing", "0.9", &missing_upstream, true);
    let source = MemoryArtifactSource::new()
        .with_release("clean", "2.0", &[("clean.php", b"<?php // clean")])
        .with_release("custom", "1.1", &[("custom.php", b"<?php // original")])
        .with_release("current", "3.0", &[("current.php", b"<?php")]);

    let mut engine =
        Engine::new(registry, source, EngineOptions::new(site.scratch()), RunLogger::memory());
    let outcomes = engine.process_all().unwrap();

    let kinds: Vec<_> = outcomes.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OutcomeKind::UpdateApplied,
            OutcomeKind::SkippedModified,
            OutcomeKind::SkippedUpToDate { would_update: false },
            OutcomeKind::Aborted(AbortKind::FetchFailed(FetchErrorKind::NotFound)),
        ]
    );

    let state = engine.state();
    assert_eq!(state.updated, 1);
    assert_eq!(state.differing, 1);
    assert_eq!(state.up_to_date, 1);
    assert_eq!(state.aborted, 1);
    assert_eq!(state.completed(), 3);

    let custom_report = outcomes[1].report.as_ref().unwrap();
    assert_eq!(custom_report.only_local(), ["extra.css".to_string()]);
    assert_eq!(custom_report.changed_content(), ["custom.php".to_string()]);

    assert_eq!(
        engine.registry().applied_updates(),
        vec![(PluginId::from("clean"), Version::from("2.0"))]
    );
}

#[test]
fn test_dry_run_leaves_installation_alone() {
    let site = Site::new();
    let a = site.plugin("a", &[("a.php", "a")]);
    let b = site.plugin("b", &[("b.php", "b")]);

    let registry = MemoryRegistry::new().with_plugin("a", "1", &a, true).with_plugin("b", "1", &b, true);
    let source = MemoryArtifactSource::new()
        .with_release("a", "1", &[("a.php", b"a")])
        .with_release("b", "1", &[("b.php", b"changed")]);
    let options = EngineOptions::new(site.scratch()).with_dry_run(true);
    let mut engine = Engine::new(registry, source, options, RunLogger::memory());

    engine.process_many(&[PluginId::from("a"), PluginId::from("b")]);

    assert!(engine.registry().applied_updates().is_empty());
    assert_eq!(engine.state().up_to_date, 1);
    assert_eq!(engine.state().differing, 1);
    assert!(engine.summary().dry_run);

    let dry_run_events =
        engine.logger().events().iter().filter(|e| e.level == LogLevel::DryRun).count();
    assert_eq!(dry_run_events, 1);
}

#[test]
fn test_scratch_does_not_outlive_plugins() {
    let site = Site::new();
    let a = site.plugin("a", &[("a.php", "a")]);
    let b = site.plugin("b", &[("b.php", "b")]);

    let registry =
        MemoryRegistry::new().with_plugin("a", "1", &a, false).with_plugin("b", "1", &b, false);
    let source = MemoryArtifactSource::new()
        .with_release("a", "1", &[("a.php", b"a")])
        .with_release("b", "1", &[("b.php", b"b")]);
    let mut engine =
        Engine::new(registry, source, EngineOptions::new(site.scratch()), RunLogger::memory());

    engine.process_all().unwrap();

    let leftovers = fs::read_dir(site.scratch()).map(Iterator::count).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn test_flush_cache_invalidates_per_fetch() {
    let site = Site::new();
    let a = site.plugin("a", &[("a.php", "a")]);

    let registry = MemoryRegistry::new().with_plugin("a", "1", &a, false);
    let source = MemoryArtifactSource::new().with_release("a", "1", &[("a.php", b"a")]);
    let options = EngineOptions::new(site.scratch()).with_flush_cache(true);
    let mut engine = Engine::new(registry, source, options, RunLogger::memory());

    engine.process_plugin(&PluginId::from("a"));

    assert_eq!(engine.source().invalidation_count(), 1);
}

// ============================================================================
// Persisted Log
// ============================================================================

#[test]
fn test_log_records_every_outcome() {
    let site = Site::new();
    let a = site.plugin("a", &[("a.php", "a")]);
    let b = site.plugin("b", &[("b.php", "local")]);

    let registry = MemoryRegistry::new().with_plugin("a", "1", &a, true).with_plugin("b", "1", &b, true);
    let source = MemoryArtifactSource::new()
        .with_release("a", "1", &[("a.php", b"a")])
        .with_release("b", "1", &[("b.php", b"upstream")]);
    let logger = RunLogger::open(&site.log_file(), false, false).unwrap();
    let mut engine = Engine::new(registry, source, EngineOptions::new(site.scratch()), logger);

    engine.process_all().unwrap();
    engine.process_plugin(&PluginId::from("ghost"));
    engine.conclude();
    drop(engine);

    let log = read_log(&site.log_file());
    assert!(log.contains("INFO: Updated 'a' (verified at 1)"));
    assert!(log.contains("WARNING: 'b' 1 differs from upstream"));
    assert!(log.contains("DIFF: b 1"));
    assert!(log.contains("+local"));
    assert!(log.contains("ERROR: Plugin 'ghost' is not installed"));
    assert!(log.contains("INFO: Run finished: 1 updated, 1 modified locally"));
}

#[test]
fn test_diffs_only_log_holds_reports_only() {
    let site = Site::new();
    let a = site.plugin("a", &[("a.php", "a")]);
    let b = site.plugin("b", &[("b.php", "local")]);

    let registry = MemoryRegistry::new().with_plugin("a", "1", &a, true).with_plugin("b", "1", &b, true);
    let source = MemoryArtifactSource::new()
        .with_release("a", "1", &[("a.php", b"a")])
        .with_release("b", "1", &[("b.php", b"upstream")]);
    let logger = RunLogger::open(&site.log_file(), false, true).unwrap();
    let mut engine = Engine::new(registry, source, EngineOptions::new(site.scratch()), logger);

    engine.process_all().unwrap();
    engine.conclude();
    drop(engine);

    let log = read_log(&site.log_file());
    assert!(log.contains("DIFF: b 1"));
    assert!(log.contains("--- upstream/b.php"));
    assert!(!log.contains("INFO:"));
    assert!(!log.contains("DIFF: a 1"));
}
