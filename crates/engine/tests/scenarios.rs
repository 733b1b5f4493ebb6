// End-to-end scenarios driving the engine over in-memory trees.
//
// Each test seeds a source (and sometimes a destination) tree, runs the
// engine with a specific flag set, and asserts both the filesystem outcome
// and the exact action records drained from the logging sink. The sink is
// thread-local, so every test observes only its own run.

use std::sync::Arc;

use engine::{SyncEngine, SyncError, SyncOptions};
use fsio::FileSystem;
use logging::{drain_events, ActionKind, ActionMode};
use test_support::MemFs;

fn engine_over(
    options: SyncOptions,
    src: &MemFs,
    dst: Option<&MemFs>,
) -> SyncEngine {
    let config = options.build().expect("valid options");
    SyncEngine::new(
        config,
        Arc::new(src.clone()),
        dst.map(|fs| Arc::new(fs.clone()) as _),
    )
}

fn rendered(events: &[logging::ActionEvent]) -> Vec<String> {
    events.iter().map(ToString::to_string).collect()
}

// ==================== Log-only mode (no destination) ====================

#[test]
fn log_only_mode_lists_files_without_writing() {
    let src = MemFs::new();
    src.add_file("/src/a", b"alpha", 1000);
    src.add_file("/src/b", b"beta", 2000);
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/a")
            .source("hdfs://nn/src/b"),
        &src,
        None,
    );
    let summary = engine.run().expect("run succeeds");

    let events = drain_events();
    assert_eq!(
        rendered(&events),
        [
            "COPY_FILE [no-dst] - /src/a",
            "COPY_FILE [no-dst] - /src/b",
        ]
    );
    assert!(events.iter().all(|e| e.mode() == ActionMode::NoDst));
    assert_eq!(summary.files_copied(), 2);
    assert_eq!(summary.bytes_copied(), 9);
    // Nothing else appeared on the source side.
    assert_eq!(src.paths(), ["/src", "/src/a", "/src/b"]);
}

// ==================== Dry-run mirror ====================

#[test]
fn dry_run_logs_intentions_in_walk_order_and_writes_nothing() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/file_1", b"one", 1000);
    src.add_file("/src/test_folder/folder_1/file_2", b"two", 2000);
    let dst = MemFs::new();
    dst.add_dir("/dst");
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/test_folder")
            .dst("hdfs://nn/dst")
            .recurse(true)
            .dry_run(true),
        &src,
        Some(&dst),
    );
    let summary = engine.run().expect("dry run succeeds");

    assert_eq!(
        rendered(&drain_events()),
        [
            "CREATE_DIR [dryrun] - /dst/test_folder",
            "COPY_FILE [dryrun] - /src/test_folder/file_1 --> /dst/test_folder/file_1",
            "CREATE_DIR [dryrun] - /dst/test_folder/folder_1",
            "COPY_FILE [dryrun] - /src/test_folder/folder_1/file_2 --> /dst/test_folder/folder_1/file_2",
        ]
    );
    assert!(!dst.exists("/dst/test_folder").expect("exists"));
    assert_eq!(summary.files_copied(), 2);
    assert_eq!(summary.dirs_created(), 2);
}

// ==================== Size-only equality ====================

#[test]
fn size_only_rerun_reports_same_and_restores_deleted_file() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/file_1", b"one", 1000);
    src.add_file("/src/test_folder/folder_1/file_2", b"two", 2000);
    let dst = MemFs::new();
    dst.add_dir("/dst");

    let options = || {
        SyncOptions::default()
            .source("hdfs://nn/src/test_folder")
            .dst("hdfs://nn/dst")
            .recurse(true)
            .size_only(true)
    };

    engine_over(options(), &src, Some(&dst))
        .run()
        .expect("first run succeeds");
    dst.delete("/dst/test_folder/folder_1/file_2", false)
        .expect("delete file_2");
    drain_events();

    let summary = engine_over(options(), &src, Some(&dst))
        .run()
        .expect("second run succeeds");

    assert_eq!(
        dst.contents("/dst/test_folder/folder_1/file_2")
            .expect("file_2 restored"),
        b"two"
    );
    let same: Vec<_> = drain_events()
        .into_iter()
        .filter(|e| e.kind() == ActionKind::SameFile)
        .collect();
    assert_eq!(same.len(), 1);
    assert_eq!(same[0].detail(), "/dst/test_folder/file_1");
    assert_eq!(summary.files_same(), 1);
    assert_eq!(summary.files_copied(), 1);
}

// ==================== Deletion with filter protection ====================

#[test]
fn excluded_extraneous_entry_survives_deletion_pass() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/file_1", b"one", 1000);
    let dst = MemFs::new();
    dst.add_file("/dst/folder_to_delete/file_to_delete", b"stale", 0);
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/test_folder")
            .dst("hdfs://nn/dst")
            .recurse(true)
            .delete_extraneous(true)
            .filter_rules(["- folder_to_delete"]),
        &src,
        Some(&dst),
    );
    let summary = engine.run().expect("run succeeds");

    assert!(dst
        .exists("/dst/folder_to_delete/file_to_delete")
        .expect("exists"));
    let protected: Vec<_> = drain_events()
        .into_iter()
        .filter(|e| e.kind() == ActionKind::ExcludeDst)
        .collect();
    assert_eq!(protected.len(), 1);
    assert_eq!(protected[0].detail(), "/dst/folder_to_delete");
    assert_eq!(summary.protected(), 1);
    assert_eq!(summary.deleted(), 0);
}

#[test]
fn delete_excluded_overrides_filter_protection() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/file_1", b"one", 1000);
    let dst = MemFs::new();
    dst.add_file("/dst/folder_to_delete/file_to_delete", b"stale", 0);
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/test_folder")
            .dst("hdfs://nn/dst")
            .recurse(true)
            .delete_extraneous(true)
            .delete_excluded(true)
            .filter_rules(["- folder_to_delete"]),
        &src,
        Some(&dst),
    );
    let summary = engine.run().expect("run succeeds");

    assert!(!dst.exists("/dst/folder_to_delete").expect("exists"));
    assert_eq!(summary.deleted(), 1);
}

// ==================== Same-name conflicts ====================

#[test]
fn resolved_conflict_prefers_most_recent_source() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/file_1", b"old contents ", 100_000);
    src.add_file("/src2/test_folder/file_1", b"new contents!", 200_000);
    let dst = MemFs::new();
    dst.add_dir("/dst");
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/*")
            .source("hdfs://nn/src2/*")
            .dst("hdfs://nn/dst")
            .recurse(true)
            .times(true)
            .resolve_conflicts(true)
            .use_most_recent_modif_times(true),
        &src,
        Some(&dst),
    );
    engine.run().expect("run succeeds");

    let copied = dst.stat("/dst/test_folder/file_1").expect("stat");
    assert_eq!(copied.mtime_ms(), 200_000);
    assert_eq!(
        dst.contents("/dst/test_folder/file_1").expect("contents"),
        b"new contents!"
    );
}

#[test]
fn unresolved_conflict_aborts_the_run() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/file_1", b"one version ", 100_000);
    src.add_file("/src2/test_folder/file_1", b"other version", 200_000);
    let dst = MemFs::new();
    dst.add_dir("/dst");
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/*")
            .source("hdfs://nn/src2/*")
            .dst("hdfs://nn/dst")
            .recurse(true),
        &src,
        Some(&dst),
    );
    let err = engine.run().expect_err("must abort");

    assert!(matches!(err, SyncError::SourceConflict { .. }));
    assert!(err.to_string().contains("SRC_CONFLICT"));
    assert!(err.to_string().contains("/dst/test_folder/file_1"));
}

#[test]
fn conflict_between_directories_merges_instead_of_failing() {
    let src = MemFs::new();
    src.add_file("/src/test_folder/from_first", b"1", 1000);
    src.add_file("/src2/test_folder/from_second", b"2", 2000);
    let dst = MemFs::new();
    dst.add_dir("/dst");
    drain_events();

    let engine = engine_over(
        SyncOptions::default()
            .source("hdfs://nn/src/*")
            .source("hdfs://nn/src2/*")
            .dst("hdfs://nn/dst")
            .recurse(true),
        &src,
        Some(&dst),
    );
    engine.run().expect("merge succeeds");

    assert!(dst.exists("/dst/test_folder/from_first").expect("exists"));
    assert!(dst.exists("/dst/test_folder/from_second").expect("exists"));
}
