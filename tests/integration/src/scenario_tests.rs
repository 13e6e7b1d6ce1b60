//! The concrete mirroring scenarios, run through the engine end to end.

use mirror_core::{
    ChangeLog, CopyReason, StopToken, SyncConfig, SyncEngine, SyncMode, SyncOperation,
};
use mirror_fs::NormalizedPath;
use mirror_test_utils::TestTree;
use pretty_assertions::assert_eq;

struct Scenario {
    src: TestTree,
    dst: TestTree,
}

impl Scenario {
    fn new() -> Self {
        Self {
            src: TestTree::new(),
            dst: TestTree::new(),
        }
    }

    fn config(&self, mode: SyncMode) -> SyncConfig {
        SyncConfig::new(self.src.root(), self.dst.root()).with_mode(mode)
    }

    fn engine(&self, config: SyncConfig) -> SyncEngine {
        SyncEngine::new(config).unwrap()
    }

    /// Run one pass with the on-disk log and return the log text.
    fn run(&self, engine: &SyncEngine, pass: u64) -> String {
        let mut log = ChangeLog::open(&engine.config().log_path()).unwrap();
        engine.run_pass(pass, &mut log, &StopToken::new()).unwrap();
        drop(log);
        self.dst.read("log.txt")
    }
}

fn copy(path: &str, reason: CopyReason) -> SyncOperation {
    SyncOperation::Copy {
        path: NormalizedPath::new(path),
        reason,
    }
}

fn delete(path: &str) -> SyncOperation {
    SyncOperation::Delete {
        path: NormalizedPath::new(path),
        in_destination: true,
    }
}

#[test]
fn newer_source_file_is_copied_and_logged() {
    let s = Scenario::new();
    s.src.write_with_mtime("a.txt", "fresh", 2_000_000);
    s.dst.write_with_mtime("a.txt", "stale", 1_000_000);

    let engine = s.engine(s.config(SyncMode::Date));
    assert_eq!(
        engine.plan().unwrap().operations,
        vec![copy("a.txt", CopyReason::Modified)]
    );

    let log = s.run(&engine, 1);
    s.dst.assert_content("a.txt", "fresh");
    assert_eq!(log.matches("] M a.txt").count(), 1, "{log}");
    assert!(!log.contains("ERROR"), "{log}");
}

#[test]
fn unchanged_trees_give_empty_plan_and_header_only_block() {
    let s = Scenario::new();
    s.src.write_with_mtime("a.txt", "fresh", 2_000_000);
    s.dst.write_with_mtime("a.txt", "stale", 1_000_000);

    let engine = s.engine(s.config(SyncMode::Date));
    let first = s.run(&engine, 1);

    assert!(engine.plan().unwrap().operations.is_empty());

    let both = s.run(&engine, 2);
    let second = &both[first.len()..];
    assert!(second.contains("pass #2 mode=date copies=0 deletes=0 errors=0"), "{second}");
    assert_eq!(second.lines().count(), 2, "{second}");
}

#[test]
fn ignored_file_is_untouched_without_delete_flag() {
    let s = Scenario::new();
    s.src.write(".syncignore", "b.txt\n");
    s.src.write_with_mtime("b.txt", "source b", 2_000_000);
    s.dst.write_with_mtime("b.txt", "dest b", 1_000_000);

    let engine = s.engine(s.config(SyncMode::Date));
    let plan = engine.plan().unwrap();
    assert!(
        plan.operations.iter().all(|op| op.path().as_str() != "b.txt"),
        "{:?}",
        plan.operations
    );

    s.run(&engine, 1);
    s.dst.assert_content("b.txt", "dest b");
}

#[test]
fn ignored_file_is_deleted_with_delete_flag() {
    let s = Scenario::new();
    s.src.write(".syncignore", "b.txt\n");
    s.src.write("b.txt", "source b");
    s.dst.write("b.txt", "dest b");

    let engine = s.engine(s.config(SyncMode::Date).with_delete_ignored(true));
    let plan = engine.plan().unwrap();
    assert_eq!(plan.operations[0], delete("b.txt"));
    assert!(!plan.operations.iter().any(|op| op.is_copy() && op.path().as_str() == "b.txt"));

    let log = s.run(&engine, 1);
    s.dst.assert_missing("b.txt");
    assert!(log.contains("] D b.txt"), "{log}");
}

#[test]
fn stray_destination_file_survives_date_mode() {
    let s = Scenario::new();
    s.src.write("a.txt", "a");
    s.dst.write("c.txt", "stray");

    let engine = s.engine(s.config(SyncMode::Date));
    s.run(&engine, 1);

    s.dst.assert_content("c.txt", "stray");
    s.dst.assert_content("a.txt", "a");
}

#[test]
fn reset_removes_stray_and_matches_source() {
    let s = Scenario::new();
    s.src.write(".syncignore", "private.key\n");
    s.src.write("a.txt", "a");
    s.src.write("sub/d.txt", "d");
    s.src.write("private.key", "secret");
    s.dst.write("c.txt", "stray");
    s.dst.write("old/deep/e.txt", "stray");
    s.dst.write("a.txt", "outdated");

    let engine = s.engine(s.config(SyncMode::Reset));
    s.run(&engine, 1);

    s.dst.assert_missing("c.txt");
    s.dst.assert_missing("old");
    let mut expected = s.src.file_set();
    expected.remove("private.key");
    expected.insert("log.txt".to_string());
    assert_eq!(s.dst.file_set(), expected);
    s.dst.assert_content("a.txt", "a");
    s.dst.assert_content("sub/d.txt", "d");
}
