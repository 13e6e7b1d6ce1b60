//! Properties that must hold for any tree shape.

use std::collections::BTreeSet;

use mirror_core::{ChangeLog, StopToken, SyncConfig, SyncEngine, SyncMode};
use mirror_test_utils::TestTree;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn file_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a.txt", "b.txt", "c.bin", "notes.md"]).prop_map(String::from)
}

fn rel_path() -> impl Strategy<Value = String> {
    (prop::sample::select(vec!["", "sub/", "sub/deep/", "other/"]), file_name())
        .prop_map(|(dir, name)| format!("{dir}{name}"))
}

fn files() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((rel_path(), "[a-z]{0,12}"), 0..8)
}

fn populate(tree: &TestTree, files: &[(String, String)]) {
    for (path, content) in files {
        tree.write(path, content);
    }
}

fn run_once(engine: &SyncEngine) {
    engine
        .run_pass(1, &mut ChangeLog::new(Vec::new()), &StopToken::new())
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn second_pass_plans_no_copies(source in files(), mode in prop::sample::select(vec![SyncMode::Date, SyncMode::Content])) {
        let src = TestTree::new();
        let dst = TestTree::new();
        populate(&src, &source);

        let engine = SyncEngine::new(SyncConfig::new(src.root(), dst.root()).with_mode(mode)).unwrap();
        run_once(&engine);

        prop_assert_eq!(engine.plan().unwrap().copies(), 0);
    }

    #[test]
    fn ignored_paths_are_never_copied(
        source in files(),
        ignored in prop::collection::btree_set(rel_path(), 0..4),
        mode in prop::sample::select(vec![SyncMode::Date, SyncMode::Content, SyncMode::Reset]),
    ) {
        let src = TestTree::new();
        let dst = TestTree::new();
        populate(&src, &source);
        src.write(".syncignore", &ignored.iter().cloned().collect::<Vec<_>>().join("\n"));

        let engine = SyncEngine::new(SyncConfig::new(src.root(), dst.root()).with_mode(mode)).unwrap();
        let plan = engine.plan().unwrap();

        for op in plan.operations.iter().filter(|op| op.is_copy()) {
            prop_assert!(!ignored.contains(op.path().as_str()), "copied ignored {}", op.path());
        }
    }

    #[test]
    fn deletes_only_target_ignored_paths(
        dest in files(),
        ignored in prop::collection::btree_set(rel_path(), 0..4),
        delete in any::<bool>(),
    ) {
        let src = TestTree::new();
        let dst = TestTree::new();
        populate(&dst, &dest);
        src.write(".syncignore", &ignored.iter().cloned().collect::<Vec<_>>().join("\n"));

        let config = SyncConfig::new(src.root(), dst.root()).with_delete_ignored(delete);
        let plan = SyncEngine::new(config).unwrap().plan().unwrap();

        for op in plan.operations.iter().filter(|op| op.is_delete()) {
            prop_assert!(delete, "delete planned without the flag: {}", op);
            prop_assert!(ignored.contains(op.path().as_str()), "deleted non-ignored {}", op);
        }
    }

    #[test]
    fn reset_leaves_exactly_the_source(source in files(), dest in files()) {
        let src = TestTree::new();
        let dst = TestTree::new();
        populate(&src, &source);
        populate(&dst, &dest);

        let engine = SyncEngine::new(
            SyncConfig::new(src.root(), dst.root()).with_mode(SyncMode::Reset),
        )
        .unwrap();
        run_once(&engine);

        prop_assert_eq!(dst.file_set(), src.file_set());
        for path in src.file_set() {
            prop_assert_eq!(dst.read(&path), src.read(&path));
        }
    }
}

#[test]
fn content_mode_ignores_differing_mtimes() {
    let src = TestTree::new();
    let dst = TestTree::new();
    src.write_with_mtime("a.txt", "identical", 2_000_000);
    dst.write_with_mtime("a.txt", "identical", 1_000_000);
    src.write_with_mtime("b.txt", "identical", 1_000_000);
    dst.write_with_mtime("b.txt", "identical", 2_000_000);

    let engine = SyncEngine::new(
        SyncConfig::new(src.root(), dst.root()).with_mode(SyncMode::Content),
    )
    .unwrap();
    assert_eq!(engine.plan().unwrap().copies(), 0);
}

#[test]
fn whole_second_destination_is_not_stale_with_time_factor() {
    let src = TestTree::new();
    let dst = TestTree::new();
    src.write("a.txt", "payload");
    src.set_mtime_precise("a.txt", 1_700_000_000, 734_000_000);
    dst.write("a.txt", "payload");
    dst.set_mtime("a.txt", 1_700_000_000);

    let precise = SyncEngine::new(SyncConfig::new(src.root(), dst.root())).unwrap();
    assert_eq!(precise.plan().unwrap().copies(), 1);

    let tolerant =
        SyncEngine::new(SyncConfig::new(src.root(), dst.root()).with_time_factor(1e6)).unwrap();
    assert_eq!(tolerant.plan().unwrap().copies(), 0);
}

#[test]
fn rerun_after_reset_is_stable() {
    let src = TestTree::new();
    let dst = TestTree::new();
    src.write("x/y.txt", "y");

    let engine =
        SyncEngine::new(SyncConfig::new(src.root(), dst.root()).with_mode(SyncMode::Date)).unwrap();
    run_once(&engine);
    run_once(&engine);

    let expected: BTreeSet<String> = ["x/y.txt".to_string()].into_iter().collect();
    assert_eq!(dst.file_set(), expected);
}
