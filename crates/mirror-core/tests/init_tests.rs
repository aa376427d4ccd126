//! Bootstrap mirror tests

use mirror_core::{Error, MirrorRoots, init_mirror};
use mirror_fs::{RobustnessConfig, verify_mirror};
use mirror_test_utils::tree::TestTree;
use pretty_assertions::assert_eq;

fn init(tree: &TestTree) -> mirror_core::InitSummary {
    let roots = MirrorRoots::resolve(tree.source(), tree.backup()).unwrap();
    init_mirror(&roots, RobustnessConfig::default()).unwrap()
}

#[test]
fn single_file_is_copied() {
    let tree = TestTree::new().with_file("a.txt", "hello");

    let summary = init(&tree);

    tree.assert_backup_contains("a.txt", "hello");
    assert_eq!(summary.files, 1);
    assert_eq!(summary.bytes, 5);
}

#[test]
fn nested_tree_matches_byte_for_byte() {
    let tree = TestTree::new()
        .with_file("a.txt", "alpha")
        .with_file("docs/b.md", "# beta\n")
        .with_file("docs/deep/c.bin", "\u{0}\u{1}binary")
        .with_dir("empty");

    let summary = init(&tree);

    assert_eq!(summary.directories, 3);
    assert_eq!(summary.files, 3);
    assert!(verify_mirror(tree.source(), tree.backup()).unwrap().is_empty());
    tree.assert_backup_exists("empty");
}

#[test]
fn stale_backup_content_is_replaced() {
    let tree = TestTree::new().with_file("a.txt", "fresh");
    std::fs::create_dir_all(tree.backup_path("old")).unwrap();
    std::fs::write(tree.backup_path("old/leftover.txt"), "stale").unwrap();
    std::fs::write(tree.backup_path("a.txt"), "stale").unwrap();

    init(&tree);

    tree.assert_backup_contains("a.txt", "fresh");
    tree.assert_backup_missing("old");
}

#[test]
fn backup_inside_source_is_refused() {
    let tree = TestTree::new().with_file("a.txt", "hello");
    let result = MirrorRoots::resolve(tree.source(), tree.source_path("_backup"));

    assert!(matches!(result, Err(Error::OverlappingRoots { .. })));
}

#[test]
fn source_inside_backup_is_refused() {
    let tree = TestTree::new();
    let result = MirrorRoots::resolve(tree.source(), tree.root());

    assert!(matches!(result, Err(Error::OverlappingRoots { .. })));
}

#[test]
fn missing_source_is_refused() {
    let tree = TestTree::new();
    let result = MirrorRoots::resolve(tree.source_path("nope"), tree.backup());

    assert!(matches!(result, Err(Error::SourceNotDirectory { .. })));
}
