//! Tests for TreeBuilder

use rollup::domain::{ParentRef, Record, ReparentPolicy, TreeArena, TreeBuilder, TreeError};
use rollup::util::testing;
use rstest::rstest;

fn build(input: &str) -> Result<TreeArena<f64>, TreeError> {
    testing::init_test_setup();
    TreeBuilder::new().build_from_str(input)
}

fn children_of(tree: &TreeArena<f64>, name: &str) -> Vec<String> {
    let idx = tree.lookup(name).expect("node exists");
    tree.get_node(idx)
        .expect("live node")
        .children
        .iter()
        .map(|&c| tree.name(c).to_string())
        .collect()
}

#[test]
fn given_adjacency_records_when_building_then_links_parents_and_leaves() {
    // Arrange
    let input = "None,Root\nRoot,A,B\nA,A1,A2\n";

    // Act
    let tree = build(input).unwrap();

    // Assert
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.root().map(|r| tree.name(r)), Some("Root"));
    assert_eq!(children_of(&tree, "Root"), vec!["A", "B"]);
    assert_eq!(children_of(&tree, "A"), vec!["A1", "A2"]);
    assert_eq!(tree.leaf_nodes(), vec!["B", "A1", "A2"]);
    assert_eq!(tree.depth(), 3);
}

#[test]
fn given_child_mentioned_before_its_parent_record_when_building_then_leaf_revoked() {
    let tree = build("A,A1\nNone,Root\nRoot,A\n").unwrap();

    assert_eq!(tree.leaf_nodes(), vec!["A1"]);
    let a = tree.lookup("A").unwrap();
    assert!(!tree.is_leaf(a));
    assert_eq!(tree.get_node(a).and_then(|n| n.parent), tree.root());
}

#[test]
fn given_sentinel_only_when_building_then_single_node_tree() {
    let tree = build("None,Solo\n").unwrap();

    assert_eq!(tree.len(), 1);
    assert_eq!(tree.leaf_nodes(), vec!["Solo"]);
    assert_eq!(tree.root(), tree.lookup("Solo"));
}

#[test]
fn given_no_sentinel_record_when_building_then_missing_root() {
    let result = build("Root,A,B\n");

    assert!(matches!(result, Err(TreeError::MissingRoot)));
}

#[test]
fn given_two_sentinel_records_when_building_then_ambiguous_root() {
    let result = build("None,R1\nNone,R2\n");

    match result {
        Err(TreeError::AmbiguousRoot { first, second }) => {
            assert_eq!(first, "R1");
            assert_eq!(second, "R2");
        }
        other => panic!("expected AmbiguousRoot, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn given_child_with_two_parents_when_fail_fast_then_reparent_conflict() {
    let result = build("None,Root\nRoot,A,B\nA,X\nB,X\n");

    match result {
        Err(TreeError::ReparentConflict {
            child,
            existing,
            requested,
        }) => {
            assert_eq!(child, "X");
            assert_eq!(existing, "A");
            assert_eq!(requested, "B");
        }
        other => panic!("expected ReparentConflict, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn given_child_with_two_parents_when_last_writer_wins_then_moved_and_old_parent_is_leaf() {
    testing::init_test_setup();
    let builder = TreeBuilder::new().with_policy(ReparentPolicy::LastWriterWins);

    let tree: TreeArena<f64> = builder
        .build_from_str("None,Root\nRoot,A,B\nA,X\nB,X\n")
        .unwrap();

    assert_eq!(children_of(&tree, "B"), vec!["X"]);
    assert!(children_of(&tree, "A").is_empty());
    assert!(tree.is_leaf(tree.lookup("A").unwrap()));
    assert!(!tree.is_leaf(tree.lookup("B").unwrap()));
}

#[test]
fn given_named_parent_claiming_root_when_fail_fast_then_sentinel_reported() {
    let result = build("None,Root\nRoot,A\nA,Root\n");

    match result {
        Err(TreeError::ReparentConflict { child, existing, .. }) => {
            assert_eq!(child, "Root");
            assert_eq!(existing, "None");
        }
        other => panic!("expected ReparentConflict, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn given_repeated_edge_when_building_then_single_link() {
    let tree = build("None,Root\nRoot,A\nRoot,A\n").unwrap();

    assert_eq!(children_of(&tree, "Root"), vec!["A"]);
}

#[rstest]
#[case("None,Root\nRoot\n", 2)]
#[case("None,Root\nRoot,,A\n", 2)]
#[case("None,Root,Other\n", 1)]
#[case("None,Root\nA,A\n", 2)]
fn given_malformed_line_when_building_then_reports_line(#[case] input: &str, #[case] line: usize) {
    match build(input) {
        Err(TreeError::MalformedRecord { line: got, .. }) => assert_eq!(got, line),
        other => panic!("expected MalformedRecord, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn given_custom_sentinel_when_building_then_none_is_ordinary_name() {
    testing::init_test_setup();
    let builder = TreeBuilder::new().with_sentinel("ROOT");

    let tree: TreeArena<f64> = builder.build_from_str("ROOT,Top\nTop,None\n").unwrap();

    assert_eq!(tree.leaf_nodes(), vec!["None"]);
}

#[test]
fn given_records_when_building_from_records_then_same_as_text() {
    testing::init_test_setup();
    let records = vec![Record::root("Root"), Record::new("Root", ["A", "B"])];
    assert_eq!(records[0].parent, ParentRef::Root);

    let tree: TreeArena<f64> = TreeBuilder::new().build_from_records(records).unwrap();

    assert_eq!(children_of(&tree, "Root"), vec!["A", "B"]);
}
