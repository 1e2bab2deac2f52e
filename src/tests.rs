// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    traverse::{self, TraversalOrder},
    HasChildren, HasKeyedChildren, HasValue, Hierarchy, HierarchyPath, InsertValueError,
    MutableHierarchy, NoCommonAncestorError, NoParentError, PersistentHierarchy, Traverse,
    UnsupportedMaxDepthError,
};

type Path = HierarchyPath<String>;

fn path(input: &str) -> Path {
    HierarchyPath::parse(input, '/').unwrap()
}

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

// <https://github.com/rust-lang/api-guidelines/issues/223#issuecomment-683346783>
const _: () = {
    const fn assert_send<T: Send>() {}
    let _ = assert_send::<PersistentHierarchy<String, i32>>;
};

// <https://github.com/rust-lang/api-guidelines/issues/223#issuecomment-683346783>
const _: () = {
    const fn assert_sync<T: Sync>() {}
    let _ = assert_sync::<PersistentHierarchy<String, i32>>;
};

#[test]
fn path_equality_and_hash() {
    let one_two = HierarchyPath::new([1, 2]);
    let same = HierarchyPath::new([1, 2]);
    assert_eq!(one_two, same);
    assert_eq!(hash_of(&one_two), hash_of(&same));
    assert_ne!(one_two, HierarchyPath::new([1, 2, 3]));
    assert_ne!(one_two, HierarchyPath::new([2, 1]));

    assert!(one_two.is_ancestor_of(&HierarchyPath::new([1, 2, 3])));
    assert!(!one_two.is_ancestor_of(&one_two));
    assert!(!one_two.is_ancestor_of(&HierarchyPath::new([1])));
    assert!(HierarchyPath::root().is_ancestor_of(&one_two));

    assert_eq!(
        HierarchyPath::new([3]),
        HierarchyPath::new([1, 2, 3])
            .relative_to_ancestor(&one_two)
            .unwrap()
    );
}

#[test]
fn path_parent_leaf_join() {
    let root = Path::root();
    assert!(root.is_root());
    assert_eq!(0, root.segment_count());
    assert_eq!(None, root.parent());
    assert_eq!(root, root.leaf());
    assert_eq!(root, Path::default());

    let deep = path("a/b/c");
    assert!(!deep.is_root());
    assert_eq!(3, deep.segment_count());
    assert_eq!(Some(path("a/b")), deep.parent());
    assert_eq!(path("c"), deep.leaf());
    assert_eq!(path("c"), path("c").leaf());
    assert_eq!(Some(&"a".to_owned()), deep.first_segment());
    assert_eq!(Some(&"c".to_owned()), deep.last_segment());
    assert_eq!(path("a"), deep.prefix(1));

    assert_eq!(deep, path("a/b").join("c".to_owned()));
    assert_eq!(deep, path("a").join_path(&path("b/c")));
    assert_eq!(deep, root.join_path(&deep));
    // joining never mutates the receiver
    let base = path("a");
    let joined = base.join("b".to_owned());
    assert_eq!(path("a/b"), joined);
    assert_eq!(path("a"), base);
}

#[test]
fn path_relative_to_ancestor() {
    let deep = HierarchyPath::new([1, 2, 3]);
    // the root is a no-op ancestor of everything
    assert_eq!(
        deep,
        deep.relative_to_ancestor(&HierarchyPath::root()).unwrap()
    );
    // only the shared prefix is stripped
    assert_eq!(
        HierarchyPath::new([2, 3]),
        deep.relative_to_ancestor(&HierarchyPath::new([1, 9]))
            .unwrap()
    );
    assert_eq!(
        Err(NoCommonAncestorError),
        deep.relative_to_ancestor(&HierarchyPath::new([9]))
    );
}

#[test]
fn path_parse_and_display() {
    assert_eq!(Path::root(), path(""));
    assert_eq!(Path::root(), path("///"));
    assert_eq!(path("foo/bar"), path("//foo///bar/"));
    assert_eq!(
        vec!["foo".to_owned(), "bar".to_owned()],
        path("foo/bar").segments().to_vec()
    );

    assert_eq!("foo/bar", path("foo/bar").to_string());
    assert_eq!("", Path::root().to_string());
    assert_eq!("foo.bar", path("foo/bar").display_with('.').to_string());

    let numeric = HierarchyPath::<u32>::parse("1/2/3", '/').unwrap();
    assert_eq!(HierarchyPath::new([1, 2, 3]), numeric);
    assert!(HierarchyPath::<u32>::parse("1/x", '/').is_err());
    assert_eq!(None, HierarchyPath::<u32>::try_parse("1/x", '/'));
    assert_eq!(
        Some(HierarchyPath::new([1, 2])),
        HierarchyPath::<u32>::try_parse("1.2", '.')
    );

    let doubled =
        HierarchyPath::<u32>::parse_with("1/2", '/', |segment| {
            segment.parse::<u32>().map(|parsed| parsed * 2)
        })
        .unwrap();
    assert_eq!(HierarchyPath::new([2, 4]), doubled);
}

fn round_trip_impl<H: Hierarchy<String, i32>>(hierarchy: &mut H) {
    let deep = path("a/b/c");
    assert_eq!(None, hierarchy.get_value(&deep));
    hierarchy.set_value(&deep, 1).unwrap();
    assert_eq!(Some(1), hierarchy.get_value(&deep));
    hierarchy.set_value(&deep, 2).unwrap();
    assert_eq!(Some(2), hierarchy.get_value(&deep));
    // intermediate nodes exist but hold no value
    assert_eq!(None, hierarchy.get_value(&path("a")));
    assert_eq!(None, hierarchy.get_value(&path("a/b")));
    assert!(hierarchy.traverse(&path("a/b")).is_ok());
    // a zero-segment path addresses the root
    hierarchy.set_value(&Path::root(), 0).unwrap();
    assert_eq!(Some(0), hierarchy.get_value(&Path::root()));
}

#[test]
fn round_trip_mutable() {
    round_trip_impl(&mut MutableHierarchy::<String, i32>::new());
}

#[test]
fn round_trip_persistent() {
    round_trip_impl(&mut PersistentHierarchy::<String, i32>::new());
}

fn add_duplicate_impl<H: Hierarchy<String, i32>>(hierarchy: &mut H) {
    hierarchy.add_value(&path("a/b"), 1).unwrap();
    let err = hierarchy.add_value(&path("a/b"), 2).unwrap_err();
    assert!(matches!(&err, InsertValueError::ValueAlreadyPresent(_)));
    // ownership of the rejected value is handed back
    assert_eq!(2, err.into_value());
    assert_eq!(Some(1), hierarchy.get_value(&path("a/b")));
    // a valueless intermediate node accepts an added value
    hierarchy.add_value(&path("a"), 3).unwrap();
    assert_eq!(Some(3), hierarchy.get_value(&path("a")));
    // set still overwrites unconditionally
    hierarchy.set_value(&path("a/b"), 4).unwrap();
    assert_eq!(Some(4), hierarchy.get_value(&path("a/b")));
}

#[test]
fn add_duplicate_mutable() {
    add_duplicate_impl(&mut MutableHierarchy::<String, i32>::new());
}

#[test]
fn add_duplicate_persistent() {
    add_duplicate_impl(&mut PersistentHierarchy::<String, i32>::new());
}

fn prune_on_remove_impl<H: Hierarchy<String, i32>>(hierarchy: &mut H) {
    hierarchy.set_value(&path("a/b/c"), 1).unwrap();
    assert_eq!(Ok(true), hierarchy.remove_value(&path("a/b/c"), 1));
    assert_eq!(None, hierarchy.get_value(&path("a/b/c")));
    // nothing remains at the target or the empty chain above it
    assert!(!hierarchy.remove_node(&path("a/b/c"), false));
    assert!(hierarchy.traverse(&path("a")).is_err());
    // a second removal is a no-op
    assert_eq!(Ok(false), hierarchy.remove_value(&path("a/b/c"), 1));

    // pruning stops at the first ancestor with content
    hierarchy.set_value(&path("a"), 10).unwrap();
    hierarchy.set_value(&path("a/b/c"), 1).unwrap();
    assert_eq!(Ok(true), hierarchy.remove_value(&path("a/b/c"), 1));
    assert!(hierarchy.traverse(&path("a")).is_ok());
    assert!(hierarchy.traverse(&path("a/b")).is_err());
    assert_eq!(Some(10), hierarchy.get_value(&path("a")));

    // removal below the target node is unsupported
    assert_eq!(
        Err(UnsupportedMaxDepthError { max_depth: 2 }),
        hierarchy.remove_value(&path("a"), 2)
    );
    assert_eq!(Some(10), hierarchy.get_value(&path("a")));
}

#[test]
fn prune_on_remove_mutable() {
    prune_on_remove_impl(&mut MutableHierarchy::<String, i32>::new());
}

#[test]
fn prune_on_remove_persistent() {
    prune_on_remove_impl(&mut PersistentHierarchy::<String, i32>::new());
}

#[test]
fn remove_value_at_root() {
    let mut hierarchy = MutableHierarchy::<String, i32>::new();
    hierarchy.set_value(&Path::root(), 7).unwrap();
    assert_eq!(Ok(true), hierarchy.remove_value(&Path::root(), 1));
    assert_eq!(None, hierarchy.get_value(&Path::root()));
    assert_eq!(Ok(false), hierarchy.remove_value(&Path::root(), 0));
}

fn remove_node_impl<H: Hierarchy<String, i32>>(hierarchy: &mut H) {
    hierarchy.set_value(&path("a"), 1).unwrap();
    hierarchy.set_value(&path("a/b"), 2).unwrap();
    hierarchy.set_value(&path("a/c"), 3).unwrap();
    // refuses to detach a node with children without recursion
    assert!(!hierarchy.remove_node(&path("a"), false));
    assert_eq!(Some(2), hierarchy.get_value(&path("a/b")));
    // childless nodes are detached without recursion
    assert!(hierarchy.remove_node(&path("a/b"), false));
    assert_eq!(None, hierarchy.get_value(&path("a/b")));
    assert_eq!(Some(3), hierarchy.get_value(&path("a/c")));
    assert!(hierarchy.remove_node(&path("a"), true));
    assert_eq!(None, hierarchy.get_value(&path("a")));
    // missing targets are reported, not raised
    assert!(!hierarchy.remove_node(&path("missing"), true));

    // detaching the last child prunes the empty chain above it
    hierarchy.set_value(&path("p/q"), 5).unwrap();
    assert!(hierarchy.remove_node(&path("p/q"), false));
    assert!(hierarchy.traverse(&path("p")).is_err());

    // removing the root resets it instead of detaching it
    hierarchy.set_value(&path("x/y"), 4).unwrap();
    assert!(!hierarchy.remove_node(&Path::root(), false));
    assert!(hierarchy.remove_node(&Path::root(), true));
    assert_eq!(None, hierarchy.get_value(&path("x/y")));
    // a childless root is removable without recursion
    assert!(hierarchy.remove_node(&Path::root(), false));
}

#[test]
fn remove_node_mutable() {
    remove_node_impl(&mut MutableHierarchy::<String, i32>::new());
}

#[test]
fn remove_node_persistent() {
    remove_node_impl(&mut PersistentHierarchy::<String, i32>::new());
}

/// `root{left{leftLeaf}, right{leftRightLeaf, rightRightLeaf}}` with each
/// node's value naming it.
fn build_sample<H: Hierarchy<String, String>>(hierarchy: &mut H) {
    for node_path in [
        "left",
        "right",
        "left/leftLeaf",
        "right/leftRightLeaf",
        "right/rightRightLeaf",
    ] {
        let name = node_path.rsplit('/').next().unwrap().to_owned();
        hierarchy.set_value(&path(node_path), name).unwrap();
    }
}

#[test]
fn breadth_first_vs_depth_first_ordering() {
    let mut hierarchy = MutableHierarchy::<String, String>::new();
    build_sample(&mut hierarchy);
    let cursor = hierarchy.traverse(&Path::root()).unwrap();

    let breadth: Vec<&str> = cursor
        .descendants(TraversalOrder::BreadthFirst, None)
        .map(|node| node.value().unwrap().as_str())
        .collect();
    assert_eq!(
        vec![
            "left",
            "right",
            "leftLeaf",
            "leftRightLeaf",
            "rightRightLeaf"
        ],
        breadth
    );

    let depth: Vec<&str> = cursor
        .descendants(TraversalOrder::DepthFirst, None)
        .map(|node| node.value().unwrap().as_str())
        .collect();
    assert_eq!(
        vec![
            "left",
            "leftLeaf",
            "right",
            "leftRightLeaf",
            "rightRightLeaf"
        ],
        depth
    );
}

#[test]
fn persistent_cursor_ordering() {
    let mut hierarchy = PersistentHierarchy::<String, String>::new();
    build_sample(&mut hierarchy);
    let cursor = hierarchy.traverse(&Path::root()).unwrap();
    let breadth: Vec<String> = cursor
        .descendants(TraversalOrder::BreadthFirst, None)
        .map(|node| node.value().unwrap().clone())
        .collect();
    assert_eq!(
        vec![
            "left".to_owned(),
            "right".to_owned(),
            "leftLeaf".to_owned(),
            "leftRightLeaf".to_owned(),
            "rightRightLeaf".to_owned()
        ],
        breadth
    );

    // a traversal may start below the root
    let cursor = hierarchy.traverse(&path("right")).unwrap();
    assert_eq!(2, cursor.children().len());
}

#[test]
fn max_depth_bounds_descendants() {
    let mut hierarchy = MutableHierarchy::<String, String>::new();
    build_sample(&mut hierarchy);
    let cursor = hierarchy.traverse(&Path::root()).unwrap();

    // descendants_and_self with a depth of two is self plus children
    for order in [TraversalOrder::BreadthFirst, TraversalOrder::DepthFirst] {
        let children: Vec<&str> = cursor
            .children()
            .into_iter()
            .map(|node| node.value().unwrap().as_str())
            .collect();
        let bounded: Vec<&str> = cursor
            .descendants_and_self(order, Some(2))
            .skip(1)
            .map(|node| node.value().unwrap().as_str())
            .collect();
        assert_eq!(children, bounded);
    }

    assert_eq!(
        0,
        cursor.descendants(TraversalOrder::BreadthFirst, Some(0)).count()
    );
    assert_eq!(
        0,
        cursor
            .descendants_and_self(TraversalOrder::DepthFirst, Some(0))
            .count()
    );
    assert_eq!(
        2,
        cursor.descendants(TraversalOrder::BreadthFirst, Some(1)).count()
    );
    assert_eq!(
        5,
        cursor.descendants(TraversalOrder::BreadthFirst, Some(9)).count()
    );
}

#[test]
fn leaves_respect_depth_bounds() {
    let mut hierarchy = MutableHierarchy::<String, String>::new();
    build_sample(&mut hierarchy);
    let cursor = hierarchy.traverse(&Path::root()).unwrap();

    let unbounded: Vec<&str> = cursor
        .leaves(TraversalOrder::DepthFirst, None)
        .map(|node| node.value().unwrap().as_str())
        .collect();
    assert_eq!(vec!["leftLeaf", "leftRightLeaf", "rightRightLeaf"], unbounded);

    // nodes cut off purely by depth are not reported as leaves
    assert_eq!(
        0,
        cursor.leaves(TraversalOrder::BreadthFirst, Some(1)).count()
    );
    assert_eq!(
        0,
        cursor.leaves(TraversalOrder::BreadthFirst, Some(2)).count()
    );
    assert_eq!(
        3,
        cursor.leaves(TraversalOrder::BreadthFirst, Some(3)).count()
    );

    // a childless start node is its own leaf
    let leaf_cursor = hierarchy.traverse(&path("left/leftLeaf")).unwrap();
    assert_eq!(
        1,
        leaf_cursor.leaves(TraversalOrder::BreadthFirst, None).count()
    );
}

#[test]
fn leaves_with_breadcrumbs_carry_provenance() {
    let mut hierarchy = MutableHierarchy::<String, String>::new();
    build_sample(&mut hierarchy);
    let cursor = hierarchy.traverse(&Path::root()).unwrap();

    let pairs: Vec<(Vec<Option<&str>>, &str)> = cursor
        .leaves_with_breadcrumbs()
        .map(|(breadcrumbs, leaf)| {
            (
                breadcrumbs
                    .iter()
                    .map(|ancestor| ancestor.value().map(String::as_str))
                    .collect(),
                leaf.value().unwrap().as_str(),
            )
        })
        .collect();
    assert_eq!(
        vec![
            (vec![None, Some("left")], "leftLeaf"),
            (vec![None, Some("right")], "leftRightLeaf"),
            (vec![None, Some("right")], "rightRightLeaf"),
        ],
        pairs
    );
}

#[test]
fn visitor_breadcrumbs_match_ancestor_chain() {
    let mut hierarchy = MutableHierarchy::<String, String>::new();
    build_sample(&mut hierarchy);
    let cursor = hierarchy.traverse(&Path::root()).unwrap();

    let mut visits = Vec::new();
    cursor.visit_descendants_and_self(None, |breadcrumbs, node| {
        visits.push((
            breadcrumbs
                .iter()
                .map(|ancestor| ancestor.value().map(String::as_str))
                .collect::<Vec<_>>(),
            node.value().map(String::as_str),
        ));
    });
    assert_eq!(
        vec![
            (vec![], None),
            (vec![None], Some("left")),
            (vec![None, Some("left")], Some("leftLeaf")),
            (vec![None], Some("right")),
            (vec![None, Some("right")], Some("leftRightLeaf")),
            (vec![None, Some("right")], Some("rightRightLeaf")),
        ],
        visits
    );

    // a depth of zero visits nothing
    let mut visited = 0;
    cursor.visit_descendants_and_self(Some(0), |_, _| visited += 1);
    assert_eq!(0, visited);

    // a depth of one visits only the children
    let mut visited = Vec::new();
    cursor.visit_descendants(Some(1), |_, node| {
        visited.push(node.value().unwrap().clone());
    });
    assert_eq!(vec!["left".to_owned(), "right".to_owned()], visited);
}

#[test]
fn cycle_safe_visits_self_child_once() {
    // a node that reports itself as its own child
    let children_of = |node: &u8| Some(vec![*node]);
    let visited: Vec<u8> = traverse::descendants_and_self_cycle_safe(&7, children_of).collect();
    assert_eq!(vec![7], visited);
}

#[test]
fn cycle_safe_terminates_on_mutual_cycle() {
    let edges = HashMap::from([("a", vec!["b"]), ("b", vec!["a"])]);
    let children_of = |node: &&str| edges.get(node).cloned();
    let visited: Vec<&str> =
        traverse::descendants_and_self_cycle_safe(&"a", children_of).collect();
    assert_eq!(vec!["a", "b"], visited);
}

#[test]
fn cycle_safe_still_traverses_diamonds_fully() {
    let edges = HashMap::from([("a", vec!["b", "c"]), ("b", vec!["d"]), ("c", vec!["d"])]);
    let children_of = |node: &&str| edges.get(node).cloned();
    let visited: Vec<&str> =
        traverse::descendants_and_self_cycle_safe(&"a", children_of).collect();
    // "d" is reached twice via distinct non-cyclic paths
    assert_eq!(vec!["a", "b", "d", "c", "d"], visited);
}

#[test]
fn null_children_accessor_is_treated_as_empty() {
    let cursor = Traverse::new(0_u8, |_: &u8| None);
    assert!(cursor.children().is_empty());
    assert_eq!(
        0,
        cursor.descendants(TraversalOrder::BreadthFirst, None).count()
    );
    assert_eq!(
        vec![0],
        cursor
            .leaves(TraversalOrder::BreadthFirst, None)
            .collect::<Vec<_>>()
    );
}

#[test]
fn ancestors_over_plain_values() {
    let parent_of = |node: &u32| (*node > 1).then(|| node / 2);
    assert_eq!(
        vec![6, 3, 1],
        traverse::ancestors(&12, parent_of).collect::<Vec<_>>()
    );
    assert_eq!(
        vec![12, 6, 3, 1],
        traverse::ancestors_and_self(&12, parent_of).collect::<Vec<_>>()
    );
    assert_eq!(Ok(6), traverse::parent(&12, parent_of));
    assert_eq!(Err(NoParentError), traverse::parent(&1, parent_of));
}

#[test]
fn sibling_walks() {
    let parent_of = |node: &&str| (*node != "p").then_some("p");
    let children_of = |node: &&str| (*node == "p").then(|| vec!["a", "b", "c"]);
    assert_eq!(
        vec!["c"],
        traverse::following_siblings(&"b", parent_of, children_of)
    );
    assert_eq!(
        vec!["a"],
        traverse::preceding_siblings(&"b", parent_of, children_of)
    );
    assert!(traverse::following_siblings(&"c", parent_of, children_of).is_empty());
    assert!(traverse::preceding_siblings(&"a", parent_of, children_of).is_empty());
    // a parentless node has no siblings, which is not an error
    assert!(traverse::following_siblings(&"p", parent_of, children_of).is_empty());
}

fn lookup_child<'a>(
    edges: &'a HashMap<&'a str, Vec<&'a str>>,
) -> impl Fn(&&'a str, &&'a str) -> Option<&'a str> + 'a {
    |node, segment| {
        edges
            .get(node)?
            .iter()
            .copied()
            .find(|child| *child == *segment)
    }
}

#[test]
fn descend_along_path_over_plain_values() {
    let edges = HashMap::from([("a", vec!["b"]), ("b", vec!["c"])]);
    let child_by_key = lookup_child(&edges);

    assert_eq!(
        Ok("c"),
        traverse::descendant_at(&"a", &HierarchyPath::new(["b", "c"]), &child_by_key)
    );
    let err = traverse::descendant_at(&"a", &HierarchyPath::new(["b", "x"]), &child_by_key)
        .unwrap_err();
    // the error names the full attempted sub-path
    assert_eq!(HierarchyPath::new(["b", "x"]), err.attempted_path);

    assert_eq!(
        None,
        traverse::try_descendant_at(&"a", &HierarchyPath::new(["x"]), &child_by_key)
    );
    assert_eq!(
        Some("b"),
        traverse::try_descendant_at(&"a", &HierarchyPath::new(["b"]), &child_by_key)
    );

    let (node, resolved) = traverse::descendant_at_or_default(
        &"a",
        &HierarchyPath::new(["b", "x", "y"]),
        &child_by_key,
        "fallback",
    );
    assert_eq!("fallback", node);
    // the longest successfully resolved prefix is reported
    assert_eq!(HierarchyPath::new(["b"]), resolved);

    let (node, resolved) = traverse::descendant_at_or_default(
        &"a",
        &HierarchyPath::new(["b", "c"]),
        &child_by_key,
        "fallback",
    );
    assert_eq!("c", node);
    assert_eq!(HierarchyPath::new(["b", "c"]), resolved);
}

#[test]
fn visit_descendant_at_and_ancestors_nearest_first() {
    let edges = HashMap::from([("a", vec!["b"]), ("b", vec!["c"])]);
    let child_by_key = lookup_child(&edges);

    let mut target = None;
    let mut ancestors = Vec::new();
    traverse::visit_descendant_at_and_ancestors(
        &"a",
        &HierarchyPath::new(["b", "c"]),
        &child_by_key,
        |node| target = Some(*node),
        |ancestor| ancestors.push(*ancestor),
    )
    .unwrap();
    assert_eq!(Some("c"), target);
    assert_eq!(vec!["b", "a"], ancestors);

    // an unresolvable path invokes neither callback
    let mut target_invoked = false;
    let mut ancestor_invoked = false;
    let err = traverse::visit_descendant_at_and_ancestors(
        &"a",
        &HierarchyPath::new(["x", "y"]),
        &child_by_key,
        |_| target_invoked = true,
        |_| ancestor_invoked = true,
    )
    .unwrap_err();
    assert!(!target_invoked);
    assert!(!ancestor_invoked);
    assert_eq!(HierarchyPath::new(["x"]), err.attempted_path);
}

#[test]
fn traverse_requires_an_existing_start_node() {
    let mut hierarchy = MutableHierarchy::<String, i32>::new();
    hierarchy.set_value(&path("a/b"), 1).unwrap();
    let err = hierarchy.traverse(&path("a/missing/x")).unwrap_err();
    assert_eq!(path("a/missing"), err.attempted_path);
}

#[test]
fn persistent_snapshot_isolation() {
    let hierarchy = PersistentHierarchy::<String, i32>::new();
    hierarchy.set_value(&path("a/b"), 1).unwrap();

    let before = hierarchy.snapshot();
    hierarchy.set_value(&path("a/b"), 2).unwrap();
    hierarchy.set_value(&path("a/c"), 3).unwrap();

    // the snapshot still observes the pre-write state
    let child_by_key = |node: &Arc<crate::PersistentNode<String, i32>>, segment: &String| {
        node.child(segment).map(Arc::clone)
    };
    let old = traverse::try_descendant_at(&before, &path("a/b"), child_by_key).unwrap();
    assert_eq!(Some(&1), old.value());
    assert!(traverse::try_descendant_at(&before, &path("a/c"), child_by_key).is_none());

    // while the store observes both writes
    assert_eq!(Some(2), hierarchy.get_value(&path("a/b")));
    assert_eq!(Some(3), hierarchy.get_value(&path("a/c")));
}

#[test]
fn persistent_concurrent_writers_lose_no_writes() {
    let hierarchy = PersistentHierarchy::<String, usize>::new();
    std::thread::scope(|scope| {
        for worker in 0_usize..4 {
            let hierarchy = &hierarchy;
            scope.spawn(move || {
                for item in 0_usize..25 {
                    let item_path =
                        HierarchyPath::new([format!("worker{worker}"), format!("item{item}")]);
                    hierarchy.set_value(&item_path, worker * 100 + item).unwrap();
                }
            });
        }
    });
    for worker in 0_usize..4 {
        for item in 0_usize..25 {
            let item_path = HierarchyPath::new([format!("worker{worker}"), format!("item{item}")]);
            assert_eq!(Some(worker * 100 + item), hierarchy.get_value(&item_path));
        }
    }
}

#[test]
fn get_or_create_node_mutable() {
    let mut hierarchy = MutableHierarchy::<String, i32>::new();
    let node = hierarchy.get_or_create_node(&path("a/b"));
    assert!(node.is_prunable());
    node.set_value(1);
    assert_eq!(Some(1), hierarchy.get_value(&path("a/b")));
    // intermediate nodes are created without values
    assert_eq!(None, hierarchy.get_value(&path("a")));
    assert!(hierarchy.find_node(&path("a")).is_some());
}

#[test]
fn get_or_create_node_persistent() {
    let hierarchy = PersistentHierarchy::<String, i32>::new();
    let target = hierarchy.get_or_create_node(&path("a/b"));
    assert!(target.is_prunable());
    assert!(hierarchy.find_node(&path("a/b")).is_some());

    // resolving a fully existing path keeps the published root
    hierarchy.set_value(&path("a/b"), 1).unwrap();
    let before = hierarchy.snapshot();
    let target = hierarchy.get_or_create_node(&path("a/b"));
    assert_eq!(Some(&1), target.value());
    assert!(Arc::ptr_eq(&before, &hierarchy.snapshot()));
}

#[test]
fn seeded_stores_reject_explicit_mutation() {
    let mut mutable = MutableHierarchy::<String, i32>::seeded(|| 42);
    assert_eq!(Some(42), mutable.get_value(&Path::root()));
    let err = mutable.set_value(&path("a"), 1).unwrap_err();
    assert!(matches!(&err, InsertValueError::DefaultSeeded(1)));
    assert_eq!(1, err.into_value());
    assert!(mutable.add_value(&path("a"), 1).is_err());
    // removal remains available
    assert_eq!(Ok(true), mutable.remove_value(&Path::root(), 1));
    assert_eq!(None, mutable.get_value(&Path::root()));

    let persistent = PersistentHierarchy::<String, i32>::seeded(|| 42);
    assert_eq!(Some(&42), persistent.snapshot().value());
    assert!(persistent.set_value(&path("a"), 1).is_err());
    assert!(persistent.add_value(&path("a"), 1).is_err());
    assert_eq!(Ok(true), persistent.remove_value(&Path::root(), 1));
}

#[test]
fn capability_contracts_on_backend_nodes() {
    let mut hierarchy = MutableHierarchy::<String, i32>::new();
    hierarchy.set_value(&path("a"), 1).unwrap();
    let root = hierarchy.root();
    assert!(HasChildren::has_children(&root));
    let children = HasChildren::children(&root).unwrap();
    assert_eq!(1, children.len());
    let child = root.try_get_child(&"a".to_owned()).unwrap();
    assert_eq!(Some(&1), child.value());
    assert!(root.try_get_child(&"missing".to_owned()).is_none());

    let mut detached = crate::MutableNode::<String, i32>::new();
    assert!(detached.try_set_value(2));
    assert_eq!(Some(2), detached.try_get_value());

    let persistent = PersistentHierarchy::<String, i32>::new();
    persistent.set_value(&path("a"), 1).unwrap();
    let mut node = persistent.find_node(&path("a")).unwrap();
    assert_eq!(Some(1), node.try_get_value());
    // the shared handle is structurally incapable of storing a value
    assert!(!node.try_set_value(2));
    assert_eq!(Some(1), persistent.get_value(&path("a")));
}

#[test]
fn traverse_over_capability_nodes() {
    let hierarchy = PersistentHierarchy::<String, String>::new();
    hierarchy
        .set_value(&path("x/y"), "y".to_owned())
        .unwrap();
    let cursor = Traverse::over(hierarchy.snapshot());
    assert_eq!(
        1,
        cursor.descendants(TraversalOrder::BreadthFirst, Some(1)).count()
    );
    assert_eq!(
        2,
        cursor.descendants(TraversalOrder::BreadthFirst, None).count()
    );
}
