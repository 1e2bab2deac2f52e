// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

use std::{fmt, sync::Arc};

use im::Vector;
use parking_lot::Mutex;

use crate::{
    capability::{HasChildren, HasKeyedChildren, HasValue},
    edge::HalfEdge,
    hierarchy::{Hierarchy, InsertValueError, UnsupportedMaxDepthError},
    traverse::{self, ChildrenFn, PathNotFoundError, Traverse},
    HierarchyPath,
};

type PersistentEdge<K, V> = HalfEdge<K, Arc<PersistentNode<K, V>>>;

/// Immutable tree node shared by reference counting.
///
/// Never mutated after publication: writes rebuild the chain of nodes
/// from the target up to a fresh root, leaving every published node
/// untouched. Children are kept in insertion order.
#[derive(Clone)]
pub struct PersistentNode<K, V> {
    value: Option<V>,
    children: Vector<PersistentEdge<K, V>>,
}

impl<K, V> PersistentNode<K, V>
where
    K: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: None,
            children: Vector::new(),
        }
    }

    #[must_use]
    pub fn with_value(value: V) -> Self {
        Self {
            value: Some(value),
            children: Vector::new(),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Child edges in sibling (insertion) order.
    pub fn children(&self) -> impl Iterator<Item = &PersistentEdge<K, V>> + '_ {
        self.children.iter()
    }

    #[must_use]
    pub fn child(&self, segment: &K) -> Option<&Arc<Self>>
    where
        K: PartialEq,
    {
        self.child_index(segment)
            .map(|index| &self.children[index].node)
    }

    /// A node with neither a value nor children is eligible for removal
    /// during upward cleanup.
    #[must_use]
    pub fn is_prunable(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn child_index(&self, segment: &K) -> Option<usize>
    where
        K: PartialEq,
    {
        self.children
            .iter()
            .position(|edge| edge.segment == *segment)
    }
}

impl<K, V> Default for PersistentNode<K, V>
where
    K: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for PersistentNode<K, V>
where
    K: Clone + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentNode")
            .field("value", &self.value)
            .field("children", &self.children)
            .finish()
    }
}

impl<K, V> PartialEq for PersistentNode<K, V>
where
    K: Clone + PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.children == other.children
    }
}

impl<K, V> Eq for PersistentNode<K, V>
where
    K: Clone + Eq,
    V: Eq,
{
}

impl<K, V> HasChildren for Arc<PersistentNode<K, V>>
where
    K: Clone,
{
    fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    fn children(&self) -> Option<Vec<Self>> {
        Some(
            self.children
                .iter()
                .map(|edge| Arc::clone(&edge.node))
                .collect(),
        )
    }
}

impl<K, V> HasKeyedChildren<K> for Arc<PersistentNode<K, V>>
where
    K: Clone + PartialEq,
{
    fn try_get_child(&self, segment: &K) -> Option<Self> {
        self.child(segment).map(Arc::clone)
    }
}

impl<K, V> HasValue<V> for Arc<PersistentNode<K, V>>
where
    V: Clone,
{
    fn try_get_value(&self) -> Option<V> {
        self.value.clone()
    }

    /// The shared handle is immutable; storing a value through it is
    /// structurally impossible.
    fn try_set_value(&mut self, _value: V) -> bool {
        false
    }
}

/// Path-addressed key/value store over a copy-on-write node tree.
///
/// The tree is a value: every write builds new nodes bottom-up and
/// publishes a fresh root, so a reader holding a [`Self::snapshot`]
/// taken before a concurrent write continues to observe fully
/// consistent pre-write state. Writers serialize the read-rebuild-
/// publish sequence behind a short mutual-exclusion region, so no
/// write is ever lost; readers never block each other.
pub struct PersistentHierarchy<K, V> {
    root: Mutex<Arc<PersistentNode<K, V>>>,
    seeded: bool,
}

impl<K, V> fmt::Debug for PersistentHierarchy<K, V>
where
    K: Clone + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentHierarchy")
            .field("root", &self.root)
            .field("seeded", &self.seeded)
            .finish()
    }
}

impl<K, V> PersistentHierarchy<K, V>
where
    K: Clone,
{
    /// An empty hierarchy with a valueless root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Arc::new(PersistentNode::new())),
            seeded: false,
        }
    }

    /// A hierarchy whose root value is seeded once at construction.
    ///
    /// A seeded store rejects subsequent `set_value`/`add_value` calls;
    /// removal and traversal remain available.
    #[must_use]
    pub fn seeded(seed: impl FnOnce() -> V) -> Self {
        Self {
            root: Mutex::new(Arc::new(PersistentNode::with_value(seed()))),
            seeded: true,
        }
    }
}

impl<K, V> PersistentHierarchy<K, V> {
    /// The current root node.
    ///
    /// The returned handle is an immutable snapshot of the whole tree:
    /// traversals over it require no synchronization and are unaffected
    /// by concurrent writes.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PersistentNode<K, V>> {
        Arc::clone(&self.root.lock())
    }

    #[must_use]
    pub fn find_node(&self, path: &HierarchyPath<K>) -> Option<Arc<PersistentNode<K, V>>>
    where
        K: Clone + PartialEq,
    {
        let mut node = self.snapshot();
        for segment in path.segments() {
            let child = node.child(segment).map(Arc::clone)?;
            node = child;
        }
        Some(node)
    }

    /// Like [`Hierarchy::set_value`], callable through a shared
    /// reference.
    pub fn set_value(
        &self,
        path: &HierarchyPath<K>,
        value: V,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone + fmt::Debug,
    {
        self.set_value_with(path, value, |_| PersistentNode::new())
    }

    /// Like [`Self::set_value`], with a custom factory for missing
    /// intermediate nodes.
    pub fn set_value_with(
        &self,
        path: &HierarchyPath<K>,
        value: V,
        new_node: impl FnMut(&K) -> PersistentNode<K, V>,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone + fmt::Debug,
    {
        self.write_value(path, value, true, new_node)
    }

    /// Like [`Hierarchy::add_value`], callable through a shared
    /// reference.
    pub fn add_value(
        &self,
        path: &HierarchyPath<K>,
        value: V,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone + fmt::Debug,
    {
        self.add_value_with(path, value, |_| PersistentNode::new())
    }

    /// Like [`Self::add_value`], with a custom factory for missing
    /// intermediate nodes.
    pub fn add_value_with(
        &self,
        path: &HierarchyPath<K>,
        value: V,
        new_node: impl FnMut(&K) -> PersistentNode<K, V>,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone + fmt::Debug,
    {
        self.write_value(path, value, false, new_node)
    }

    fn write_value(
        &self,
        path: &HierarchyPath<K>,
        value: V,
        overwrite: bool,
        mut new_node: impl FnMut(&K) -> PersistentNode<K, V>,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone + fmt::Debug,
    {
        if self.seeded {
            return Err(InsertValueError::DefaultSeeded(value));
        }
        // Serializes read-rebuild-publish: two concurrent writers must
        // never build from the same stale root.
        let mut root = self.root.lock();
        let new_root = write_value_in(&root, path.segments(), value, overwrite, &mut new_node)?;
        *root = new_root;
        Ok(())
    }

    /// Like [`Hierarchy::remove_value`], callable through a shared
    /// reference.
    pub fn remove_value(
        &self,
        path: &HierarchyPath<K>,
        max_depth: usize,
    ) -> Result<bool, UnsupportedMaxDepthError>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone,
    {
        if max_depth > 1 {
            return Err(UnsupportedMaxDepthError { max_depth });
        }
        let mut root = self.root.lock();
        match remove_value_in(&root, path.segments()) {
            Removed::Unresolved => Ok(false),
            Removed::Rebuilt(new_root) => {
                *root = new_root;
                Ok(true)
            }
            Removed::Pruned => {
                // The root is never deleted, only replaced by a fresh
                // empty one.
                *root = Arc::new(PersistentNode::new());
                Ok(true)
            }
        }
    }

    /// Like [`Hierarchy::remove_node`], callable through a shared
    /// reference.
    pub fn remove_node(&self, path: &HierarchyPath<K>, recurse: bool) -> bool
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone,
    {
        let mut root = self.root.lock();
        let Some((segment, rest)) = path.segments().split_first() else {
            // The root has no parent to detach from; reset it instead.
            if root.has_children() && !recurse {
                return false;
            }
            log::debug!("Resetting root node");
            *root = Arc::new(PersistentNode::new());
            return true;
        };
        match remove_node_in(&root, segment, rest, recurse) {
            Detached::Unresolved | Detached::Refused => false,
            Detached::Rebuilt(new_root) => {
                *root = new_root;
                true
            }
            Detached::Pruned => {
                *root = Arc::new(PersistentNode::new());
                true
            }
        }
    }

    /// Resolve the node at `path`, creating missing nodes as empty, and
    /// publish the resulting tree.
    pub fn get_or_create_node(&self, path: &HierarchyPath<K>) -> Arc<PersistentNode<K, V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone,
    {
        self.get_or_create_node_with(path, |_| PersistentNode::new())
    }

    /// Resolve the node at `path`, creating missing nodes with the
    /// supplied factory, keyed by the segment being created.
    pub fn get_or_create_node_with(
        &self,
        path: &HierarchyPath<K>,
        mut new_node: impl FnMut(&K) -> PersistentNode<K, V>,
    ) -> Arc<PersistentNode<K, V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: Clone,
    {
        let mut root = self.root.lock();
        let (new_root, target) = get_or_create_in(&root, path.segments(), &mut new_node);
        *root = new_root;
        target
    }

    /// Like [`Hierarchy::traverse`], over a snapshot of the current
    /// tree.
    pub fn traverse(
        &self,
        start: &HierarchyPath<K>,
    ) -> Result<Traverse<Arc<PersistentNode<K, V>>, ChildrenFn<Arc<PersistentNode<K, V>>>>, PathNotFoundError<K>>
    where
        K: Clone + PartialEq + fmt::Debug,
    {
        let node = traverse::descendant_at(&self.snapshot(), start, |node, segment| {
            node.child(segment).map(Arc::clone)
        })?;
        Ok(Traverse::over(node))
    }
}

impl<K, V> Default for PersistentHierarchy<K, V>
where
    K: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for PersistentHierarchy<K, V> {
    /// Fork the store at its current root.
    fn clone(&self) -> Self {
        Self {
            root: Mutex::new(self.snapshot()),
            seeded: self.seeded,
        }
    }
}

impl<K, V> Hierarchy<K, V> for PersistentHierarchy<K, V>
where
    K: Clone + PartialEq + fmt::Debug,
    V: Clone + fmt::Debug,
{
    type Cursor<'a>
        = Traverse<Arc<PersistentNode<K, V>>, ChildrenFn<Arc<PersistentNode<K, V>>>>
    where
        Self: 'a;

    fn set_value(&mut self, path: &HierarchyPath<K>, value: V) -> Result<(), InsertValueError<V>> {
        PersistentHierarchy::set_value(self, path, value)
    }

    fn add_value(&mut self, path: &HierarchyPath<K>, value: V) -> Result<(), InsertValueError<V>> {
        PersistentHierarchy::add_value(self, path, value)
    }

    fn get_value(&self, path: &HierarchyPath<K>) -> Option<V> {
        self.find_node(path).and_then(|node| node.value().cloned())
    }

    fn remove_value(
        &mut self,
        path: &HierarchyPath<K>,
        max_depth: usize,
    ) -> Result<bool, UnsupportedMaxDepthError> {
        PersistentHierarchy::remove_value(self, path, max_depth)
    }

    fn remove_node(&mut self, path: &HierarchyPath<K>, recurse: bool) -> bool {
        PersistentHierarchy::remove_node(self, path, recurse)
    }

    fn traverse(&self, start: &HierarchyPath<K>) -> Result<Self::Cursor<'_>, PathNotFoundError<K>> {
        PersistentHierarchy::traverse(self, start)
    }
}

fn write_value_in<K, V>(
    node: &Arc<PersistentNode<K, V>>,
    segments: &[K],
    value: V,
    overwrite: bool,
    new_node: &mut impl FnMut(&K) -> PersistentNode<K, V>,
) -> Result<Arc<PersistentNode<K, V>>, InsertValueError<V>>
where
    K: Clone + PartialEq + fmt::Debug,
    V: Clone + fmt::Debug,
{
    let Some((segment, rest)) = segments.split_first() else {
        if !overwrite && node.value.is_some() {
            return Err(InsertValueError::ValueAlreadyPresent(value));
        }
        return Ok(Arc::new(PersistentNode {
            value: Some(value),
            children: node.children.clone(),
        }));
    };
    let mut children = node.children.clone();
    match node.child_index(segment) {
        Some(index) => {
            let new_child = write_value_in(&node.children[index].node, rest, value, overwrite, new_node)?;
            children.set(
                index,
                HalfEdge {
                    segment: segment.clone(),
                    node: new_child,
                },
            );
        }
        None => {
            log::debug!("Creating node for missing path segment {segment:?}");
            let created = Arc::new(new_node(segment));
            let new_child = write_value_in(&created, rest, value, overwrite, new_node)?;
            children.push_back(HalfEdge {
                segment: segment.clone(),
                node: new_child,
            });
        }
    }
    Ok(Arc::new(PersistentNode {
        value: node.value.clone(),
        children,
    }))
}

/// Outcome of a copy-on-write removal below some node.
enum Removed<K, V> {
    /// The path did not resolve; nothing changed.
    Unresolved,
    /// The node was rebuilt with the value or subtree gone.
    Rebuilt(Arc<PersistentNode<K, V>>),
    /// The node became prunable and should be detached by its parent.
    Pruned,
}

fn remove_value_in<K, V>(node: &Arc<PersistentNode<K, V>>, segments: &[K]) -> Removed<K, V>
where
    K: Clone + PartialEq + fmt::Debug,
    V: Clone,
{
    let Some((segment, rest)) = segments.split_first() else {
        if node.value.is_none() {
            return Removed::Unresolved;
        }
        if node.children.is_empty() {
            return Removed::Pruned;
        }
        return Removed::Rebuilt(Arc::new(PersistentNode {
            value: None,
            children: node.children.clone(),
        }));
    };
    let Some(index) = node.child_index(segment) else {
        return Removed::Unresolved;
    };
    match remove_value_in(&node.children[index].node, rest) {
        Removed::Unresolved => Removed::Unresolved,
        Removed::Rebuilt(new_child) => {
            let mut children = node.children.clone();
            children.set(
                index,
                HalfEdge {
                    segment: segment.clone(),
                    node: new_child,
                },
            );
            Removed::Rebuilt(Arc::new(PersistentNode {
                value: node.value.clone(),
                children,
            }))
        }
        Removed::Pruned => {
            log::debug!("Pruning empty node at path segment {segment:?}");
            let mut children = node.children.clone();
            children.remove(index);
            if node.value.is_none() && children.is_empty() {
                Removed::Pruned
            } else {
                Removed::Rebuilt(Arc::new(PersistentNode {
                    value: node.value.clone(),
                    children,
                }))
            }
        }
    }
}

/// Outcome of a copy-on-write subtree detachment below some node.
enum Detached<K, V> {
    /// The path did not resolve; nothing changed.
    Unresolved,
    /// The target has children and recursive removal was not requested.
    Refused,
    /// The node was rebuilt with the subtree gone.
    Rebuilt(Arc<PersistentNode<K, V>>),
    /// The node became prunable and should be detached by its parent.
    Pruned,
}

fn remove_node_in<K, V>(
    node: &Arc<PersistentNode<K, V>>,
    segment: &K,
    rest: &[K],
    recurse: bool,
) -> Detached<K, V>
where
    K: Clone + PartialEq + fmt::Debug,
    V: Clone,
{
    let Some(index) = node.child_index(segment) else {
        return Detached::Unresolved;
    };
    if let Some((next_segment, next_rest)) = rest.split_first() {
        match remove_node_in(&node.children[index].node, next_segment, next_rest, recurse) {
            Detached::Unresolved => Detached::Unresolved,
            Detached::Refused => Detached::Refused,
            Detached::Rebuilt(new_child) => {
                let mut children = node.children.clone();
                children.set(
                    index,
                    HalfEdge {
                        segment: segment.clone(),
                        node: new_child,
                    },
                );
                Detached::Rebuilt(Arc::new(PersistentNode {
                    value: node.value.clone(),
                    children,
                }))
            }
            Detached::Pruned => {
                log::debug!("Pruning empty node at path segment {segment:?}");
                let mut children = node.children.clone();
                children.remove(index);
                if node.value.is_none() && children.is_empty() {
                    Detached::Pruned
                } else {
                    Detached::Rebuilt(Arc::new(PersistentNode {
                        value: node.value.clone(),
                        children,
                    }))
                }
            }
        }
    } else {
        if node.children[index].node.has_children() && !recurse {
            return Detached::Refused;
        }
        log::debug!("Detaching subtree at path segment {segment:?}");
        let mut children = node.children.clone();
        children.remove(index);
        if node.value.is_none() && children.is_empty() {
            Detached::Pruned
        } else {
            Detached::Rebuilt(Arc::new(PersistentNode {
                value: node.value.clone(),
                children,
            }))
        }
    }
}

fn get_or_create_in<K, V>(
    node: &Arc<PersistentNode<K, V>>,
    segments: &[K],
    new_node: &mut impl FnMut(&K) -> PersistentNode<K, V>,
) -> (Arc<PersistentNode<K, V>>, Arc<PersistentNode<K, V>>)
where
    K: Clone + PartialEq + fmt::Debug,
    V: Clone,
{
    let Some((segment, rest)) = segments.split_first() else {
        return (Arc::clone(node), Arc::clone(node));
    };
    let index = node.child_index(segment);
    let child = match index {
        Some(index) => Arc::clone(&node.children[index].node),
        None => {
            log::debug!("Creating node for missing path segment {segment:?}");
            Arc::new(new_node(segment))
        }
    };
    let (new_child, target) = get_or_create_in(&child, rest, new_node);
    if index.is_some() && Arc::ptr_eq(&new_child, &child) {
        // Nothing below changed; keep the published node.
        return (Arc::clone(node), target);
    }
    let mut children = node.children.clone();
    let edge = HalfEdge {
        segment: segment.clone(),
        node: new_child,
    };
    match index {
        Some(index) => {
            children.set(index, edge);
        }
        None => children.push_back(edge),
    }
    (
        Arc::new(PersistentNode {
            value: node.value.clone(),
            children,
        }),
        target,
    )
}
