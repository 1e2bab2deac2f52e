// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use crate::{
    capability::{HasChildren, HasKeyedChildren, HasValue},
    edge::HalfEdge,
    hierarchy::{Hierarchy, InsertValueError, UnsupportedMaxDepthError},
    traverse::{self, ChildrenFn, PathNotFoundError, Traverse},
    HierarchyPath,
};

/// Tree node mutated in place.
///
/// Owns its subtree; children are kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableNode<K, V> {
    value: Option<V>,
    children: Vec<HalfEdge<K, MutableNode<K, V>>>,
}

impl<K, V> MutableNode<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_value(value: V) -> Self {
        Self {
            value: Some(value),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Store a value, returning the replaced one.
    pub fn set_value(&mut self, value: V) -> Option<V> {
        self.value.replace(value)
    }

    pub fn take_value(&mut self) -> Option<V> {
        self.value.take()
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Child edges in sibling (insertion) order.
    pub fn children(&self) -> impl Iterator<Item = &HalfEdge<K, Self>> + '_ {
        self.children.iter()
    }

    #[must_use]
    pub fn child(&self, segment: &K) -> Option<&Self>
    where
        K: PartialEq,
    {
        self.child_index(segment)
            .map(|index| &self.children[index].node)
    }

    #[must_use]
    pub fn child_mut(&mut self, segment: &K) -> Option<&mut Self>
    where
        K: PartialEq,
    {
        self.child_index(segment)
            .map(|index| &mut self.children[index].node)
    }

    /// A node with neither a value nor children is eligible for removal
    /// during upward cleanup.
    #[must_use]
    pub fn is_prunable(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    // TODO: Switch to an ordered map if nodes with many children become
    // common.
    fn child_index(&self, segment: &K) -> Option<usize>
    where
        K: PartialEq,
    {
        self.children
            .iter()
            .position(|edge| edge.segment == *segment)
    }
}

impl<K, V> Default for MutableNode<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K, V> HasChildren for &'a MutableNode<K, V> {
    fn has_children(&self) -> bool {
        MutableNode::has_children(self)
    }

    fn children(&self) -> Option<Vec<Self>> {
        Some(self.children.iter().map(|edge| &edge.node).collect())
    }
}

impl<'a, K, V> HasKeyedChildren<K> for &'a MutableNode<K, V>
where
    K: PartialEq,
{
    fn try_get_child(&self, segment: &K) -> Option<Self> {
        MutableNode::child(self, segment)
    }
}

impl<K, V> HasValue<V> for MutableNode<K, V>
where
    V: Clone,
{
    fn try_get_value(&self) -> Option<V> {
        self.value.clone()
    }

    fn try_set_value(&mut self, value: V) -> bool {
        self.value = Some(value);
        true
    }
}

/// Path-addressed key/value store over an in-place mutable node tree.
///
/// Provides no internal synchronization: exclusive access is the
/// caller's responsibility, enforced by the `&mut` write methods. This
/// is the deliberately simpler and faster alternative to
/// [`crate::PersistentHierarchy`]. The root node's identity never
/// changes, except when a root-level removal resets it wholesale.
#[derive(Debug, Clone)]
pub struct MutableHierarchy<K, V> {
    root: MutableNode<K, V>,
    seeded: bool,
}

impl<K, V> MutableHierarchy<K, V> {
    /// An empty hierarchy with a valueless root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: MutableNode::new(),
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
            root: MutableNode::with_value(seed()),
            seeded: true,
        }
    }

    #[must_use]
    pub fn root(&self) -> &MutableNode<K, V> {
        &self.root
    }

    #[must_use]
    pub fn find_node(&self, path: &HierarchyPath<K>) -> Option<&MutableNode<K, V>>
    where
        K: PartialEq,
    {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Resolve the node at `path`, creating missing nodes as empty.
    pub fn get_or_create_node(&mut self, path: &HierarchyPath<K>) -> &mut MutableNode<K, V>
    where
        K: Clone + PartialEq + fmt::Debug,
    {
        self.get_or_create_node_with(path, |_| MutableNode::new())
    }

    /// Resolve the node at `path`, creating missing nodes with the
    /// supplied factory, keyed by the segment being created.
    pub fn get_or_create_node_with(
        &mut self,
        path: &HierarchyPath<K>,
        mut new_node: impl FnMut(&K) -> MutableNode<K, V>,
    ) -> &mut MutableNode<K, V>
    where
        K: Clone + PartialEq + fmt::Debug,
    {
        let mut node = &mut self.root;
        for segment in path.segments() {
            let index = match node.child_index(segment) {
                Some(index) => index,
                None => {
                    log::debug!("Creating node for missing path segment {segment:?}");
                    node.children.push(HalfEdge {
                        segment: segment.clone(),
                        node: new_node(segment),
                    });
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index].node;
        }
        node
    }

    /// Like [`Hierarchy::set_value`], with a custom factory for missing
    /// intermediate nodes.
    pub fn set_value_with(
        &mut self,
        path: &HierarchyPath<K>,
        value: V,
        mut new_node: impl FnMut(&K) -> MutableNode<K, V>,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: fmt::Debug,
    {
        if self.seeded {
            return Err(InsertValueError::DefaultSeeded(value));
        }
        write_value_in(&mut self.root, path.segments(), value, true, &mut new_node).map(|_| ())
    }

    /// Like [`Hierarchy::add_value`], with a custom factory for missing
    /// intermediate nodes.
    pub fn add_value_with(
        &mut self,
        path: &HierarchyPath<K>,
        value: V,
        mut new_node: impl FnMut(&K) -> MutableNode<K, V>,
    ) -> Result<(), InsertValueError<V>>
    where
        K: Clone + PartialEq + fmt::Debug,
        V: fmt::Debug,
    {
        if self.seeded {
            return Err(InsertValueError::DefaultSeeded(value));
        }
        write_value_in(&mut self.root, path.segments(), value, false, &mut new_node).map(|_| ())
    }
}

impl<K, V> Default for MutableHierarchy<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Hierarchy<K, V> for MutableHierarchy<K, V>
where
    K: Clone + PartialEq + fmt::Debug,
    V: Clone + fmt::Debug,
{
    type Cursor<'a>
        = Traverse<&'a MutableNode<K, V>, ChildrenFn<&'a MutableNode<K, V>>>
    where
        Self: 'a;

    fn set_value(&mut self, path: &HierarchyPath<K>, value: V) -> Result<(), InsertValueError<V>> {
        self.set_value_with(path, value, |_| MutableNode::new())
    }

    fn add_value(&mut self, path: &HierarchyPath<K>, value: V) -> Result<(), InsertValueError<V>> {
        self.add_value_with(path, value, |_| MutableNode::new())
    }

    fn get_value(&self, path: &HierarchyPath<K>) -> Option<V> {
        self.find_node(path).and_then(|node| node.value().cloned())
    }

    fn remove_value(
        &mut self,
        path: &HierarchyPath<K>,
        max_depth: usize,
    ) -> Result<bool, UnsupportedMaxDepthError> {
        if max_depth > 1 {
            return Err(UnsupportedMaxDepthError { max_depth });
        }
        Ok(remove_value_in(&mut self.root, path.segments()).is_some())
    }

    fn remove_node(&mut self, path: &HierarchyPath<K>, recurse: bool) -> bool {
        let Some((segment, rest)) = path.segments().split_first() else {
            // The root has no parent to detach from; reset it instead.
            if self.root.has_children() && !recurse {
                return false;
            }
            log::debug!("Resetting root node");
            self.root = MutableNode::new();
            return true;
        };
        remove_node_in(&mut self.root, segment, rest, recurse)
    }

    fn traverse(&self, start: &HierarchyPath<K>) -> Result<Self::Cursor<'_>, PathNotFoundError<K>> {
        let node = traverse::descendant_at(&&self.root, start, |node, segment| {
            node.child(segment)
        })?;
        Ok(Traverse::over(node))
    }
}

fn write_value_in<K, V>(
    node: &mut MutableNode<K, V>,
    segments: &[K],
    value: V,
    overwrite: bool,
    new_node: &mut impl FnMut(&K) -> MutableNode<K, V>,
) -> Result<Option<V>, InsertValueError<V>>
where
    K: Clone + PartialEq + fmt::Debug,
    V: fmt::Debug,
{
    let Some((segment, rest)) = segments.split_first() else {
        if !overwrite && node.value.is_some() {
            return Err(InsertValueError::ValueAlreadyPresent(value));
        }
        return Ok(node.value.replace(value));
    };
    let (index, created) = match node.child_index(segment) {
        Some(index) => (index, false),
        None => {
            log::debug!("Creating node for missing path segment {segment:?}");
            node.children.push(HalfEdge {
                segment: segment.clone(),
                node: new_node(segment),
            });
            (node.children.len() - 1, true)
        }
    };
    let result = write_value_in(&mut node.children[index].node, rest, value, overwrite, new_node);
    // A failed write must not leave behind an empty chain it created.
    if result.is_err() && created && node.children[index].node.is_prunable() {
        node.children.remove(index);
    }
    result
}

fn remove_value_in<K, V>(node: &mut MutableNode<K, V>, segments: &[K]) -> Option<V>
where
    K: PartialEq + fmt::Debug,
{
    let Some((segment, rest)) = segments.split_first() else {
        return node.value.take();
    };
    let index = node.child_index(segment)?;
    let removed = remove_value_in(&mut node.children[index].node, rest);
    if removed.is_some() && node.children[index].node.is_prunable() {
        log::debug!("Pruning empty node at path segment {segment:?}");
        node.children.remove(index);
    }
    removed
}

fn remove_node_in<K, V>(node: &mut MutableNode<K, V>, segment: &K, rest: &[K], recurse: bool) -> bool
where
    K: PartialEq + fmt::Debug,
{
    let Some(index) = node.child_index(segment) else {
        return false;
    };
    if let Some((next_segment, next_rest)) = rest.split_first() {
        let removed = remove_node_in(
            &mut node.children[index].node,
            next_segment,
            next_rest,
            recurse,
        );
        if removed && node.children[index].node.is_prunable() {
            log::debug!("Pruning empty node at path segment {segment:?}");
            node.children.remove(index);
        }
        removed
    } else {
        if node.children[index].node.has_children() && !recurse {
            return false;
        }
        log::debug!("Detaching subtree at path segment {segment:?}");
        node.children.remove(index);
        true
    }
}
