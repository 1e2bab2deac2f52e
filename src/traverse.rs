// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

//! Capability-driven traversal algorithms.
//!
//! Every algorithm is parameterized over plain accessor functions instead
//! of a node interface, so the same code traverses backend nodes and
//! arbitrary external values alike. A child accessor may report "no
//! children" either as `None` or as an empty collection; both are
//! normalized to empty and never treated as an error.

use std::{collections::VecDeque, fmt, vec};

use thiserror::Error;

use crate::{capability::HasChildren, HierarchyPath};

/// Expansion order for downward traversals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraversalOrder {
    /// Level order: all nodes of one depth before any node of the next.
    ///
    /// The default, because most callers want shallow, predictable
    /// expansion.
    #[default]
    BreadthFirst,

    /// Pre-order, left to right.
    DepthFirst,
}

/// Child accessor as a nameable function pointer type.
pub type ChildrenFn<N> = fn(&N) -> Option<Vec<N>>;

/// Node has no parent to navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("node has no parent")]
pub struct NoParentError;

/// Mandatory path resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no node found at path {attempted_path:?}")]
pub struct PathNotFoundError<K: fmt::Debug> {
    /// The sub-path up to and including the first unresolved segment.
    pub attempted_path: HierarchyPath<K>,
}

/// The direct children of `start`, in sibling order.
#[must_use]
pub fn children<N, F>(start: &N, children_of: F) -> Vec<N>
where
    F: Fn(&N) -> Option<Vec<N>>,
{
    children_of(start).unwrap_or_default()
}

/// All descendants of `start`, excluding `start` itself.
///
/// `max_depth` bounds the traversal: `Some(0)` yields nothing, `Some(1)`
/// only the direct children, `None` is unbounded.
#[must_use]
pub fn descendants<N, F>(
    start: &N,
    children_of: F,
    order: TraversalOrder,
    max_depth: Option<usize>,
) -> Descendants<N, F>
where
    F: Fn(&N) -> Option<Vec<N>>,
{
    let state = if max_depth == Some(0) {
        DescendState::empty(order)
    } else {
        DescendState::seeded(children_of(start).unwrap_or_default(), order)
    };
    Descendants {
        children_of,
        max_depth,
        state,
    }
}

/// Iterator over descendants, in breadth-first or depth-first order.
pub struct Descendants<N, F> {
    children_of: F,
    max_depth: Option<usize>,
    state: DescendState<N>,
}

enum DescendState<N> {
    /// FIFO queue of `(depth, node)` pairs, yielding level order.
    Breadth(VecDeque<(usize, N)>),
    /// Explicit stack of child iterators replacing recursion; the stack
    /// depth is the depth of the nodes produced by the topmost iterator.
    Depth(Vec<vec::IntoIter<N>>),
}

impl<N> DescendState<N> {
    fn empty(order: TraversalOrder) -> Self {
        match order {
            TraversalOrder::BreadthFirst => Self::Breadth(VecDeque::new()),
            TraversalOrder::DepthFirst => Self::Depth(Vec::new()),
        }
    }

    fn seeded(children: Vec<N>, order: TraversalOrder) -> Self {
        match order {
            TraversalOrder::BreadthFirst => {
                Self::Breadth(children.into_iter().map(|child| (1, child)).collect())
            }
            TraversalOrder::DepthFirst => {
                if children.is_empty() {
                    Self::Depth(Vec::new())
                } else {
                    Self::Depth(vec![children.into_iter()])
                }
            }
        }
    }
}

impl<N, F> Iterator for Descendants<N, F>
where
    F: Fn(&N) -> Option<Vec<N>>,
{
    type Item = N;

    fn next(&mut self) -> Option<N> {
        match &mut self.state {
            DescendState::Breadth(queue) => {
                let (depth, node) = queue.pop_front()?;
                if self.max_depth.map_or(true, |max_depth| depth < max_depth) {
                    let children = (self.children_of)(&node).unwrap_or_default();
                    queue.extend(children.into_iter().map(|child| (depth + 1, child)));
                }
                Some(node)
            }
            DescendState::Depth(stack) => loop {
                let next = stack.last_mut()?.next();
                let Some(node) = next else {
                    stack.pop();
                    continue;
                };
                let depth = stack.len();
                if self.max_depth.map_or(true, |max_depth| depth < max_depth) {
                    let children = (self.children_of)(&node).unwrap_or_default();
                    if !children.is_empty() {
                        stack.push(children.into_iter());
                    }
                }
                return Some(node);
            },
        }
    }
}

impl<N, F> fmt::Debug for Descendants<N, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descendants")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Like [`descendants()`], but yields `start` first.
///
/// A `max_depth` of `Some(0)` yields nothing, not even `start`.
#[must_use]
pub fn descendants_and_self<N, F>(
    start: &N,
    children_of: F,
    order: TraversalOrder,
    max_depth: Option<usize>,
) -> DescendantsAndSelf<N, F>
where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
{
    if max_depth == Some(0) {
        return DescendantsAndSelf {
            start: None,
            inner: Descendants {
                children_of,
                max_depth,
                state: DescendState::empty(order),
            },
        };
    }
    let inner = descendants(
        start,
        children_of,
        order,
        max_depth.map(|max_depth| max_depth - 1),
    );
    DescendantsAndSelf {
        start: Some(start.clone()),
        inner,
    }
}

/// Iterator over a start node followed by its descendants.
pub struct DescendantsAndSelf<N, F> {
    start: Option<N>,
    inner: Descendants<N, F>,
}

impl<N, F> Iterator for DescendantsAndSelf<N, F>
where
    F: Fn(&N) -> Option<Vec<N>>,
{
    type Item = N;

    fn next(&mut self) -> Option<N> {
        if let Some(start) = self.start.take() {
            return Some(start);
        }
        self.inner.next()
    }
}

impl<N, F> fmt::Debug for DescendantsAndSelf<N, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescendantsAndSelf").finish_non_exhaustive()
    }
}

/// Nodes of the subtree below (and including) `start` whose child
/// accessor reports no children.
///
/// A depth bound may suppress true leaves, but nodes cut off purely by
/// depth are never reported as leaves.
#[must_use]
pub fn leaves<N, F>(
    start: &N,
    children_of: F,
    order: TraversalOrder,
    max_depth: Option<usize>,
) -> Leaves<N, F>
where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
{
    Leaves {
        inner: descendants_and_self(start, children_of, order, max_depth),
    }
}

/// Iterator over the childless nodes of a subtree.
pub struct Leaves<N, F> {
    inner: DescendantsAndSelf<N, F>,
}

impl<N, F> Iterator for Leaves<N, F>
where
    F: Fn(&N) -> Option<Vec<N>>,
{
    type Item = N;

    fn next(&mut self) -> Option<N> {
        loop {
            let node = self.inner.next()?;
            let childless = (self.inner.inner.children_of)(&node)
                .map_or(true, |children| children.is_empty());
            if childless {
                return Some(node);
            }
        }
    }
}

impl<N, F> fmt::Debug for Leaves<N, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaves").finish_non_exhaustive()
    }
}

/// Depth-first leaves, each paired with the ancestor chain walked to
/// reach it.
///
/// The chain starts at the traversal start and ends at the leaf's
/// immediate parent; for a childless start node it is empty.
#[must_use]
pub fn leaves_with_breadcrumbs<N, F>(start: &N, children_of: F) -> LeavesWithBreadcrumbs<N, F>
where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
{
    LeavesWithBreadcrumbs {
        children_of,
        start: Some(start.clone()),
        stack: Vec::new(),
    }
}

/// Iterator pairing each leaf with its breadcrumb chain.
pub struct LeavesWithBreadcrumbs<N, F> {
    children_of: F,
    start: Option<N>,
    stack: Vec<(N, vec::IntoIter<N>)>,
}

impl<N, F> Iterator for LeavesWithBreadcrumbs<N, F>
where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
{
    type Item = (Vec<N>, N);

    fn next(&mut self) -> Option<(Vec<N>, N)> {
        if let Some(start) = self.start.take() {
            let children = (self.children_of)(&start).unwrap_or_default();
            if children.is_empty() {
                return Some((Vec::new(), start));
            }
            self.stack.push((start, children.into_iter()));
        }
        loop {
            let next = self.stack.last_mut()?.1.next();
            let Some(node) = next else {
                self.stack.pop();
                continue;
            };
            let children = (self.children_of)(&node).unwrap_or_default();
            if children.is_empty() {
                let breadcrumbs = self
                    .stack
                    .iter()
                    .map(|(ancestor, _)| ancestor.clone())
                    .collect();
                return Some((breadcrumbs, node));
            }
            self.stack.push((node, children.into_iter()));
        }
    }
}

impl<N, F> fmt::Debug for LeavesWithBreadcrumbs<N, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeavesWithBreadcrumbs").finish_non_exhaustive()
    }
}

/// Depth-first descendants-and-self that terminates on cyclic structures.
///
/// A child already present on the active ancestor path is skipped
/// entirely, so a node that reports itself as its own child is visited
/// exactly once. Only the active path is checked, not global visitation:
/// a node reachable via distinct non-cyclic paths is visited once per
/// path, so shared (diamond) structures are still fully traversed.
#[must_use]
pub fn descendants_and_self_cycle_safe<N, F>(
    start: &N,
    children_of: F,
) -> CycleSafeDescendantsAndSelf<N, F>
where
    N: Clone + PartialEq,
    F: Fn(&N) -> Option<Vec<N>>,
{
    CycleSafeDescendantsAndSelf {
        children_of,
        start: Some(start.clone()),
        stack: Vec::new(),
    }
}

/// Iterator over a subtree that skips re-descending into any node
/// already on the active path.
pub struct CycleSafeDescendantsAndSelf<N, F> {
    children_of: F,
    start: Option<N>,
    stack: Vec<(N, vec::IntoIter<N>)>,
}

impl<N, F> Iterator for CycleSafeDescendantsAndSelf<N, F>
where
    N: Clone + PartialEq,
    F: Fn(&N) -> Option<Vec<N>>,
{
    type Item = N;

    fn next(&mut self) -> Option<N> {
        if let Some(start) = self.start.take() {
            let children = (self.children_of)(&start).unwrap_or_default();
            self.stack.push((start.clone(), children.into_iter()));
            return Some(start);
        }
        loop {
            let next = self.stack.last_mut()?.1.next();
            let Some(node) = next else {
                self.stack.pop();
                continue;
            };
            if self.stack.iter().any(|(on_path, _)| *on_path == node) {
                continue;
            }
            let children = (self.children_of)(&node).unwrap_or_default();
            self.stack.push((node.clone(), children.into_iter()));
            return Some(node);
        }
    }
}

impl<N, F> fmt::Debug for CycleSafeDescendantsAndSelf<N, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleSafeDescendantsAndSelf")
            .finish_non_exhaustive()
    }
}

/// Depth-first push traversal of the descendants of `start`.
///
/// The visitor receives the breadcrumb slice together with each node: the
/// ancestor chain from the traversal start (inclusive) down to the node's
/// parent. The slice points into a single buffer that is rewritten
/// between invocations, so callbacks must copy whatever they keep.
pub fn visit_descendants<N, F, V>(start: &N, children_of: F, max_depth: Option<usize>, mut visit: V)
where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
    V: FnMut(&[N], &N),
{
    let mut breadcrumbs = vec![start.clone()];
    visit_below(
        start,
        &children_of,
        max_depth,
        1,
        &mut breadcrumbs,
        &mut visit,
    );
}

/// Like [`visit_descendants()`], but visits `start` first with an empty
/// breadcrumb slice. A `max_depth` of `Some(0)` visits nothing.
pub fn visit_descendants_and_self<N, F, V>(
    start: &N,
    children_of: F,
    max_depth: Option<usize>,
    mut visit: V,
) where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
    V: FnMut(&[N], &N),
{
    if max_depth == Some(0) {
        return;
    }
    visit(&[], start);
    visit_descendants(
        start,
        children_of,
        max_depth.map(|max_depth| max_depth - 1),
        visit,
    );
}

fn visit_below<N, F, V>(
    node: &N,
    children_of: &F,
    max_depth: Option<usize>,
    depth: usize,
    breadcrumbs: &mut Vec<N>,
    visit: &mut V,
) where
    N: Clone,
    F: Fn(&N) -> Option<Vec<N>>,
    V: FnMut(&[N], &N),
{
    if max_depth.map_or(false, |max_depth| depth > max_depth) {
        return;
    }
    for child in children_of(node).unwrap_or_default() {
        visit(breadcrumbs, &child);
        breadcrumbs.push(child.clone());
        visit_below(&child, children_of, max_depth, depth + 1, breadcrumbs, visit);
        breadcrumbs.pop();
    }
}

/// The immediate parent of `start`.
///
/// Fails if the node has no parent.
pub fn parent<N, P>(start: &N, parent_of: P) -> Result<N, NoParentError>
where
    P: Fn(&N) -> Option<N>,
{
    parent_of(start).ok_or(NoParentError)
}

/// Upward walk from the parent of `start` to the root.
#[must_use]
pub fn ancestors<N, P>(start: &N, parent_of: P) -> Ancestors<N, P>
where
    P: Fn(&N) -> Option<N>,
{
    let next = parent_of(start);
    Ancestors { parent_of, next }
}

/// Upward walk from `start` itself to the root.
#[must_use]
pub fn ancestors_and_self<N, P>(start: &N, parent_of: P) -> Ancestors<N, P>
where
    N: Clone,
    P: Fn(&N) -> Option<N>,
{
    Ancestors {
        parent_of,
        next: Some(start.clone()),
    }
}

/// Iterator walking parent links upward until none remains.
pub struct Ancestors<N, P> {
    parent_of: P,
    next: Option<N>,
}

impl<N, P> Iterator for Ancestors<N, P>
where
    P: Fn(&N) -> Option<N>,
{
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let node = self.next.take()?;
        self.next = (self.parent_of)(&node);
        Some(node)
    }
}

impl<N, P> fmt::Debug for Ancestors<N, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ancestors").finish_non_exhaustive()
    }
}

/// The siblings after `start`, in sibling order.
///
/// The start node is located among its parent's children by equality.
/// A node without a parent has no siblings and yields an empty result
/// rather than an error.
#[must_use]
pub fn following_siblings<N, P, F>(start: &N, parent_of: P, children_of: F) -> Vec<N>
where
    N: PartialEq,
    P: Fn(&N) -> Option<N>,
    F: Fn(&N) -> Option<Vec<N>>,
{
    let Some(parent) = parent_of(start) else {
        return Vec::new();
    };
    children_of(&parent)
        .unwrap_or_default()
        .into_iter()
        .skip_while(|sibling| sibling != start)
        .skip(1)
        .collect()
}

/// The siblings before `start`, in sibling order.
#[must_use]
pub fn preceding_siblings<N, P, F>(start: &N, parent_of: P, children_of: F) -> Vec<N>
where
    N: PartialEq,
    P: Fn(&N) -> Option<N>,
    F: Fn(&N) -> Option<Vec<N>>,
{
    let Some(parent) = parent_of(start) else {
        return Vec::new();
    };
    children_of(&parent)
        .unwrap_or_default()
        .into_iter()
        .take_while(|sibling| sibling != start)
        .collect()
}

/// Resolve a path below `start`, one segment at a time.
///
/// Fails on the first missing segment; the error carries the attempted
/// sub-path.
pub fn descendant_at<N, K, G>(
    start: &N,
    path: &HierarchyPath<K>,
    child_by_key: G,
) -> Result<N, PathNotFoundError<K>>
where
    N: Clone,
    K: Clone + fmt::Debug,
    G: Fn(&N, &K) -> Option<N>,
{
    let mut node = start.clone();
    for (resolved, segment) in path.segments().iter().enumerate() {
        node = child_by_key(&node, segment).ok_or_else(|| PathNotFoundError {
            attempted_path: path.prefix(resolved + 1),
        })?;
    }
    Ok(node)
}

/// Like [`descendant_at()`], but absence is a normal outcome.
#[must_use]
pub fn try_descendant_at<N, K, G>(start: &N, path: &HierarchyPath<K>, child_by_key: G) -> Option<N>
where
    N: Clone,
    G: Fn(&N, &K) -> Option<N>,
{
    let mut node = start.clone();
    for segment in path.segments() {
        node = child_by_key(&node, segment)?;
    }
    Some(node)
}

/// Like [`descendant_at()`], but an unresolvable path yields the
/// caller-supplied default.
///
/// Also reports the longest successfully resolved prefix path: the full
/// path when resolution succeeded.
#[must_use]
pub fn descendant_at_or_default<N, K, G>(
    start: &N,
    path: &HierarchyPath<K>,
    child_by_key: G,
    default: N,
) -> (N, HierarchyPath<K>)
where
    N: Clone,
    K: Clone,
    G: Fn(&N, &K) -> Option<N>,
{
    let mut node = start.clone();
    for (resolved, segment) in path.segments().iter().enumerate() {
        match child_by_key(&node, segment) {
            Some(child) => node = child,
            None => return (default, path.prefix(resolved)),
        }
    }
    (node, path.clone())
}

/// Resolve a path below `start` and visit both the target and the nodes
/// passed en route.
///
/// `on_descendant` is invoked once with the target; `on_ancestor` is then
/// invoked for every node between `start` (inclusive) and the target,
/// nearest-first. An unresolvable path fails without invoking either
/// callback.
pub fn visit_descendant_at_and_ancestors<N, K, G>(
    start: &N,
    path: &HierarchyPath<K>,
    child_by_key: G,
    on_descendant: impl FnOnce(&N),
    mut on_ancestor: impl FnMut(&N),
) -> Result<(), PathNotFoundError<K>>
where
    N: Clone,
    K: Clone + fmt::Debug,
    G: Fn(&N, &K) -> Option<N>,
{
    let mut ancestors = Vec::with_capacity(path.segment_count());
    let mut node = start.clone();
    for (resolved, segment) in path.segments().iter().enumerate() {
        let child = child_by_key(&node, segment).ok_or_else(|| PathNotFoundError {
            attempted_path: path.prefix(resolved + 1),
        })?;
        ancestors.push(node);
        node = child;
    }
    on_descendant(&node);
    for ancestor in ancestors.iter().rev() {
        on_ancestor(ancestor);
    }
    Ok(())
}

/// Downward traversal surface bundling a start node with its child
/// accessor.
///
/// This is what [`crate::Hierarchy::traverse`] hands out; it can also be
/// built over any node type or external value directly.
pub struct Traverse<N, C> {
    start: N,
    children_of: C,
}

impl<N, C> Traverse<N, C>
where
    N: Clone,
    C: Fn(&N) -> Option<Vec<N>>,
{
    #[must_use]
    pub fn new(start: N, children_of: C) -> Self {
        Self { start, children_of }
    }

    #[must_use]
    pub fn start(&self) -> &N {
        &self.start
    }

    #[must_use]
    pub fn children(&self) -> Vec<N> {
        children(&self.start, &self.children_of)
    }

    #[must_use]
    pub fn descendants(
        &self,
        order: TraversalOrder,
        max_depth: Option<usize>,
    ) -> Descendants<N, &C> {
        descendants(&self.start, &self.children_of, order, max_depth)
    }

    #[must_use]
    pub fn descendants_and_self(
        &self,
        order: TraversalOrder,
        max_depth: Option<usize>,
    ) -> DescendantsAndSelf<N, &C> {
        descendants_and_self(&self.start, &self.children_of, order, max_depth)
    }

    #[must_use]
    pub fn leaves(&self, order: TraversalOrder, max_depth: Option<usize>) -> Leaves<N, &C> {
        leaves(&self.start, &self.children_of, order, max_depth)
    }

    #[must_use]
    pub fn leaves_with_breadcrumbs(&self) -> LeavesWithBreadcrumbs<N, &C> {
        leaves_with_breadcrumbs(&self.start, &self.children_of)
    }

    #[must_use]
    pub fn descendants_and_self_cycle_safe(&self) -> CycleSafeDescendantsAndSelf<N, &C>
    where
        N: PartialEq,
    {
        descendants_and_self_cycle_safe(&self.start, &self.children_of)
    }

    pub fn visit_descendants(&self, max_depth: Option<usize>, visit: impl FnMut(&[N], &N)) {
        visit_descendants(&self.start, &self.children_of, max_depth, visit);
    }

    pub fn visit_descendants_and_self(
        &self,
        max_depth: Option<usize>,
        visit: impl FnMut(&[N], &N),
    ) {
        visit_descendants_and_self(&self.start, &self.children_of, max_depth, visit);
    }
}

impl<N> Traverse<N, ChildrenFn<N>>
where
    N: HasChildren + Clone,
{
    /// Build a traversal surface over any node implementing
    /// [`HasChildren`].
    #[must_use]
    pub fn over(start: N) -> Self {
        fn children_of<T: HasChildren>(node: &T) -> Option<Vec<T>> {
            node.children()
        }
        Self {
            start,
            children_of: children_of::<N> as ChildrenFn<N>,
        }
    }
}

impl<N: fmt::Debug, C> fmt::Debug for Traverse<N, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traverse")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}
