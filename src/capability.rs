// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

//! Capability contracts for tree nodes.
//!
//! Each trait covers one navigational capability. A node type implements
//! whichever subset its representation supports. The traversal engine in
//! [`crate::traverse`] never requires the traits themselves, since it is
//! parameterized over plain accessor functions, but bridges exist for
//! types that do implement them.

/// Downward navigation to ordered child nodes.
pub trait HasChildren: Sized {
    #[must_use]
    fn has_children(&self) -> bool;

    /// The node's children in sibling order.
    ///
    /// Implementations may report "no children" either as `None` or as an
    /// empty collection; consumers must treat both the same. This must
    /// tolerate being called even when [`Self::has_children()`] is false.
    #[must_use]
    fn children(&self) -> Option<Vec<Self>>;
}

/// Downward navigation to a child identified by a path segment.
///
/// Each child is reachable by one segment that is unique among its
/// siblings.
pub trait HasKeyedChildren<K>: Sized {
    #[must_use]
    fn try_get_child(&self, segment: &K) -> Option<Self>;
}

/// Upward navigation to the parent node.
pub trait HasParent: Sized {
    #[must_use]
    fn has_parent(&self) -> bool;

    /// The immediate parent, or `None` for a root node.
    #[must_use]
    fn parent(&self) -> Option<Self>;
}

/// Access to the value optionally held by a node.
pub trait HasValue<V> {
    #[must_use]
    fn try_get_value(&self) -> Option<V>;

    /// Store a value on the node.
    ///
    /// Returns `false` if the node is structurally incapable of holding
    /// a value, e.g. an immutable snapshot handle or a synthesized
    /// pseudo-node.
    fn try_set_value(&mut self, value: V) -> bool;
}
