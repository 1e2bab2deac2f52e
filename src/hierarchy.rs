// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

use std::fmt;

use thiserror::Error;

use crate::{traverse::PathNotFoundError, HierarchyPath};

/// Storing a value was rejected.
///
/// In both cases the rejected value is handed back to the caller.
#[derive(Debug, Error)]
pub enum InsertValueError<V: fmt::Debug> {
    /// `add` on a node that already holds a value.
    #[error("a value is already present at the target node")]
    ValueAlreadyPresent(V),

    /// Explicit mutation of a store seeded with a default value.
    ///
    /// Default seeding and explicit mutation are mutually exclusive:
    /// re-seeding semantics after a removal would otherwise be ambiguous.
    #[error("the hierarchy was seeded with a default value and rejects explicit mutation")]
    DefaultSeeded(V),
}

impl<V: fmt::Debug> InsertValueError<V> {
    /// Regain ownership of the rejected value.
    pub fn into_value(self) -> V {
        match self {
            Self::ValueAlreadyPresent(value) | Self::DefaultSeeded(value) => value,
        }
    }
}

/// Value removal only supports the target node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("removing values below the target node is not supported (max depth {max_depth})")]
pub struct UnsupportedMaxDepthError {
    pub max_depth: usize,
}

/// Public contract of a path-addressed key/value store.
///
/// Implemented by [`crate::MutableHierarchy`] (in-place mutation, callers
/// provide exclusive access) and [`crate::PersistentHierarchy`]
/// (copy-on-write, safe for concurrent readers), so callers choose
/// persistence semantics without changing call sites.
pub trait Hierarchy<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    /// Traversal surface returned by [`Self::traverse`].
    type Cursor<'a>
    where
        Self: 'a;

    /// Store a value at `path`, creating missing intermediate nodes.
    ///
    /// Overwrites an existing value unconditionally. Fails only on a
    /// default-seeded store.
    fn set_value(&mut self, path: &HierarchyPath<K>, value: V) -> Result<(), InsertValueError<V>>;

    /// Store a value at `path`, creating missing intermediate nodes.
    ///
    /// Unlike [`Self::set_value`], fails if the target node already
    /// holds a value.
    fn add_value(&mut self, path: &HierarchyPath<K>, value: V) -> Result<(), InsertValueError<V>>;

    /// The value at `path`, if any.
    ///
    /// An absent path and a valueless node are both `None`; this never
    /// fails.
    #[must_use]
    fn get_value(&self, path: &HierarchyPath<K>) -> Option<V>;

    /// Clear the value at `path` and prune ancestors that became empty.
    ///
    /// Returns whether a value was actually cleared. Only the target
    /// node's own value is touched: a `max_depth` beyond 1 is rejected
    /// fast instead of being silently ignored.
    fn remove_value(
        &mut self,
        path: &HierarchyPath<K>,
        max_depth: usize,
    ) -> Result<bool, UnsupportedMaxDepthError>;

    /// Detach the node at `path` and prune ancestors that became empty.
    ///
    /// Returns `false` if the path does not resolve, or if the target
    /// has children and `recurse` was not requested. The root node is
    /// never detached; removing it resets it to a fresh empty root
    /// instead, which is not an error.
    fn remove_node(&mut self, path: &HierarchyPath<K>, recurse: bool) -> bool;

    /// Resolve `start` and wrap the node in the generic traversal
    /// surface.
    ///
    /// The start node must exist; the error carries the attempted
    /// sub-path.
    fn traverse(&self, start: &HierarchyPath<K>) -> Result<Self::Cursor<'_>, PathNotFoundError<K>>;
}
