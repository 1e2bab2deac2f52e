// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

//! Hierarchical, path-addressed key/value store.
//!
//! Values are attached to nodes of a tree, each node reached by an
//! immutable [`HierarchyPath`] of key segments. The [`traverse`] module
//! provides generic, capability-driven traversal algorithms that operate
//! over any node representation through injected accessor functions. Two
//! backends implement the [`Hierarchy`] facade: [`MutableHierarchy`]
//! mutates nodes in place, [`PersistentHierarchy`] is a copy-on-write
//! tree with snapshot isolation for concurrent readers.

mod capability;
pub use self::capability::{HasChildren, HasKeyedChildren, HasParent, HasValue};

mod edge;
pub use self::edge::HalfEdge;

mod hierarchy;
pub use self::hierarchy::{Hierarchy, InsertValueError, UnsupportedMaxDepthError};

mod mutable;
pub use self::mutable::{MutableHierarchy, MutableNode};

mod path;
pub use self::path::{DisplayPath, HierarchyPath, NoCommonAncestorError};

mod persistent;
pub use self::persistent::{PersistentHierarchy, PersistentNode};

pub mod traverse;
pub use self::traverse::{
    ChildrenFn, NoParentError, PathNotFoundError, TraversalOrder, Traverse,
};

#[cfg(test)]
mod tests;
