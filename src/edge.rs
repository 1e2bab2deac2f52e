// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

/// Half-edge from an implicit parent node to one of its children.
///
/// Owns the path segment addressing the child among its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HalfEdge<K, N> {
    /// Path segment from the (implicit) parent to the child node.
    pub segment: K,

    /// The child node.
    pub node: N,
}
