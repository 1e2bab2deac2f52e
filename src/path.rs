// SPDX-FileCopyrightText: The path-hierarchy authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::Arc,
};

use thiserror::Error;

/// Immutable, ordered sequence of key segments addressing a node
/// relative to a root.
///
/// The empty path is the root path. Paths are cheap to clone and are
/// never mutated in place; all operations that "modify" a path produce
/// a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyPath<K> {
    segments: Arc<[K]>,
}

impl<K> HierarchyPath<K> {
    /// The root path, i.e. the path with no segments.
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Vec::new().into(),
        }
    }

    #[must_use]
    pub fn new(segments: impl IntoIterator<Item = K>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn segments(&self) -> &[K] {
        &self.segments
    }

    #[must_use]
    pub fn first_segment(&self) -> Option<&K> {
        self.segments.first()
    }

    /// The segment addressing this path's node from its parent.
    #[must_use]
    pub fn last_segment(&self) -> Option<&K> {
        self.segments.last()
    }

    /// The path of all but the last segment.
    ///
    /// Returns `None` for the root path, which has no parent.
    #[must_use]
    pub fn parent(&self) -> Option<Self>
    where
        K: Clone,
    {
        if self.is_root() {
            return None;
        }
        Some(self.prefix(self.segments.len() - 1))
    }

    /// The path truncated to its first `len` segments.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds [`Self::segment_count()`].
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self
    where
        K: Clone,
    {
        assert!(len <= self.segments.len());
        Self {
            segments: self.segments[..len].into(),
        }
    }

    /// The single-segment path of the last segment.
    ///
    /// Root and single-segment paths are returned unchanged.
    #[must_use]
    pub fn leaf(&self) -> Self
    where
        K: Clone,
    {
        if self.segments.len() <= 1 {
            return self.clone();
        }
        Self {
            segments: self.segments[self.segments.len() - 1..].into(),
        }
    }

    /// Append a single segment, producing a new path.
    #[must_use]
    pub fn join(&self, segment: K) -> Self
    where
        K: Clone,
    {
        Self {
            segments: self
                .segments
                .iter()
                .cloned()
                .chain(std::iter::once(segment))
                .collect(),
        }
    }

    /// Append all segments of another path, producing a new path.
    #[must_use]
    pub fn join_path(&self, other: &Self) -> Self
    where
        K: Clone,
    {
        Self {
            segments: self
                .segments
                .iter()
                .chain(other.segments.iter())
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool
    where
        K: PartialEq,
    {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(segment, prefix_segment)| segment == prefix_segment)
    }

    /// Strict ancestor test: `self` must be a proper prefix of `other`.
    ///
    /// No path is an ancestor of itself.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool
    where
        K: PartialEq,
    {
        self.segments.len() < other.segments.len() && other.starts_with(self)
    }

    /// Strip the common prefix shared with `ancestor`.
    ///
    /// The root path is a no-op ancestor of every path. A non-root
    /// `ancestor` that shares no leading segment at all is rejected.
    pub fn relative_to_ancestor(&self, ancestor: &Self) -> Result<Self, NoCommonAncestorError>
    where
        K: Clone + PartialEq,
    {
        if ancestor.is_root() {
            return Ok(self.clone());
        }
        let common = self
            .segments
            .iter()
            .zip(ancestor.segments.iter())
            .take_while(|(segment, ancestor_segment)| segment == ancestor_segment)
            .count();
        if common == 0 {
            return Err(NoCommonAncestorError);
        }
        Ok(Self {
            segments: self.segments[common..].into(),
        })
    }

    /// Render with a custom separator instead of the default `/`.
    #[must_use]
    pub fn display_with(&self, separator: char) -> DisplayPath<'_, K> {
        DisplayPath {
            path: self,
            separator,
        }
    }

    /// Parse a separated string, converting each segment with `convert`.
    ///
    /// Empty segments are skipped, so repeated or trailing separators do
    /// not produce empty path segments. Conversion failures propagate
    /// unmodified.
    pub fn parse_with<E>(
        input: &str,
        separator: char,
        mut convert: impl FnMut(&str) -> Result<K, E>,
    ) -> Result<Self, E> {
        input
            .split(separator)
            .filter(|segment| !segment.is_empty())
            .map(|segment| convert(segment))
            .collect::<Result<_, _>>()
            .map(|segments| Self { segments })
    }

    /// Parse a separated string of [`FromStr`] segments.
    pub fn parse(input: &str, separator: char) -> Result<Self, <K as FromStr>::Err>
    where
        K: FromStr,
    {
        Self::parse_with(input, separator, str::parse)
    }

    /// Like [`Self::parse`], but any failure becomes `None`.
    #[must_use]
    pub fn try_parse(input: &str, separator: char) -> Option<Self>
    where
        K: FromStr,
    {
        Self::parse(input, separator).ok()
    }
}

impl<K> Default for HierarchyPath<K> {
    fn default() -> Self {
        Self::root()
    }
}

impl<K> FromIterator<K> for HierarchyPath<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<K> From<Vec<K>> for HierarchyPath<K> {
    fn from(segments: Vec<K>) -> Self {
        Self {
            segments: segments.into(),
        }
    }
}

impl<K: Clone> From<&[K]> for HierarchyPath<K> {
    fn from(segments: &[K]) -> Self {
        Self {
            segments: segments.into(),
        }
    }
}

/// Folds the segment count and every segment into the hasher stream.
///
/// Equal paths hash equal, so paths are safe keys for hashed maps.
impl<K: Hash> Hash for HierarchyPath<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.segments.len());
        for segment in self.segments.iter() {
            segment.hash(state);
        }
    }
}

impl<K: fmt::Display> fmt::Display for HierarchyPath<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display_with('/').fmt(f)
    }
}

/// Borrowed rendering of a path with a configurable separator.
#[derive(Debug, Clone, Copy)]
pub struct DisplayPath<'a, K> {
    path: &'a HierarchyPath<K>,
    separator: char,
}

impl<K: fmt::Display> fmt::Display for DisplayPath<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.path.segments().iter();
        if let Some(first) = segments.next() {
            write!(f, "{first}")?;
            for segment in segments {
                write!(f, "{separator}{segment}", separator = self.separator)?;
            }
        }
        Ok(())
    }
}

/// The supplied ancestor path shares no leading segments with the path
/// it should be stripped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("paths share no common segments")]
pub struct NoCommonAncestorError;
