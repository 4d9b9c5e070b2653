//! Response path tracking.
//!
//! A [`Path`] identifies a position in the response tree: the sequence of
//! field names and list indices walked from the root to reach a value.
//! Paths are immutable; extending one produces a new one that shares its
//! prefix, the same way the reference executor's field stack shares parent
//! frames via [`std::sync::Arc`] rather than cloning the whole chain on every
//! field.

use std::{fmt, sync::Arc};

/// One step in a [`Path`]: either a response field name or a list index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A field's response key (its alias, if aliased).
    Field(Arc<str>),
    /// A zero-based index into a list.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Root,
    Link(Segment, Arc<Node>),
}

/// An immutable cons-list identifying a position in the response tree.
///
/// Two paths are equal iff their segment sequences are equal. [`Path`] is
/// used both as a map key (via [`Path::as_key`]) inside the patch
/// dispatcher, and as a wire value (via [`Path::as_array`]) inside every
/// [`crate::patch::PatchRecord`] and [`crate::error::ExecutionError`].
#[derive(Clone, Debug, Eq)]
pub struct Path {
    node: Arc<Node>,
    len: usize,
}

impl Path {
    /// The empty path, identifying the response root.
    pub fn empty() -> Self {
        Self {
            node: Arc::new(Node::Root),
            len: 0,
        }
    }

    /// Returns a new path with a field-name segment appended.
    #[must_use]
    pub fn append_field(&self, name: impl Into<Arc<str>>) -> Self {
        self.append(Segment::Field(name.into()))
    }

    /// Returns a new path with a list-index segment appended.
    #[must_use]
    pub fn append_index(&self, index: usize) -> Self {
        self.append(Segment::Index(index))
    }

    fn append(&self, segment: Segment) -> Self {
        Self {
            node: Arc::new(Node::Link(segment, Arc::clone(&self.node))),
            len: self.len + 1,
        }
    }

    /// Whether this path is the root (no segments).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments in this path.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the segments from root to leaf, in traversal order.
    pub fn as_array(&self) -> Vec<Segment> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = &self.node;
        while let Node::Link(seg, parent) = cur.as_ref() {
            out.push(seg.clone());
            cur = parent;
        }
        out.reverse();
        out
    }

    /// A stable string form of this path, used as a map key.
    ///
    /// Segments are joined with `.`; this is never exposed on the wire, only
    /// used internally by the dispatcher to index pending work.
    pub fn as_key(&self) -> String {
        self.as_array()
            .iter()
            .map(Segment::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Given two paths, the longest path whose segments are a prefix of both.
    ///
    /// Used by the dispatcher to compute the emitted `path` for a label whose
    /// constituent units resolved at different (but related) positions.
    pub fn longest_common_prefix(&self, other: &Path) -> Path {
        let a = self.as_array();
        let b = other.as_array();
        let mut prefix = Path::empty();
        for (sa, sb) in a.iter().zip(b.iter()) {
            if sa == sb {
                prefix = prefix.append(sa.clone());
            } else {
                break;
            }
        }
        prefix
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.as_array() == other.as_array()
    }
}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_array().hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segs = self.as_array();
        for (i, seg) in segs.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut path = Path::empty();
        for seg in iter {
            path = path.append(seg);
        }
        path
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let segs = self.as_array();
        let mut seq = serializer.serialize_seq(Some(segs.len()))?;
        for seg in &segs {
            match seg {
                Segment::Field(name) => seq.serialize_element(name.as_ref())?,
                Segment::Index(i) => seq.serialize_element(i)?,
            }
        }
        seq.end()
    }
}
