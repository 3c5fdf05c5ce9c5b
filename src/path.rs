//! Field paths for locating values inside nested records and lists.
//!
//! Validation descends through records and lists by extending a [`FieldPath`],
//! so every error carries the full route to the faulty leaf, e.g.
//! `servers[0].age`.

use std::fmt::{self, Display};

/// A single step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A record field, addressed by its canonical key.
    Field(String),
    /// A position inside a list or an intersection.
    Index(usize),
}

/// The location of a value relative to the value handed to `validate`.
///
/// # Example
///
/// ```rust
/// use fieldwork::FieldPath;
///
/// let path = FieldPath::from_field("servers").push_index(0).push_field("age");
/// assert_eq!(path.to_string(), "servers[0].age");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path, pointing at the validated value itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path made of a single field name.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Returns a new path with `name` appended; `self` is left untouched.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.into()));
        Self { segments }
    }

    /// Returns a new path with `index` appended; `self` is left untouched.
    pub fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// The first field name on the path, i.e. the top-level field that failed.
    pub fn head_field(&self) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            PathSegment::Field(name) => Some(name.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    /// The innermost field name on the path.
    pub fn leaf_field(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|segment| match segment {
            PathSegment::Field(name) => Some(name.as_str()),
            PathSegment::Index(_) => None,
        })
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}
