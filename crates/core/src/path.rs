//! Field paths into source records
//!
//! This module defines:
//! - FieldPath: a path from a record root to a field (e.g. `address.city`)
//! - PathSegment: individual path component (Field or Index)
//! - PathParseError: structured parse failures
//!
//! A direct accessor binds to a field path; resolution walks the path
//! segment by segment through nested objects and arrays.

use crate::limits::MAX_PATH_SEGMENTS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for field path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Path string was empty
    #[error("empty field path")]
    Empty,
    /// Empty field name in path
    #[error("empty field name at position {0}")]
    EmptyField(usize),
    /// Path may not start with an array index
    #[error("path starts with an array index at position {0}")]
    LeadingIndex(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Too many segments
    #[error("path length {length} exceeds maximum of {max} segments")]
    TooManySegments {
        /// Actual segment count
        length: usize,
        /// Maximum allowed count
        max: usize,
    },
}

/// A segment in a field path
///
/// Paths are composed of field segments (object property access)
/// and index segments (array element access).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object field: `.city`
    Field(String),
    /// Array index: `[0]`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{}", name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A path from a record root to a field
///
/// FieldPath identifies the source field a direct accessor reads. Paths
/// always start with a field segment (records are objects at the root) and
/// may descend through nested objects and arrays:
///
/// | Syntax | Meaning | Example |
/// |--------|---------|---------|
/// | `name` | Top-level field | `lastname` |
/// | `a.b` | Nested field | `address.city` |
/// | `a[n]` | Array element | `emails[0]` |
/// | `a[n].b` | Mixed | `orders[2].total` |
///
/// # Examples
///
/// ```
/// use prism_core::FieldPath;
///
/// // Build paths
/// let city = FieldPath::field("address").key("city");
/// let first_email = FieldPath::field("emails").index(0);
///
/// // Parse from string
/// let path: FieldPath = "address.city".parse().unwrap();
/// assert_eq!(path, city);
/// assert_eq!(path.to_string(), "address.city");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Create a single-segment path naming a top-level field
    pub fn field(name: impl Into<String>) -> Self {
        FieldPath {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Append a field segment (builder pattern)
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Field(name.into()));
        self
    }

    /// Append an index segment (builder pattern)
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(PathSegment::Index(idx));
        self
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Get the number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// A field path always has at least one segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The top-level record field this path enters through
    ///
    /// Returns `None` only for paths assembled from raw segments that start
    /// with an index; paths built via [`FieldPath::field`] or parsed from a
    /// string always have a field root.
    pub fn root_field(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// Concatenate two paths
    ///
    /// Used when flattening nested shapes into fetch hints: a child shape's
    /// path is joined onto the path of the accessor that embeds it, yielding
    /// the full path from the aggregate root (`address` + `city` =
    /// `address.city`).
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        FieldPath { segments }
    }

    /// Validate path length limit
    ///
    /// Returns an error if the path exceeds [`MAX_PATH_SEGMENTS`].
    pub fn validate(&self) -> Result<(), PathParseError> {
        let length = self.segments.len();
        if length > MAX_PATH_SEGMENTS {
            Err(PathParseError::TooManySegments {
                length,
                max: MAX_PATH_SEGMENTS,
            })
        } else {
            Ok(())
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    /// Parse a path from a string
    ///
    /// Supported syntax:
    /// - `foo` - top-level field
    /// - `foo.bar` - nested fields
    /// - `foo[0]` - field then index
    /// - `foo[0].bar` - mixed
    ///
    /// An empty string and a leading `[` are rejected: every path names at
    /// least one record field.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathParseError::Empty);
        }

        let mut segments = Vec::new();
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;

        if chars[0] == '[' {
            return Err(PathParseError::LeadingIndex(0));
        }

        while i < chars.len() {
            if chars[i] == '.' {
                // Start of a field segment
                i += 1;
                if i >= chars.len() || chars[i] == '.' || chars[i] == '[' {
                    return Err(PathParseError::EmptyField(i));
                }
            }

            if chars[i] == '[' {
                // Array index segment
                let start = i;
                i += 1;
                let idx_start = i;

                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }

                if i >= chars.len() {
                    return Err(PathParseError::UnclosedBracket(start));
                }

                let idx_str: String = chars[idx_start..i].iter().collect();
                let idx = idx_str
                    .parse::<usize>()
                    .map_err(|_| PathParseError::InvalidIndex(idx_start, idx_str))?;

                segments.push(PathSegment::Index(idx));
                i += 1; // Skip closing bracket
            } else if chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-' {
                // Field segment
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-')
                {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                segments.push(PathSegment::Field(name));
            } else {
                return Err(PathParseError::UnexpectedChar(chars[i], i));
            }
        }

        let path = FieldPath { segments };
        path.validate()?;
        Ok(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Field(name) if pos == 0 => write!(f, "{}", name)?,
                seg => write!(f, "{}", seg)?,
            }
        }
        Ok(())
    }
}
