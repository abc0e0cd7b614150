//! Route template compilation.
//!
//! # Grammar
//! ```text
//! template := "/"? segment ("/" segment)* "/"?
//! segment  := literal | ":" name | "*"
//! ```
//! - `:name` binds exactly one path component
//! - `*` binds the remainder of the path and must be the last segment
//! - Empty segments (`//`, leading or trailing `/`) are ignored

use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors raised while compiling a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("parameter at segment {0} has no name")]
    EmptyParamName(usize),

    #[error("parameter {0} appears more than once")]
    DuplicateParam(String),

    #[error("wildcard must be the final segment")]
    WildcardNotLast,

    #[error("segment {segment:?} contains reserved character {character:?}")]
    ReservedCharacter { segment: String, character: char },
}

/// One compiled segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

impl Segment {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(s) => f.write_str(s),
            Segment::Param(name) => write!(f, ":{name}"),
            Segment::Wildcard => f.write_str("*"),
        }
    }
}

/// A compiled, immutable route pattern.
///
/// Two patterns are equal when their segment sequences are equal; the
/// template text they were compiled from does not participate.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a template.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let source = template.trim();
        if source.is_empty() {
            return Err(PatternError::Empty);
        }

        let raw: Vec<&str> = source.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<&str> = Vec::new();

        for (index, part) in raw.iter().enumerate() {
            let segment = if *part == "*" {
                if index + 1 != raw.len() {
                    return Err(PatternError::WildcardNotLast);
                }
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName(index));
                }
                if names.contains(&name) {
                    return Err(PatternError::DuplicateParam(name.to_string()));
                }
                names.push(name);
                Segment::Param(name.to_string())
            } else {
                if let Some(character) = part.chars().find(|c| matches!(c, '?' | '#' | '*')) {
                    return Err(PatternError::ReservedCharacter {
                        segment: part.to_string(),
                        character,
                    });
                }
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template text this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compiled segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of `:param` and `*` segments. Lower is more specific.
    pub fn dynamic_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_dynamic()).count()
    }

    /// Whether the pattern ends in `*`.
    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard))
    }

    /// Whether both patterns match exactly the same URLs.
    ///
    /// Unlike `==`, parameter names are ignored: `/a/:x` and `/a/:y` have
    /// the same shape.
    pub fn same_shape(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    (Segment::Wildcard, Segment::Wildcard) => true,
                    _ => false,
                })
    }

    /// Names bound by this pattern, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Wildcard => Some("*"),
            Segment::Literal(_) => None,
        })
    }
}

impl PartialEq for RoutePattern {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for RoutePattern {}

impl Hash for RoutePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

/// Canonical form: `/a/:b/*`.
impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for RoutePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_segments() {
        let pattern = RoutePattern::compile("/user/:id/files/*").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("user".into()),
                Segment::Param("id".into()),
                Segment::Literal("files".into()),
                Segment::Wildcard,
            ]
        );
        assert_eq!(pattern.dynamic_count(), 2);
        assert!(pattern.has_wildcard());
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id", "*"]);
    }

    #[test]
    fn test_empty_is_rejected() {
        assert_eq!(RoutePattern::compile(""), Err(PatternError::Empty));
        assert_eq!(RoutePattern::compile("   "), Err(PatternError::Empty));
    }

    #[test]
    fn test_root_pattern() {
        let root = RoutePattern::compile("/").unwrap();
        assert!(root.segments().is_empty());
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn test_invalid_templates() {
        assert_eq!(
            RoutePattern::compile("/files/*/more"),
            Err(PatternError::WildcardNotLast)
        );
        assert_eq!(
            RoutePattern::compile("/user/:"),
            Err(PatternError::EmptyParamName(1))
        );
        assert_eq!(
            RoutePattern::compile("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam("id".into()))
        );
        assert!(matches!(
            RoutePattern::compile("/search?q"),
            Err(PatternError::ReservedCharacter { character: '?', .. })
        ));
    }

    #[test]
    fn test_equality_ignores_slashes() {
        let a = RoutePattern::compile("/user/:id").unwrap();
        let b = RoutePattern::compile("user//:id/").unwrap();
        let c = RoutePattern::compile("/user/:uid").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert_eq!(b.to_string(), "/user/:id");
    }

    #[test]
    fn test_same_shape_ignores_param_names() {
        let a = RoutePattern::compile("/user/:id/*").unwrap();
        assert!(a.same_shape(&RoutePattern::compile("/user/:uid/*").unwrap()));
        assert!(!a.same_shape(&RoutePattern::compile("/user/:id/:rest").unwrap()));
        assert!(!a.same_shape(&RoutePattern::compile("/users/:id/*").unwrap()));
        assert!(!a.same_shape(&RoutePattern::compile("/user/:id").unwrap()));
    }
}
