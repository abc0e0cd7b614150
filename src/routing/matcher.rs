//! URL parsing and pattern matching.
//!
//! # Responsibilities
//! - Parse URL-like input (`app://user/42?tab=posts#top` or `/user/42`)
//! - Produce the normalized form used as cache key
//! - Match a compiled pattern segment by segment, binding parameters
//!
//! # Design Decisions
//! - Custom schemes keep their host as the first path component
//! - `http`/`https` hosts are dropped; only the path routes
//! - Literal comparison is case-sensitive on decoded components
//! - Path bindings override query pairs with the same key

use percent_encoding::{
    percent_decode_str, utf8_percent_encode, AsciiSet, PercentEncode, CONTROLS,
};
use url::{form_urlencoded, Url};

use crate::error::{Result, RouterError};
use crate::routing::params::Parameters;
use crate::routing::pattern::{RoutePattern, Segment};

/// Scheme used to resolve bare paths into absolute URLs.
const BASE_SCHEME: &str = "waypoint-internal";

/// Schemes whose host is a network location rather than a route component.
const NETWORK_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "ftp", "file"];

/// Characters escaped when rebuilding a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Key under which a wildcard binds the remaining path.
pub const WILDCARD_KEY: &str = "*";

/// Key under which the URL fragment is bound.
pub const FRAGMENT_KEY: &str = "fragment";

/// A parsed, decoded URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    original: String,
    scheme: Option<String>,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    fragment: Option<String>,
}

impl ParsedUrl {
    /// Parse URL-like input.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RouterError::invalid_url(input, "empty URL"));
        }

        let base = Url::parse(&format!("{BASE_SCHEME}:///"))
            .map_err(|e| RouterError::invalid_url(input, e.to_string()))?;
        let url = Url::options()
            .base_url(Some(&base))
            .parse(trimmed)
            .map_err(|e| RouterError::invalid_url(input, e.to_string()))?;

        let scheme = match url.scheme() {
            BASE_SCHEME => None,
            other => Some(other.to_string()),
        };

        let mut segments = Vec::new();
        if !scheme.as_deref().is_some_and(is_network_scheme) {
            if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
                segments.push(decode(input, host)?);
            }
        }

        if url.cannot_be_a_base() {
            return Err(RouterError::invalid_url(input, "URL has no hierarchical path"));
        }
        for raw in url.path_segments().into_iter().flatten().filter(|s| !s.is_empty()) {
            segments.push(decode(input, raw)?);
        }

        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let fragment = match url.fragment() {
            Some(f) if !f.is_empty() => Some(decode(input, f)?),
            _ => None,
        };

        Ok(Self {
            original: input.to_string(),
            scheme,
            segments,
            query,
            fragment,
        })
    }

    /// The input exactly as given.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// URL scheme, `None` for bare paths.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Decoded path components.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Decoded query pairs in input order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Number of path components.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Decoded path joined with `/`, always starting with `/`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Canonical string form: re-encoded path, sorted query, fragment.
    ///
    /// Equivalent spellings of the same URL normalize identically. Network
    /// schemes normalize to a bare path since their host never routes; the
    /// scheme survives as the navigation namespace.
    pub fn normalized(&self) -> String {
        let mut out = String::new();
        if let Some(scheme) = self.scheme.as_deref().filter(|s| !is_network_scheme(s)) {
            out.push_str(scheme);
            out.push_str("://");
        }
        for segment in &self.segments {
            out.push('/');
            out.extend(encode_segment(segment));
        }
        if self.segments.is_empty() {
            out.push('/');
        }
        if !self.query.is_empty() {
            let mut pairs = self.query.clone();
            pairs.sort();
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            out.push('?');
            out.push_str(&encoded);
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.extend(utf8_percent_encode(fragment, SEGMENT));
        }
        out
    }
}

fn is_network_scheme(scheme: &str) -> bool {
    NETWORK_SCHEMES.contains(&scheme)
}

/// Percent-encode one decoded path component.
pub(crate) fn encode_segment(segment: &str) -> PercentEncode<'_> {
    utf8_percent_encode(segment, SEGMENT)
}

fn decode(input: &str, raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| RouterError::invalid_url(input, format!("invalid percent-encoding: {e}")))
}

/// Trait for matching parsed URLs against compiled routes.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the bound parameters if the URL matches.
    fn match_url(&self, url: &ParsedUrl) -> Option<Parameters>;
}

impl Matcher for RoutePattern {
    fn match_url(&self, url: &ParsedUrl) -> Option<Parameters> {
        let path = url.segments();
        let mut params = Parameters::new();

        for (key, value) in url.query() {
            params.insert(key.clone(), value.clone());
        }
        if let Some(fragment) = url.fragment() {
            params.insert(FRAGMENT_KEY, fragment);
        }

        let mut index = 0;
        for segment in self.segments() {
            match segment {
                Segment::Literal(literal) => {
                    if path.get(index)? != literal {
                        return None;
                    }
                    index += 1;
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), path.get(index)?.clone());
                    index += 1;
                }
                Segment::Wildcard => {
                    if index >= path.len() {
                        return None;
                    }
                    params.insert(WILDCARD_KEY, path[index..].join("/"));
                    index = path.len();
                }
            }
        }

        (index == path.len()).then_some(params)
    }
}

/// Match a pattern against raw input.
///
/// Unparseable input never matches.
pub fn match_path(pattern: &RoutePattern, url: &str) -> (Parameters, bool) {
    match ParsedUrl::parse(url)
        .ok()
        .and_then(|parsed| pattern.match_url(&parsed))
    {
        Some(params) => (params, true),
        None => (Parameters::new(), false),
    }
}
