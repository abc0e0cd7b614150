//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     template string
//!     → pattern.rs (compile into Literal / Param / Wildcard segments)
//!     → router.rs (insert into sorted route table)
//!
//! Lookup:
//!     URL string
//!     → matcher.rs (parse, decode, normalize)
//!     → router.rs (first matching entry in table order)
//!     → Return: (RouteEntry, Parameters) or RouteNotFound
//! ```
//!
//! # Design Decisions
//! - No regex: segment-by-segment comparison
//! - Deterministic: same table and input always select the same route
//! - Parameters are typed values (params.rs), coerced on demand

pub mod matcher;
pub mod params;
pub mod pattern;
pub mod router;

pub use matcher::{match_path, Matcher, ParsedUrl};
pub use params::{ParamValue, Parameters};
pub use pattern::{PatternError, RoutePattern, Segment};
pub use router::{ModuleLookup, RouteDefinition, RouteEntry, RouteKind, RouteRegistry};
