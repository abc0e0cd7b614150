//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Navigation:
//!     → timeouts.rs (deadline for the whole navigation)
//!     → Interceptor chain
//!         → timeouts.rs (deadline per asynchronous interceptor)
//! ```
//!
//! # Design Decisions
//! - Every asynchronous step can be given a deadline
//! - The core never retries; callers layer retry policies on `RouterError`

pub mod timeouts;
