//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build router → Register routes → Spawn reaper
//!
//! Shutdown (shutdown.rs):
//!     trigger() → background tasks leave their loops → wait_for_tasks()
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
