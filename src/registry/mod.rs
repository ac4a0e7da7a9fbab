//! Database handle registry
//!
//! Maps a database name to its single open store and hands out
//! reference-counted handles to it.
//!
//! # Invariants
//!
//! - At most one open store per name per registry
//! - A store is opened by the first acquire and closed by the last release
//! - Acquire and release are serialized by one registry-wide lock, so two
//!   callers never both seed or open the same name
//! - A seed is copied only when the database does not exist yet

mod handle;
mod handle_registry;

pub use handle::Handle;
pub use handle_registry::{AcquireOptions, DatabaseHandleRegistry};
