//! Documents and the document store
//!
//! # Invariants
//!
//! - Ids are unique within a store
//! - A stored document's revision changes on every successful write
//! - A write based on a stale revision is rejected and changes nothing
//! - Indexes never lag behind the documents visible to readers

mod errors;
mod results;
mod store;
mod types;

pub use errors::ConflictError;
pub use results::{QueryHit, QueryResults};
pub use store::{DocumentStore, Snapshot};
pub use types::{lookup_path, Document, Revision};
