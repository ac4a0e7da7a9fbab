//! Index subsystem for seeddb
//!
//! Indexes are derived, in-memory state. Their declarations are persisted
//! with the database; their contents are rebuilt from documents on open.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror documents, never the source of truth
//! - Declarative creation: re-declaring an identical index is a no-op
//! - Incremental maintenance: each write updates only what it touched
//! - Deterministic: BTreeMap iteration order, ties broken by ascending id
//!
//! # Invariants
//!
//! - Index names are unique per store
//! - Index updates run inside the writer's critical section, so no reader
//!   sees an index out of step with the documents

mod btree;
mod descriptor;
mod errors;
pub mod fulltext;
mod manager;
mod predicate;

pub use btree::{composite_key, CompositeKey, IndexKey, ValueIndex};
pub use descriptor::{IndexDescriptor, IndexKind, IndexOptions};
pub use errors::{IndexError, IndexResult};
pub use fulltext::{FullTextIndex, FullTextMatches};
pub use manager::{IndexHit, IndexManager};
pub use predicate::Predicate;
