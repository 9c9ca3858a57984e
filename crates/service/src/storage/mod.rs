//! Storage layer
//!
//! The persisted `Document`, its `Record`s, the backends that hold it, and the
//! `RecordStore` that runs load-modify-save cycles over them.

pub mod backend;
pub mod document;
pub mod record;
pub mod record_store;

pub use backend::{DocumentStorage, JsonFileStorage, MemoryStorage};
pub use document::{next_id, Collection, Document, PASSWORD, USER_ID};
pub use record::Record;
pub use record_store::{timestamp, RecordStore};
