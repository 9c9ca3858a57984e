//! Service layer for the RadSafe backend.
//! - `storage`: the flat-file record store and its document model.
//! - `accounts`: registration/login over the `users` collection.
//! - `sensors`: simulated radiation and proximity readings.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod accounts;
pub mod sensors;
