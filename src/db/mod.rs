//! Database module: schema lifecycle, classified errors and SQL repositories.
//!
//! - `schema`: table catalogue, non-destructive apply and destructive drop.
//! - `repo`: pool lifecycle plus read/write functions per table.
//! - `error`: [`StoreError`], what every repository call returns on failure.
//!
//! External modules should import from `pprogramist_db::db`; the repository
//! API is re-exported here.

pub mod error;
pub mod repo;
pub mod schema;

pub use error::{StoreError, StoreResult};
pub use repo::*;
