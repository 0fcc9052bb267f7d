//! Storage backends for treeload.
//!
//! [`SqliteSink`] persists file records and deployment records through
//! `sqlx`. One `insert_batch` call maps to exactly one transaction.

pub mod error;
mod schema;
pub mod sqlite;

pub use error::DbError;
pub use sqlite::{SqliteSink, CHUNK_SIZE};
