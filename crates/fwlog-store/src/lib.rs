//! Log store trait with in-memory and SQLite implementations.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use fwlog_types::{LogPage, LogQuery, LogRecord, LogStore, StoreError, StoredLog};
pub use memory::InMemoryLogStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLogStore;
