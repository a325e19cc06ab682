//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_store;
mod postgres_access_store;
pub mod record_codec;

pub use in_memory_access_store::InMemoryAccessStore;
pub use postgres_access_store::PostgresAccessStore;
