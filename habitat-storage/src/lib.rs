//! Entity store adapter for Habitat.
//!
//! The only boundary between the hierarchy core and a database:
//! - [`EntityStore`]: async CRUD and live queries for one entity type
//! - [`Query`]: collection plus simple field filters
//! - [`Subscription`]: cancelable stream of full [`Snapshot`]s, terminal on error
//! - [`DocumentStore`]: generic store over a blocking [`DocumentBackend`]
//!   ([`MemoryBackend`], or DuckDB behind the `duckdb` feature)
//! - [`mock::ScriptedStore`]: test double with hand-driven subscriptions

mod adapter;
mod backend;
mod document_store;
#[cfg(feature = "duckdb")]
mod duckdb_backend;
mod error;
pub mod mock;
mod query;
mod subscription;

pub use adapter::{EntityStore, HierarchyStore};
pub use backend::{DocumentBackend, MemoryBackend};
pub use document_store::{DocumentStore, DocumentStoreConfig, MemoryStore};
#[cfg(feature = "duckdb")]
pub use duckdb_backend::{open_duckdb_with_wal_recovery, DuckDbBackend};
pub use error::{StoreError, StoreResult};
pub use query::{Filter, Query};
pub use subscription::{CancelToken, Snapshot, SnapshotResult, SnapshotSink, Subscription};
