//! # Storage Module
//!
//! Document storage for HR Desk using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (a counter bump and the insert that consumes it commit together)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each document type owns one table keyed by its string id. Values are
//! postcard-encoded, so stored types avoid serde attributes that need a
//! self-describing format (`skip_serializing_if`, `flatten`, untagged enums).

mod redb_store;

pub use redb_store::{Document, ReadTx, Store, StoreCounts, WriteTx};
