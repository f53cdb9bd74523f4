//! redb-backed document store.

use crate::account::ResetTicket;
use crate::attendance::AttendanceRecord;
use crate::directory::User;
use crate::events::Event;
use crate::leave::Leave;
use crate::org::{Department, Position};
use crate::{HrError, HrResult};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Email (normalized) -> user id.
const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");

/// Sequence name -> last issued value.
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

// =============================================================================
// DOCUMENT TRAIT
// =============================================================================

/// A value stored one-per-key in its own table.
pub trait Document: Serialize + DeserializeOwned {
    /// Human-readable kind, used in NotFound errors.
    const KIND: &'static str;

    /// Backing table.
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]>;

    /// Primary key of this document.
    fn key(&self) -> &str;
}

fn decode<D: Document>(bytes: &[u8]) -> HrResult<D> {
    Ok(postcard::from_bytes(bytes)?)
}

fn fetch<D: Document>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> HrResult<Option<D>> {
    match table.get(key)? {
        Some(guard) => decode(guard.value()).map(Some),
        None => Ok(None),
    }
}

fn fetch_all<D: Document>(table: &impl ReadableTable<&'static str, &'static [u8]>) -> HrResult<Vec<D>> {
    let mut docs = Vec::new();
    for entry in table.iter()? {
        let (_key, value) = entry?;
        docs.push(decode(value.value())?);
    }
    Ok(docs)
}

// =============================================================================
// STORE
// =============================================================================

/// Handle to the HR Desk database file.
///
/// Cheap to clone; all clones share one redb `Database`.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open (or create) the database at `path` and make sure every table exists.
    pub fn open(path: impl AsRef<Path>) -> HrResult<Self> {
        let db = Database::create(path.as_ref())?;
        let store = Self { db: Arc::new(db) };
        store.write(|tx| tx.ensure_tables())?;
        Ok(store)
    }

    /// Run `f` inside a read transaction.
    pub fn read<T>(&self, f: impl FnOnce(&ReadTx) -> HrResult<T>) -> HrResult<T> {
        let tx = ReadTx {
            txn: self.db.begin_read()?,
        };
        f(&tx)
    }

    /// Run `f` inside a write transaction.
    ///
    /// Commits when `f` returns `Ok`, aborts when it returns `Err`.
    pub fn write<T>(&self, f: impl FnOnce(&WriteTx) -> HrResult<T>) -> HrResult<T> {
        let tx = WriteTx {
            txn: self.db.begin_write()?,
        };
        match f(&tx) {
            Ok(value) => {
                tx.txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.txn.abort()?;
                Err(err)
            }
        }
    }

    /// Fetch one document by key.
    pub fn get<D: Document>(&self, key: &str) -> HrResult<Option<D>> {
        self.read(|tx| tx.get(key))
    }

    /// Fetch one document by key, failing with NotFound when absent.
    pub fn require<D: Document>(&self, key: &str) -> HrResult<D> {
        self.read(|tx| tx.require(key))
    }

    /// Every document of one type, in key order.
    pub fn all<D: Document>(&self) -> HrResult<Vec<D>> {
        self.read(|tx| tx.all())
    }

    /// Document counts per table.
    pub fn counts(&self) -> HrResult<StoreCounts> {
        self.read(|tx| {
            Ok(StoreCounts {
                users: tx.len::<User>()?,
                departments: tx.len::<Department>()?,
                positions: tx.len::<Position>()?,
                events: tx.len::<Event>()?,
                leaves: tx.len::<Leave>()?,
                attendance: tx.len::<AttendanceRecord>()?,
            })
        })
    }
}

/// Number of documents per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub users: u64,
    pub departments: u64,
    pub positions: u64,
    pub events: u64,
    pub leaves: u64,
    pub attendance: u64,
}

// =============================================================================
// READ TRANSACTION
// =============================================================================

/// Consistent read-only snapshot.
pub struct ReadTx {
    txn: ReadTransaction,
}

impl ReadTx {
    pub fn get<D: Document>(&self, key: &str) -> HrResult<Option<D>> {
        let table = self.txn.open_table(D::TABLE)?;
        fetch(&table, key)
    }

    pub fn require<D: Document>(&self, key: &str) -> HrResult<D> {
        self.get(key)?.ok_or_else(|| HrError::not_found(D::KIND, key))
    }

    pub fn all<D: Document>(&self) -> HrResult<Vec<D>> {
        let table = self.txn.open_table(D::TABLE)?;
        fetch_all(&table)
    }

    /// User id registered for a normalized email.
    pub fn user_id_by_email(&self, email: &str) -> HrResult<Option<String>> {
        let table = self.txn.open_table(USER_EMAILS)?;
        Ok(table.get(email)?.map(|guard| guard.value().to_string()))
    }

    fn len<D: Document>(&self) -> HrResult<u64> {
        let table = self.txn.open_table(D::TABLE)?;
        Ok(table.len()?)
    }
}

// =============================================================================
// WRITE TRANSACTION
// =============================================================================

/// Single writer transaction. Reads see the transaction's own writes.
pub struct WriteTx {
    txn: WriteTransaction,
}

impl WriteTx {
    fn ensure_tables(&self) -> HrResult<()> {
        self.txn.open_table(User::TABLE)?;
        self.txn.open_table(Department::TABLE)?;
        self.txn.open_table(Position::TABLE)?;
        self.txn.open_table(Event::TABLE)?;
        self.txn.open_table(Leave::TABLE)?;
        self.txn.open_table(AttendanceRecord::TABLE)?;
        self.txn.open_table(ResetTicket::TABLE)?;
        self.txn.open_table(USER_EMAILS)?;
        self.txn.open_table(COUNTERS)?;
        Ok(())
    }

    pub fn get<D: Document>(&self, key: &str) -> HrResult<Option<D>> {
        let table = self.txn.open_table(D::TABLE)?;
        fetch(&table, key)
    }

    pub fn require<D: Document>(&self, key: &str) -> HrResult<D> {
        self.get(key)?.ok_or_else(|| HrError::not_found(D::KIND, key))
    }

    pub fn all<D: Document>(&self) -> HrResult<Vec<D>> {
        let table = self.txn.open_table(D::TABLE)?;
        fetch_all(&table)
    }

    /// Insert or replace a document under its own key.
    pub fn put<D: Document>(&self, doc: &D) -> HrResult<()> {
        let bytes = postcard::to_allocvec(doc)?;
        let mut table = self.txn.open_table(D::TABLE)?;
        table.insert(doc.key(), bytes.as_slice())?;
        Ok(())
    }

    /// Remove a document. Returns whether it existed.
    pub fn delete<D: Document>(&self, key: &str) -> HrResult<bool> {
        let mut table = self.txn.open_table(D::TABLE)?;
        let removed = table.remove(key)?.is_some();
        Ok(removed)
    }

    pub fn user_id_by_email(&self, email: &str) -> HrResult<Option<String>> {
        let table = self.txn.open_table(USER_EMAILS)?;
        let id = table.get(email)?.map(|guard| guard.value().to_string());
        Ok(id)
    }

    pub fn index_email(&self, email: &str, user_id: &str) -> HrResult<()> {
        let mut table = self.txn.open_table(USER_EMAILS)?;
        table.insert(email, user_id)?;
        Ok(())
    }

    pub fn unindex_email(&self, email: &str) -> HrResult<()> {
        let mut table = self.txn.open_table(USER_EMAILS)?;
        table.remove(email)?;
        Ok(())
    }

    /// Increment a named counter and return the new value (first call yields 1).
    pub fn bump_counter(&self, name: &str) -> HrResult<u64> {
        let mut table = self.txn.open_table(COUNTERS)?;
        let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current.saturating_add(1);
        table.insert(name, next)?;
        Ok(next)
    }
}

// =============================================================================
// TESTS
// =============================================================================
