use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use tq_types::Block;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{next_height, ChainStore, Tip};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// How long a writer waits on another process's lock before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_BLOCK: &str =
    "SELECT height, ts, prev_hash, hash, event_type, payload_json FROM blocks";

/// Durable chain store backed by a single SQLite file.
///
/// The database runs in WAL mode so readers in other processes never see a
/// half-written block, and every append runs inside a `BEGIN IMMEDIATE`
/// transaction that re-reads the tip before inserting.
///
/// File-backed stores keep a second connection for reads, so a long scan
/// never holds up an append from the same process.
pub struct SqliteChainStore {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteChainStore {
    /// Open or create a store at `path` and initialize its schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let writer = Self::connect(path, OpenFlags::SQLITE_OPEN_CREATE)?;
        let mut store = Self {
            writer: Mutex::new(writer),
            reader: None,
            path: Some(path.to_path_buf()),
        };
        store.initialize()?;
        // Opened after the schema so the reader starts out in WAL mode.
        store.reader = Some(Mutex::new(Self::connect(path, OpenFlags::empty())?));
        debug!(path = %path.display(), "opened sqlite chain store");
        Ok(store)
    }

    /// Create a private in-memory database, for tests. Reads and writes
    /// share its single connection.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            writer: Mutex::new(conn),
            reader: None,
            path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    fn connect(path: &Path, extra: OpenFlags) -> StoreResult<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX | extra,
        )?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Path of the database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn lock_reader(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        match &self.reader {
            Some(reader) => reader.lock().map_err(|_| StoreError::LockPoisoned),
            None => self.lock(),
        }
    }

    fn query_blocks(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<Block>> {
        let mut stmt = conn.prepare(sql)?;
        let blocks = stmt
            .query_map(params, row_to_block)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    fn query_one(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Option<Block>> {
        Ok(conn.query_row(sql, params, row_to_block).optional()?)
    }
}

fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        height: row.get::<_, i64>(0)? as u64,
        timestamp: row.get(1)?,
        prev_hash: text_lossy(row, 2)?,
        hash: text_lossy(row, 3)?,
        event_type: text_lossy(row, 4)?,
        payload_json: text_lossy(row, 5)?,
    })
}

/// Read a text column without failing on invalid UTF-8.
///
/// Everything the ledger hashes is ASCII, so a damaged column decodes to a
/// string containing U+FFFD that can never reproduce the hashed bytes.
fn text_lossy(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<String> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            format!("column {idx}"),
            other.data_type(),
        )),
    }
}

fn to_sql_height(height: u64) -> StoreResult<i64> {
    i64::try_from(height)
        .map_err(|_| StoreError::Serialization(format!("height {height} out of range")))
}

impl ChainStore for SqliteChainStore {
    fn initialize(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn tip(&self) -> StoreResult<Tip> {
        let conn = self.lock_reader()?;
        let tip = conn
            .query_row(
                "SELECT height, hash FROM blocks ORDER BY height DESC LIMIT 1",
                [],
                |row| {
                    Ok(Tip {
                        height: row.get::<_, i64>(0)? as u64,
                        hash: text_lossy(row, 1)?,
                    })
                },
            )
            .optional()?;
        tip.ok_or(StoreError::EmptyStore)
    }

    fn append_if_tip_matches(&self, expected_tip: Option<u64>, block: &Block) -> StoreResult<()> {
        let expected_height = next_height(expected_tip);
        if block.height != expected_height {
            return Err(StoreError::HeightMismatch {
                expected: expected_height,
                got: block.height,
            });
        }
        let height = to_sql_height(block.height)?;

        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front, so the tip read below
        // cannot go stale before the insert commits.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let actual: Option<i64> =
            tx.query_row("SELECT MAX(height) FROM blocks", [], |row| row.get(0))?;
        let actual = actual.map(|h| h as u64);
        if actual != expected_tip {
            return Err(StoreError::TipMoved {
                expected: expected_tip,
                actual,
            });
        }

        tx.execute(
            "INSERT INTO blocks (height, ts, prev_hash, hash, event_type, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                height,
                block.timestamp,
                block.prev_hash,
                block.hash,
                block.event_type,
                block.payload_json,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn scan_all(&self) -> StoreResult<Vec<Block>> {
        let conn = self.lock_reader()?;
        Self::query_blocks(&conn, &format!("{SELECT_BLOCK} ORDER BY height ASC"), [])
    }

    fn scan_by_event_type(&self, event_type: &str) -> StoreResult<Vec<Block>> {
        let conn = self.lock_reader()?;
        Self::query_blocks(
            &conn,
            &format!("{SELECT_BLOCK} WHERE event_type = ?1 ORDER BY height ASC"),
            params![event_type],
        )
    }

    fn scan_range(&self, from: u64, to: u64) -> StoreResult<Vec<Block>> {
        if from > to {
            return Ok(Vec::new());
        }
        let from = to_sql_height(from)?;
        let to = to_sql_height(to)?;
        let conn = self.lock_reader()?;
        Self::query_blocks(
            &conn,
            &format!("{SELECT_BLOCK} WHERE height BETWEEN ?1 AND ?2 ORDER BY height ASC"),
            params![from, to],
        )
    }

    fn get_by_height(&self, height: u64) -> StoreResult<Option<Block>> {
        let height = to_sql_height(height)?;
        let conn = self.lock_reader()?;
        Self::query_one(
            &conn,
            &format!("{SELECT_BLOCK} WHERE height = ?1"),
            params![height],
        )
    }

    fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Block>> {
        let conn = self.lock_reader()?;
        Self::query_one(
            &conn,
            &format!("{SELECT_BLOCK} WHERE hash = ?1 ORDER BY height ASC LIMIT 1"),
            params![hash],
        )
    }

    fn block_count(&self) -> StoreResult<u64> {
        let conn = self.lock_reader()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl std::fmt::Debug for SqliteChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteChainStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
