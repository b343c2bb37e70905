use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::LedgerError;
use crate::models::{Collection, FinancialRecord, PendingOperation};

/// Durable FIFO of write intents that could not reach the remote backend.
///
/// Draining is non-destructive: an entry leaves the queue only through
/// [`PendingQueue::remove`] after its replay was confirmed, which is what
/// gives replays their at-least-once guarantee.
pub struct PendingQueue {
    conn: Connection,
}

impl PendingQueue {
    /// Open the queue at the given path and initialize tables if needed
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS pending_ops (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                record TEXT NOT NULL,
                enqueued_at TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Append a write intent for later replay.
    pub fn enqueue(
        &self,
        collection: Collection,
        record: &FinancialRecord,
    ) -> Result<(), LedgerError> {
        self.conn.execute(
            "INSERT INTO pending_ops (collection, record, enqueued_at) VALUES (?1, ?2, ?3)",
            params![
                collection.as_str(),
                serde_json::to_string(record)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Snapshot of every queued operation, oldest first.
    pub fn drain_in_order(&self) -> Result<Vec<PendingOperation>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, collection, record, enqueued_at FROM pending_ops ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut ops = Vec::new();
        for row in rows {
            let (seq, collection, record, enqueued_at) = row?;
            let collection = Collection::parse(&collection).ok_or_else(|| {
                LedgerError::Corrupt(format!("queued op {} collection '{}'", seq, collection))
            })?;
            let record: FinancialRecord = serde_json::from_str(&record)?;
            let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_at)
                .map_err(|e| {
                    LedgerError::Corrupt(format!(
                        "queued op {} timestamp '{}': {}",
                        seq, enqueued_at, e
                    ))
                })?
                .with_timezone(&Utc);
            ops.push(PendingOperation {
                seq,
                collection,
                record,
                enqueued_at,
            });
        }
        Ok(ops)
    }

    /// Drop an operation after its replay was confirmed.
    pub fn remove(&self, op: &PendingOperation) -> Result<(), LedgerError> {
        self.conn
            .execute("DELETE FROM pending_ops WHERE seq = ?1", params![op.seq])?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pending_ops", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}
