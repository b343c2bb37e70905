use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{Collection, FinancialRecord};

/// Durable store for the two record collections.
///
/// Records are appended one at a time; there is no multi-record atomicity
/// and none is needed. Insertion order is the rowid order.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open the store at the given path and initialize tables if needed
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                id TEXT NOT NULL,
                collection TEXT NOT NULL,
                kind TEXT NOT NULL,
                amount TEXT NOT NULL,
                description TEXT NOT NULL,
                occurred_on TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                recorded_by TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );",
        )?;
        Ok(Self { conn })
    }

    /// Append a record to a collection. Fails before any write if the
    /// record invariants do not hold.
    pub fn append(
        &self,
        collection: Collection,
        record: &FinancialRecord,
    ) -> Result<(), LedgerError> {
        record.validate()?;
        self.conn.execute(
            "INSERT INTO records (id, collection, kind, amount, description, occurred_on, recorded_at, recorded_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                collection.as_str(),
                record.kind,
                record.amount.to_string(),
                record.description,
                record.occurred_on.to_string(),
                record.recorded_at.to_rfc3339(),
                record.recorded_by,
            ],
        )?;
        Ok(())
    }

    /// Remove a record by id. Returns whether anything was removed.
    pub fn remove(&self, collection: Collection, id: Uuid) -> Result<bool, LedgerError> {
        let changed = self.conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// All records of a collection in insertion order.
    pub fn list(&self, collection: Collection) -> Result<Vec<FinancialRecord>, LedgerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, amount, description, occurred_on, recorded_at, recorded_by
             FROM records WHERE collection = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![collection.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(parse_record(row?)?);
        }
        Ok(records)
    }

    pub fn contains(&self, collection: Collection, id: Uuid) -> Result<bool, LedgerError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Remove every record from both collections.
    pub fn clear(&self) -> Result<(), LedgerError> {
        self.conn.execute("DELETE FROM records", [])?;
        Ok(())
    }
}

type RecordRow = (String, String, String, String, String, String, String);

fn parse_record(row: RecordRow) -> Result<FinancialRecord, LedgerError> {
    let (id, kind, amount, description, occurred_on, recorded_at, recorded_by) = row;
    let id = Uuid::from_str(&id)
        .map_err(|e| LedgerError::Corrupt(format!("record id '{}': {}", id, e)))?;
    let amount = Decimal::from_str(&amount)
        .map_err(|e| LedgerError::Corrupt(format!("record {} amount '{}': {}", id, amount, e)))?;
    let occurred_on = NaiveDate::from_str(&occurred_on)
        .map_err(|e| LedgerError::Corrupt(format!("record {} date '{}': {}", id, occurred_on, e)))?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
        .map_err(|e| {
            LedgerError::Corrupt(format!("record {} timestamp '{}': {}", id, recorded_at, e))
        })?
        .with_timezone(&Utc);

    Ok(FinancialRecord {
        id,
        kind,
        amount,
        description,
        occurred_on,
        recorded_at,
        recorded_by,
    })
}
