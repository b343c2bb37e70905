use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ValidationError;

/// Name stamped into records when nobody is logged in.
pub const ANONYMOUS_USER: &str = "anonymous";

/// The two record collections of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "entradas")]
    Inflows,
    #[serde(rename = "saidas")]
    Outflows,
}

impl Collection {
    /// Stable storage name, kept from the original data layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Inflows => "entradas",
            Collection::Outflows => "saidas",
        }
    }

    /// Spreadsheet tab this collection mirrors to.
    pub fn sheet_tab(&self) -> &'static str {
        match self {
            Collection::Inflows => "Entradas",
            Collection::Outflows => "Saidas",
        }
    }

    pub fn parse(name: &str) -> Option<Collection> {
        match name {
            "entradas" | "inflows" | "in" => Some(Collection::Inflows),
            "saidas" | "outflows" | "out" => Some(Collection::Outflows),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inflow classification recognized by the allocation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InflowKind {
    TitheOffering,
    Communion,
    Construction,
}

impl InflowKind {
    pub fn parse(kind: &str) -> Option<InflowKind> {
        match kind {
            "tithe-offering" => Some(InflowKind::TitheOffering),
            "communion" => Some(InflowKind::Communion),
            "construction" => Some(InflowKind::Construction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InflowKind::TitheOffering => "tithe-offering",
            InflowKind::Communion => "communion",
            InflowKind::Construction => "construction",
        }
    }
}

/// A single monetary event. Whether it is an inflow or an outflow is
/// decided by the collection it is submitted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Assigned at creation, immutable afterwards.
    pub id: Uuid,

    /// Inflow kind token, or a free-form category for outflows.
    pub kind: String,

    pub amount: Decimal,

    pub description: String,

    /// The date the transaction represents, not when it was recorded.
    pub occurred_on: NaiveDate,

    /// When the record entered the system.
    pub recorded_at: DateTime<Utc>,

    /// Acting user, or [`ANONYMOUS_USER`].
    pub recorded_by: String,
}

impl FinancialRecord {
    pub fn new(
        kind: &str,
        amount: Decimal,
        description: &str,
        occurred_on: NaiveDate,
        recorded_by: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            amount,
            description: description.to_string(),
            occurred_on,
            recorded_at: Utc::now(),
            recorded_by: recorded_by.to_string(),
        }
    }

    /// Check the record invariants without touching storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::BlankDescription);
        }
        if self.kind.trim().is_empty() {
            return Err(ValidationError::BlankKind);
        }
        Ok(())
    }
}

/// A write that has not reached the remote backend yet. Owned by the
/// pending queue until its replay is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// Queue sequence number; drain order follows it.
    pub seq: i64,
    pub collection: Collection,
    pub record: FinancialRecord,
    pub enqueued_at: DateTime<Utc>,
}

/// Reachability of the configured remote endpoint. Re-derived on each
/// probe, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Connecting,
    Online,
    Offline,
}

/// Result of a submit or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Written locally and confirmed by the remote backend.
    AcceptedRemote,
    /// Written locally only; a replay is queued when a remote is configured.
    AcceptedLocal,
    /// Invariants violated; nothing was written anywhere.
    Rejected(ValidationError),
}

/// Tally of one reconcile pass over the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub replayed: usize,
    pub failed: usize,
}

/// Derived allocation buckets. Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllocationTotals {
    pub central_fund: Decimal,
    pub local_fund: Decimal,
    pub missions_fund: Decimal,
    pub construction_fund: Decimal,
}
