use uuid::Uuid;

use crate::error::{LedgerError, RemoteError};
use crate::models::{
    AllocationTotals, Collection, ConnectivityStatus, FinancialRecord, Outcome, ReplayReport,
};
use crate::monitor::ConnectivityMonitor;
use crate::queue::PendingQueue;
use crate::remote::{PushReceipt, RemoteBackend};
use crate::report::compute_totals;
use crate::store::RecordStore;

/// Orchestrates writes across the local store, the pending queue and the
/// remote backend.
///
/// A submission never fails because of connectivity alone: remote failures
/// degrade to a local write plus a queued replay, and only validation and
/// local storage failures reach the caller.
pub struct SyncEngine<B> {
    store: RecordStore,
    queue: PendingQueue,
    monitor: ConnectivityMonitor,
    backend: Option<B>,
}

impl<B: RemoteBackend> SyncEngine<B> {
    /// `backend: None` runs the engine in local-only mode: records are kept
    /// in the store and nothing is ever queued for replay.
    pub fn new(
        store: RecordStore,
        queue: PendingQueue,
        monitor: ConnectivityMonitor,
        backend: Option<B>,
    ) -> Self {
        Self {
            store,
            queue,
            monitor,
            backend,
        }
    }

    /// Submit a record to the given collection.
    ///
    /// Uses the cached connectivity status; probing stays a separate,
    /// explicit step so a submission never pays for an extra round-trip.
    pub async fn submit(
        &mut self,
        collection: Collection,
        record: FinancialRecord,
    ) -> Result<Outcome, LedgerError> {
        if let Err(e) = record.validate() {
            return Ok(Outcome::Rejected(e));
        }

        if self.monitor.current_status() == ConnectivityStatus::Online {
            if let Some(backend) = &self.backend {
                match push_with_retry(backend, collection, &record).await {
                    Ok(_) => {
                        self.store.append(collection, &record)?;
                        return Ok(Outcome::AcceptedRemote);
                    }
                    Err(e) => {
                        tracing::warn!("Remote write failed, keeping record locally: {}", e);
                    }
                }
            }
        }

        self.store.append(collection, &record)?;
        if self.backend.is_some() {
            self.queue.enqueue(collection, &record)?;
        }
        Ok(Outcome::AcceptedLocal)
    }

    /// Replay queued writes in FIFO order, removing each entry only after
    /// the remote confirmed it. Stops at the first failure so later entries
    /// never overtake an unresolved earlier one.
    pub async fn reconcile(&mut self) -> Result<ReplayReport, LedgerError> {
        let Some(backend) = &self.backend else {
            return Ok(ReplayReport::default());
        };

        let mut report = ReplayReport::default();
        for op in self.queue.drain_in_order()? {
            match push_with_retry(backend, op.collection, &op.record).await {
                Ok(_) => {
                    self.queue.remove(&op)?;
                    report.replayed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Replay stopped at record {} in {}: {}",
                        op.record.id,
                        op.collection,
                        e
                    );
                    report.failed += 1;
                    break;
                }
            }
        }

        if report.replayed > 0 {
            tracing::info!("Replayed {} pending operation(s)", report.replayed);
        }
        Ok(report)
    }

    /// Delete a record. The local removal always happens; a remote delete
    /// is attempted only while online and is never queued for retry.
    pub async fn delete(
        &mut self,
        collection: Collection,
        id: Uuid,
    ) -> Result<Outcome, LedgerError> {
        let removed = self.store.remove(collection, id)?;
        if !removed {
            tracing::debug!("Delete for unknown record {} in {}", id, collection);
        }

        if self.monitor.current_status() == ConnectivityStatus::Online {
            if let Some(backend) = &self.backend {
                match backend.delete(collection, id).await {
                    Ok(()) => return Ok(Outcome::AcceptedRemote),
                    Err(e) => {
                        tracing::warn!("Remote delete failed, not retrying: {}", e);
                    }
                }
            }
        }
        Ok(Outcome::AcceptedLocal)
    }

    /// Merge remote records into the local store. Local records are
    /// authoritative: only ids unknown locally are inserted. Returns the
    /// number of inserted records.
    pub async fn pull(&mut self, collection: Collection) -> Result<usize, LedgerError> {
        let Some(backend) = &self.backend else {
            return Ok(0);
        };

        let remote = match backend.fetch(collection).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Pull from remote failed: {}", e);
                return Ok(0);
            }
        };

        let mut inserted = 0;
        for record in remote {
            if self.store.contains(collection, record.id)? {
                continue;
            }
            if let Err(e) = record.validate() {
                tracing::warn!("Skipping invalid remote record {}: {}", record.id, e);
                continue;
            }
            self.store.append(collection, &record)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Probe the remote endpoint and update the cached status.
    pub async fn probe(&mut self) -> ConnectivityStatus {
        self.monitor.probe().await
    }

    /// Cached connectivity status.
    pub fn connectivity(&self) -> ConnectivityStatus {
        self.monitor.current_status()
    }

    /// All records of a collection in insertion order.
    pub fn list(&self, collection: Collection) -> Result<Vec<FinancialRecord>, LedgerError> {
        self.store.list(collection)
    }

    /// Allocation totals over the current store contents.
    pub fn totals(&self) -> Result<AllocationTotals, LedgerError> {
        Ok(compute_totals(
            &self.store.list(Collection::Inflows)?,
            &self.store.list(Collection::Outflows)?,
        ))
    }

    /// Number of writes still waiting for a replay.
    pub fn pending(&self) -> Result<usize, LedgerError> {
        self.queue.len()
    }

    pub fn remote_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Remove every record from both collections. The pending queue is left
    /// untouched.
    pub fn clear(&mut self) -> Result<(), LedgerError> {
        self.store.clear()
    }
}

/// One attempt plus one retry on a transient failure; backend rejections
/// are not retried.
async fn push_with_retry<B: RemoteBackend>(
    backend: &B,
    collection: Collection,
    record: &FinancialRecord,
) -> Result<PushReceipt, RemoteError> {
    match backend.push(collection, record).await {
        Err(e) if e.is_transient() => {
            tracing::debug!("Transient remote failure, retrying once: {}", e);
            backend.push(collection, record).await
        }
        other => other,
    }
}
