use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use caixa_core::error::RemoteError;
use caixa_core::models::{Collection, ConnectivityStatus, FinancialRecord, Outcome};
use caixa_core::monitor::ConnectivityMonitor;
use caixa_core::queue::PendingQueue;
use caixa_core::remote::{PushReceipt, RemoteBackend};
use caixa_core::store::RecordStore;
use caixa_core::sync::SyncEngine;

/// Remote double. Every push consumes the next scripted result (defaulting
/// to success); calls are recorded for assertions.
#[derive(Clone, Default)]
struct MockBackend {
    inner: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    push_script: Mutex<VecDeque<Result<(), RemoteError>>>,
    delete_script: Mutex<VecDeque<Result<(), RemoteError>>>,
    fetch_result: Mutex<Vec<FinancialRecord>>,
    pushed: Mutex<Vec<(Collection, Uuid)>>,
    deleted: Mutex<Vec<(Collection, Uuid)>>,
    push_attempts: Mutex<usize>,
}

impl MockBackend {
    fn fail_next_push(&self, err: RemoteError) {
        self.inner.push_script.lock().unwrap().push_back(Err(err));
    }

    fn pass_next_push(&self) {
        self.inner.push_script.lock().unwrap().push_back(Ok(()));
    }

    fn fail_next_delete(&self, err: RemoteError) {
        self.inner.delete_script.lock().unwrap().push_back(Err(err));
    }

    fn set_fetch_result(&self, records: Vec<FinancialRecord>) {
        *self.inner.fetch_result.lock().unwrap() = records;
    }

    fn pushed_ids(&self) -> Vec<Uuid> {
        self.inner
            .pushed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| *id)
            .collect()
    }

    fn deleted_calls(&self) -> usize {
        self.inner.deleted.lock().unwrap().len()
    }

    fn push_attempts(&self) -> usize {
        *self.inner.push_attempts.lock().unwrap()
    }
}

#[async_trait]
impl RemoteBackend for MockBackend {
    async fn push(
        &self,
        collection: Collection,
        record: &FinancialRecord,
    ) -> Result<PushReceipt, RemoteError> {
        *self.inner.push_attempts.lock().unwrap() += 1;
        let scripted = self
            .inner
            .push_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        scripted?;
        self.inner
            .pushed
            .lock()
            .unwrap()
            .push((collection, record.id));
        Ok(PushReceipt::default())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), RemoteError> {
        let scripted = self
            .inner
            .delete_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        scripted?;
        self.inner.deleted.lock().unwrap().push((collection, id));
        Ok(())
    }

    async fn fetch(&self, _collection: Collection) -> Result<Vec<FinancialRecord>, RemoteError> {
        Ok(self.inner.fetch_result.lock().unwrap().clone())
    }
}

struct Harness {
    _dir: TempDir,
    engine: SyncEngine<MockBackend>,
    backend: MockBackend,
    // Kept alive so the probe endpoint stays reachable
    _server: Option<(mockito::ServerGuard, mockito::Mock)>,
}

/// Engine wired to a reachable probe endpoint; `probe()` lands online.
async fn online_harness() -> Harness {
    let mut server = mockito::Server::new_async().await;
    let probe_mock = server
        .mock("GET", "/")
        .with_status(200)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(&dir.path().join("ledger.db")).unwrap();
    let queue = PendingQueue::open(&dir.path().join("ledger.db")).unwrap();
    let monitor = ConnectivityMonitor::new(Some(server.url()), Duration::from_secs(2));
    let backend = MockBackend::default();

    let mut engine = SyncEngine::new(store, queue, monitor, Some(backend.clone()));
    assert_eq!(engine.probe().await, ConnectivityStatus::Online);

    Harness {
        _dir: dir,
        engine,
        backend,
        _server: Some((server, probe_mock)),
    }
}

/// Engine with no reachable endpoint; the cached status is offline.
async fn offline_harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(&dir.path().join("ledger.db")).unwrap();
    let queue = PendingQueue::open(&dir.path().join("ledger.db")).unwrap();
    let monitor = ConnectivityMonitor::new(None, Duration::from_secs(1));
    let backend = MockBackend::default();

    let mut engine = SyncEngine::new(store, queue, monitor, Some(backend.clone()));
    assert_eq!(engine.probe().await, ConnectivityStatus::Offline);

    Harness {
        _dir: dir,
        engine,
        backend,
        _server: None,
    }
}

fn inflow(description: &str, amount: Decimal) -> FinancialRecord {
    FinancialRecord::new(
        "tithe-offering",
        amount,
        description,
        NaiveDate::from_ymd_opt(2024, 7, 7).unwrap(),
        "tester",
    )
}

#[tokio::test]
async fn submit_online_lands_in_store_and_remote_exactly_once() {
    let mut h = online_harness().await;
    let record = inflow("sunday offering", dec!(100));

    let outcome = h
        .engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedRemote);

    let listed = h.engine.list(Collection::Inflows).unwrap();
    assert_eq!(listed, vec![record.clone()]);
    assert_eq!(h.backend.pushed_ids(), vec![record.id]);
    assert_eq!(h.engine.pending().unwrap(), 0);
}

#[tokio::test]
async fn invalid_submissions_touch_nothing() {
    let mut h = online_harness().await;

    let zero = inflow("no money", dec!(0));
    let outcome = h.engine.submit(Collection::Inflows, zero).await.unwrap();
    assert!(matches!(outcome, Outcome::Rejected(_)));

    let mut blank = inflow("x", dec!(10));
    blank.description = "  ".to_string();
    let outcome = h.engine.submit(Collection::Inflows, blank).await.unwrap();
    assert!(matches!(outcome, Outcome::Rejected(_)));

    assert!(h.engine.list(Collection::Inflows).unwrap().is_empty());
    assert_eq!(h.engine.pending().unwrap(), 0);
    assert!(h.backend.pushed_ids().is_empty());
}

#[tokio::test]
async fn remote_failure_degrades_to_local_with_queued_replay() {
    let mut h = online_harness().await;
    h.backend
        .fail_next_push(RemoteError::Backend("quota exceeded".to_string()));

    let record = inflow("degraded", dec!(40));
    let outcome = h
        .engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedLocal);

    assert_eq!(h.engine.list(Collection::Inflows).unwrap(), vec![record]);
    assert_eq!(h.engine.pending().unwrap(), 1);
}

#[tokio::test]
async fn transient_failure_is_retried_once_before_queueing() {
    let mut h = online_harness().await;

    // First attempt times out, the retry succeeds
    h.backend.fail_next_push(RemoteError::Timeout);
    let outcome = h
        .engine
        .submit(Collection::Inflows, inflow("retried", dec!(15)))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedRemote);
    assert_eq!(h.backend.push_attempts(), 2);

    // Two transient failures exhaust the bounded retry and queue the write
    h.backend.fail_next_push(RemoteError::Timeout);
    h.backend.fail_next_push(RemoteError::Timeout);
    let outcome = h
        .engine
        .submit(Collection::Inflows, inflow("gave up", dec!(15)))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedLocal);
    assert_eq!(h.engine.pending().unwrap(), 1);
}

#[tokio::test]
async fn offline_submission_is_accepted_locally() {
    let mut h = offline_harness().await;
    let record = inflow("offline", dec!(25));

    let outcome = h
        .engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedLocal);
    assert_eq!(h.engine.list(Collection::Inflows).unwrap(), vec![record]);
    assert_eq!(h.engine.pending().unwrap(), 1);
    assert!(h.backend.pushed_ids().is_empty());
}

#[tokio::test]
async fn reconcile_on_empty_queue_is_a_noop_twice() {
    let mut h = online_harness().await;

    let report = h.engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (0, 0));
    let report = h.engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (0, 0));
}

#[tokio::test]
async fn reconcile_replays_in_submission_order() {
    let mut h = offline_harness().await;

    let r1 = inflow("first", dec!(1));
    let r2 = inflow("second", dec!(2));
    let r3 = inflow("third", dec!(3));
    for record in [&r1, &r2, &r3] {
        let outcome = h
            .engine
            .submit(Collection::Inflows, (*record).clone())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::AcceptedLocal);
    }

    let report = h.engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (3, 0));
    assert_eq!(h.backend.pushed_ids(), vec![r1.id, r2.id, r3.id]);
    assert_eq!(h.engine.pending().unwrap(), 0);
}

#[tokio::test]
async fn reconcile_preserves_queue_order_past_the_first_failure() {
    let mut h = offline_harness().await;

    let r1 = inflow("first", dec!(1));
    let r2 = inflow("second", dec!(2));
    let r3 = inflow("third", dec!(3));
    for record in [&r1, &r2, &r3] {
        h.engine
            .submit(Collection::Inflows, (*record).clone())
            .await
            .unwrap();
    }

    // R1 goes through, R2 is rejected by the backend
    h.backend.pass_next_push();
    h.backend
        .fail_next_push(RemoteError::Backend("bad row".to_string()));

    let report = h.engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (1, 1));
    assert_eq!(h.backend.pushed_ids(), vec![r1.id]);

    // R2 and R3 stay queued in their original order
    let queue = PendingQueue::open(&h._dir.path().join("ledger.db")).unwrap();
    let remaining: Vec<Uuid> = queue
        .drain_in_order()
        .unwrap()
        .into_iter()
        .map(|op| op.record.id)
        .collect();
    assert_eq!(remaining, vec![r2.id, r3.id]);

    // The next pass picks up where the failed one stopped
    let report = h.engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (2, 0));
    assert_eq!(h.backend.pushed_ids(), vec![r1.id, r2.id, r3.id]);
}

#[tokio::test]
async fn replay_updates_remote_state_only() {
    let mut h = offline_harness().await;
    let record = inflow("no duplicates", dec!(55));

    h.engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    let report = h.engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (1, 0));

    // The local collection still holds the record exactly once
    assert_eq!(h.engine.list(Collection::Inflows).unwrap(), vec![record]);
}

#[tokio::test]
async fn deleting_a_local_only_record_never_queues_a_remote_retry() {
    let mut h = offline_harness().await;
    let record = inflow("to delete", dec!(5));

    h.engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    assert_eq!(h.engine.pending().unwrap(), 1);

    let outcome = h
        .engine
        .delete(Collection::Inflows, record.id)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedLocal);
    assert!(h.engine.list(Collection::Inflows).unwrap().is_empty());
    assert_eq!(h.backend.deleted_calls(), 0);

    // The queued write replays and is then the remote's problem to ignore;
    // no delete retry ever appears
    h.engine.reconcile().await.unwrap();
    assert_eq!(h.backend.deleted_calls(), 0);
}

#[tokio::test]
async fn failed_remote_delete_is_best_effort() {
    let mut h = online_harness().await;
    let record = inflow("vanishing", dec!(12));

    h.engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();

    h.backend
        .fail_next_delete(RemoteError::Network("gone".to_string()));
    let outcome = h
        .engine
        .delete(Collection::Inflows, record.id)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedLocal);
    assert!(h.engine.list(Collection::Inflows).unwrap().is_empty());
    assert_eq!(h.engine.pending().unwrap(), 0);
}

#[tokio::test]
async fn online_delete_confirms_on_the_remote() {
    let mut h = online_harness().await;
    let record = inflow("synced delete", dec!(8));

    h.engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    let outcome = h
        .engine
        .delete(Collection::Inflows, record.id)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedRemote);
    assert_eq!(h.backend.deleted_calls(), 1);
}

#[tokio::test]
async fn pull_inserts_only_ids_unknown_locally() {
    let mut h = online_harness().await;
    let local = inflow("already here", dec!(30));
    h.engine
        .submit(Collection::Inflows, local.clone())
        .await
        .unwrap();

    let fresh = inflow("from the sheet", dec!(45));
    h.backend.set_fetch_result(vec![local.clone(), fresh.clone()]);

    let inserted = h.engine.pull(Collection::Inflows).await.unwrap();
    assert_eq!(inserted, 1);

    let listed = h.engine.list(Collection::Inflows).unwrap();
    assert_eq!(listed, vec![local, fresh]);

    // A second pull finds nothing new
    assert_eq!(h.engine.pull(Collection::Inflows).await.unwrap(), 0);
}

#[tokio::test]
async fn local_only_engine_skips_the_queue() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::open(&dir.path().join("ledger.db")).unwrap();
    let queue = PendingQueue::open(&dir.path().join("ledger.db")).unwrap();
    let monitor = ConnectivityMonitor::new(None, Duration::from_secs(1));
    let mut engine: SyncEngine<MockBackend> = SyncEngine::new(store, queue, monitor, None);

    let record = inflow("local only", dec!(70));
    let outcome = engine
        .submit(Collection::Inflows, record.clone())
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::AcceptedLocal);
    assert_eq!(engine.list(Collection::Inflows).unwrap(), vec![record]);
    assert_eq!(engine.pending().unwrap(), 0);
    assert!(!engine.remote_enabled());

    let report = engine.reconcile().await.unwrap();
    assert_eq!((report.replayed, report.failed), (0, 0));
}
