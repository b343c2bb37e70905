pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod queue;
pub mod remote;
pub mod report;
pub mod store;
pub mod sync;

// Re-export commonly used types and functions
pub use config::{Config, State};
pub use error::{LedgerError, RemoteError, ValidationError};
pub use models::{
    AllocationTotals, Collection, ConnectivityStatus, FinancialRecord, Outcome, PendingOperation,
    ReplayReport,
};
pub use monitor::ConnectivityMonitor;
pub use queue::PendingQueue;
pub use remote::{PushReceipt, RemoteBackend, SheetsBackend};
pub use report::compute_totals;
pub use store::RecordStore;
pub use sync::SyncEngine;
