use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use colored::Colorize;
use dialoguer::{Confirm, Password};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use caixa_core::auth::UserManager;
use caixa_core::models::{Collection, ConnectivityStatus, FinancialRecord, Outcome};
use caixa_core::{
    Config, ConnectivityMonitor, PendingQueue, RecordStore, SheetsBackend, State, SyncEngine,
};

/// Probe timeout used when no remote is configured and nothing real is
/// probed anyway
const FALLBACK_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire a sync engine from the configuration
fn open_engine(config: &Config) -> Result<SyncEngine<SheetsBackend>> {
    let db_path = config.ledger_db_path()?;
    let store = RecordStore::open(&db_path)?;
    let queue = PendingQueue::open(&db_path)?;

    let (monitor, backend) = match &config.remote {
        Some(remote) => (
            ConnectivityMonitor::new(Some(remote.script_url.clone()), remote.probe_timeout()),
            Some(SheetsBackend::new(
                remote.script_url.clone(),
                remote.sheets_id.clone(),
                remote.request_timeout(),
            )),
        ),
        None => (
            ConnectivityMonitor::new(None, FALLBACK_PROBE_TIMEOUT),
            None,
        ),
    };

    Ok(SyncEngine::new(store, queue, monitor, backend))
}

fn parse_collection(name: &str) -> Result<Collection> {
    Collection::parse(name)
        .with_context(|| format!("Unknown collection '{}', expected entradas or saidas", name))
}

fn collection_label(collection: Collection) -> &'static str {
    match collection {
        Collection::Inflows => "Inflow",
        Collection::Outflows => "Outflow",
    }
}

/// Handle 'in' and 'out': record a monetary event
pub async fn add_record(
    config: &Config,
    collection: Collection,
    kind: &str,
    amount: Decimal,
    description: &str,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let state = State::load()?;
    let occurred_on = date.unwrap_or_else(|| Local::now().date_naive());
    let record = FinancialRecord::new(kind, amount, description, occurred_on, state.recorded_by());
    let id = record.id;

    let mut engine = open_engine(config)?;
    // One explicit probe per invocation; a reachable remote also gets the
    // queue drained before the new write goes out
    if engine.probe().await == ConnectivityStatus::Online && engine.pending()? > 0 {
        engine.reconcile().await?;
    }

    let outcome = engine.submit(collection, record).await?;

    if json {
        let label = match &outcome {
            Outcome::AcceptedRemote => "accepted-remote",
            Outcome::AcceptedLocal => "accepted-local",
            Outcome::Rejected(_) => "rejected",
        };
        println!("{}", json!({ "id": id.to_string(), "outcome": label }));
        if let Outcome::Rejected(e) = outcome {
            bail!("{}", e);
        }
        return Ok(());
    }

    match outcome {
        Outcome::AcceptedRemote => {
            println!(
                "{} {} saved and mirrored to the spreadsheet",
                "✓".green(),
                collection_label(collection)
            );
        }
        Outcome::AcceptedLocal if engine.remote_enabled() => {
            println!(
                "{} {} saved locally; will sync when the remote is reachable",
                "!".yellow(),
                collection_label(collection)
            );
        }
        Outcome::AcceptedLocal => {
            println!("{} {} saved locally", "✓".green(), collection_label(collection));
        }
        Outcome::Rejected(e) => bail!("{}", e),
    }
    Ok(())
}

/// Handle 'ls': print records of one or both collections
pub fn list_records(config: &Config, collection: Option<&str>, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let collections = match collection {
        Some(name) => vec![parse_collection(name)?],
        None => vec![Collection::Inflows, Collection::Outflows],
    };

    if json {
        let mut out = serde_json::Map::new();
        for c in &collections {
            out.insert(c.as_str().to_string(), serde_json::to_value(engine.list(*c)?)?);
        }
        println!("{}", serde_json::Value::Object(out));
        return Ok(());
    }

    for c in collections {
        let records = engine.list(c)?;
        println!("{}", c.sheet_tab().bold());
        if records.is_empty() {
            println!("  (no records)");
            continue;
        }
        for record in records {
            println!(
                "  {}  {:<16} {:>12}  {}  {}",
                record.occurred_on,
                record.kind,
                record.amount.to_string().bold(),
                record.description,
                record.id.to_string().dimmed(),
            );
        }
    }
    Ok(())
}

/// Handle 'rm': delete a record
pub async fn remove_record(config: &Config, collection: &str, id: Uuid, json: bool) -> Result<()> {
    let collection = parse_collection(collection)?;
    let mut engine = open_engine(config)?;
    engine.probe().await;

    let outcome = engine.delete(collection, id).await?;

    if json {
        let label = match outcome {
            Outcome::AcceptedRemote => "accepted-remote",
            _ => "accepted-local",
        };
        println!("{}", json!({ "id": id.to_string(), "outcome": label }));
        return Ok(());
    }

    match outcome {
        Outcome::AcceptedRemote => {
            println!("{} Record removed locally and from the spreadsheet", "✓".green())
        }
        _ => println!("{} Record removed locally", "✓".green()),
    }
    Ok(())
}

/// Handle 'dashboard': show the four allocation fund totals
pub fn dashboard(config: &Config, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let totals = engine.totals()?;

    if json {
        println!("{}", serde_json::to_string(&totals)?);
        return Ok(());
    }

    println!("{}", "Allocation funds".bold());
    print_fund("Central fund", totals.central_fund);
    print_fund("Local fund", totals.local_fund);
    print_fund("Missions fund", totals.missions_fund);
    print_fund("Construction fund", totals.construction_fund);
    Ok(())
}

fn print_fund(label: &str, value: Decimal) {
    let amount = if value < Decimal::ZERO {
        value.to_string().red()
    } else {
        value.to_string().green()
    };
    println!("  {:<18} {}", label, amount);
}

/// Handle 'sync': probe, then replay the pending queue
pub async fn sync(config: &Config, json: bool) -> Result<()> {
    let mut engine = open_engine(config)?;
    if !engine.remote_enabled() {
        bail!("No remote configured. Run 'caixa remote set <script-url> <sheets-id>' first");
    }

    let status = engine.probe().await;
    if status != ConnectivityStatus::Online {
        let pending = engine.pending()?;
        if json {
            println!(
                "{}",
                json!({ "status": status, "replayed": 0, "failed": 0, "pending": pending })
            );
            return Ok(());
        }
        println!(
            "{} Remote unreachable; {} operation(s) still queued",
            "!".yellow(),
            pending
        );
        return Ok(());
    }

    let report = engine.reconcile().await?;
    let pending = engine.pending()?;

    if json {
        println!(
            "{}",
            json!({
                "status": status,
                "replayed": report.replayed,
                "failed": report.failed,
                "pending": pending,
            })
        );
        return Ok(());
    }

    if report.failed > 0 {
        println!(
            "{} Replayed {}, then stopped at a failure; {} still queued",
            "!".yellow(),
            report.replayed,
            pending
        );
    } else if report.replayed > 0 {
        println!("{} Replayed {} queued operation(s)", "✓".green(), report.replayed);
    } else {
        println!("{} Nothing to replay", "✓".green());
    }
    Ok(())
}

/// Handle 'pull': merge remote records missing locally
pub async fn pull(config: &Config, json: bool) -> Result<()> {
    let mut engine = open_engine(config)?;
    if !engine.remote_enabled() {
        bail!("No remote configured. Run 'caixa remote set <script-url> <sheets-id>' first");
    }

    engine.probe().await;
    let inflows = engine.pull(Collection::Inflows).await?;
    let outflows = engine.pull(Collection::Outflows).await?;

    if json {
        println!("{}", json!({ "entradas": inflows, "saidas": outflows }));
        return Ok(());
    }
    println!(
        "{} Pulled {} inflow(s) and {} outflow(s) from the spreadsheet",
        "✓".green(),
        inflows,
        outflows
    );
    Ok(())
}

/// Handle 'status': connectivity, queue depth and session
pub async fn status(config: &Config, json: bool) -> Result<()> {
    let state = State::load()?;
    let mut engine = open_engine(config)?;
    let connectivity = engine.probe().await;
    let pending = engine.pending()?;

    if json {
        println!(
            "{}",
            json!({
                "connectivity": connectivity,
                "pending": pending,
                "remote_configured": engine.remote_enabled(),
                "user": state.session.user_name,
            })
        );
        return Ok(());
    }

    let status_str = match connectivity {
        ConnectivityStatus::Online => "online".green(),
        ConnectivityStatus::Offline => "offline".red(),
        ConnectivityStatus::Connecting => "connecting".yellow(),
    };
    println!("Remote:  {}", status_str);
    println!("Pending: {} queued operation(s)", pending);
    match state.session.user_name {
        Some(name) => println!("User:    {}", name),
        None => println!("User:    {} (not logged in)", "anonymous".dimmed()),
    }
    Ok(())
}

/// Handle 'remote set': persist the endpoint settings
pub fn remote_set(config: &mut Config, script_url: &str, sheets_id: &str) -> Result<()> {
    config.remote = Some(caixa_core::config::RemoteSettings::new(
        script_url.to_string(),
        sheets_id.to_string(),
    ));
    config.save()?;
    println!("{} Remote configured: {}", "✓".green(), script_url);
    Ok(())
}

/// Handle 'remote test': probe the configured endpoint once
pub async fn remote_test(config: &Config) -> Result<()> {
    let remote = config
        .remote
        .as_ref()
        .context("No remote configured. Run 'caixa remote set <script-url> <sheets-id>' first")?;

    let mut monitor =
        ConnectivityMonitor::new(Some(remote.script_url.clone()), remote.probe_timeout());
    match monitor.probe().await {
        ConnectivityStatus::Online => {
            println!("{} Remote endpoint is reachable", "✓".green());
            Ok(())
        }
        _ => bail!("Remote endpoint is not reachable"),
    }
}

/// Handle 'user add': provision a user, prompting for the password
pub fn user_add(config: &Config, id: &str, name: &str, role: &str) -> Result<()> {
    let users = UserManager::open(&config.ledger_db_path()?)?;
    let password = Password::new()
        .with_prompt(format!("Password for {}", id))
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    users.add_user(id, name, role, &password)?;
    println!("{} User '{}' saved", "✓".green(), id);
    Ok(())
}

/// Handle 'login': verify credentials and persist the session
pub fn login(config: &Config, user_id: &str) -> Result<()> {
    let users = UserManager::open(&config.ledger_db_path()?)?;
    let password = Password::new().with_prompt("Password").interact()?;

    let mut state = State::load()?;
    match users.login(&mut state, user_id, &password)? {
        Some(user) => {
            println!("{} Welcome, {} ({})", "✓".green(), user.name, user.role);
            Ok(())
        }
        None => bail!("Invalid user or password"),
    }
}

/// Handle 'logout': drop the persisted session
pub fn logout() -> Result<()> {
    let mut state = State::load()?;
    UserManager::logout(&mut state)?;
    println!("{} Logged out", "✓".green());
    Ok(())
}

/// Handle 'export': write both collections to a JSON backup file
pub fn export(config: &Config, path: Option<PathBuf>, json: bool) -> Result<()> {
    let engine = open_engine(config)?;
    let backup = json!({
        "entradas": engine.list(Collection::Inflows)?,
        "saidas": engine.list(Collection::Outflows)?,
    });

    let path = path.unwrap_or_else(|| {
        PathBuf::from(format!(
            "caixa-backup-{}.json",
            Local::now().format("%Y-%m-%d")
        ))
    });
    std::fs::write(&path, serde_json::to_string_pretty(&backup)?)
        .with_context(|| format!("Failed to write backup file: {}", path.display()))?;

    if json {
        println!("{}", json!({ "path": path }));
        return Ok(());
    }
    println!("{} Backup written to {}", "✓".green(), path.display());
    Ok(())
}

/// Handle 'clear': wipe both collections after confirmation
pub fn clear(config: &Config) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt("Delete ALL records? This cannot be undone")
        .default(false)
        .interact()?;
    if !confirmed {
        println!("Cancelled");
        return Ok(());
    }

    let mut engine = open_engine(config)?;
    engine.clear()?;
    println!("{} All records deleted", "✓".green());
    Ok(())
}
