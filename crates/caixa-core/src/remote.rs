use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::error::RemoteError;
use crate::models::{Collection, FinancialRecord};

/// Acknowledgement for a confirmed remote write.
#[derive(Debug, Clone, Default)]
pub struct PushReceipt {
    /// Row identifier assigned by the backend, if it reports one. The local
    /// store keeps its own ids, so this is informational only.
    pub assigned_id: Option<String>,
}

/// Remote mirror of the ledger, injected at construction time.
///
/// The sync engine never cares whether a spreadsheet macro or a plain REST
/// endpoint answers; it only needs the three operations below. The backend
/// is expected to tolerate duplicate pushes keyed by record id, which is
/// what makes at-least-once replay safe.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn push(
        &self,
        collection: Collection,
        record: &FinancialRecord,
    ) -> Result<PushReceipt, RemoteError>;

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), RemoteError>;

    async fn fetch(&self, collection: Collection) -> Result<Vec<FinancialRecord>, RemoteError>;
}

/// Envelope every Apps Script response uses
#[derive(Debug, Deserialize)]
struct ScriptResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "assignedId")]
    assigned_id: Option<String>,
    #[serde(default)]
    dados: Option<Vec<FinancialRecord>>,
}

/// Client for the Google Apps Script endpoint that mirrors the ledger into
/// a spreadsheet, one tab per collection.
pub struct SheetsBackend {
    client: reqwest::Client,
    script_url: String,
    sheets_id: String,
    timeout: Duration,
}

impl SheetsBackend {
    pub fn new(script_url: String, sheets_id: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            script_url,
            sheets_id,
            timeout,
        }
    }

    async fn call(&self, body: serde_json::Value) -> Result<ScriptResponse, RemoteError> {
        let response = self
            .client
            .post(&self.script_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(RemoteError::Network(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let parsed: ScriptResponse = response.json().await.map_err(classify)?;
        if !parsed.success {
            return Err(RemoteError::Backend(
                parsed
                    .error
                    .unwrap_or_else(|| "unspecified backend error".to_string()),
            ));
        }
        Ok(parsed)
    }
}

fn classify(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(e.to_string())
    }
}

#[async_trait]
impl RemoteBackend for SheetsBackend {
    async fn push(
        &self,
        collection: Collection,
        record: &FinancialRecord,
    ) -> Result<PushReceipt, RemoteError> {
        let parsed = self
            .call(json!({
                "action": "salvar_dados",
                "sheetsId": self.sheets_id,
                "aba": collection.sheet_tab(),
                "dados": record,
            }))
            .await?;
        Ok(PushReceipt {
            assigned_id: parsed.assigned_id,
        })
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), RemoteError> {
        self.call(json!({
            "action": "excluir_dados",
            "sheetsId": self.sheets_id,
            "aba": collection.sheet_tab(),
            "id": id.to_string(),
        }))
        .await?;
        Ok(())
    }

    async fn fetch(&self, collection: Collection) -> Result<Vec<FinancialRecord>, RemoteError> {
        let parsed = self
            .call(json!({
                "action": "buscar_dados",
                "sheetsId": self.sheets_id,
                "aba": collection.sheet_tab(),
            }))
            .await?;
        Ok(parsed.dados.unwrap_or_default())
    }
}
