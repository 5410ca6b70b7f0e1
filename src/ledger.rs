// src/ledger.rs
// =============================================================================
// Persistence of audit requests and reports, off the response path.
//
// The auditor never talks to storage directly. It emits LedgerEvents into an
// unbounded channel and moves on; a background task drains the channel into
// a RequestLedger. A slow or broken ledger therefore can't delay or change
// what the caller gets back, it only produces warnings in the log.
//
// Implementations:
// - JsonLinesLedger: appends one JSON object per event to a file
// - NullLedger: drops everything (no ledger configured)
// =============================================================================

use crate::audit::AuditRequest;
use crate::report::AuditResponse;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode ledger record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// The request was created or changed status
    Request(AuditRequest),
    /// A finished audit
    Report {
        request_id: Uuid,
        report: Box<AuditResponse>,
    },
}

#[async_trait]
pub trait RequestLedger: Send {
    async fn record(&mut self, event: &LedgerEvent) -> Result<(), LedgerError>;
}

pub struct NullLedger;

#[async_trait]
impl RequestLedger for NullLedger {
    async fn record(&mut self, _event: &LedgerEvent) -> Result<(), LedgerError> {
        Ok(())
    }
}

pub struct JsonLinesLedger {
    path: PathBuf,
}

impl JsonLinesLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RequestLedger for JsonLinesLedger {
    async fn record(&mut self, event: &LedgerEvent) -> Result<(), LedgerError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Sending side of the ledger channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    tx: mpsc::UnboundedSender<LedgerEvent>,
}

impl LedgerHandle {
    /// Fire and forget. Never blocks, never fails the caller.
    pub fn emit(&self, event: LedgerEvent) {
        if self.tx.send(event).is_err() {
            debug!("ledger writer has stopped, dropping event");
        }
    }
}

// Starts the background writer. It runs until every LedgerHandle is dropped
// and the channel is drained; await the JoinHandle to flush on shutdown.
pub fn spawn_ledger(mut ledger: Box<dyn RequestLedger>) -> (LedgerHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<LedgerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = ledger.record(&event).await {
                warn!(error = %e, "failed to persist ledger event");
            }
        }
    });

    (LedgerHandle { tx }, writer)
}
