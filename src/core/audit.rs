//! Append-only audit trail for upstream rate calls.
//!
//! Every outbound call records a `request` entry before dispatch and exactly
//! one of `response`/`error` afterwards, all under the same correlation id.
//! Writers are serialized through a mutex so concurrent calls never
//! interleave partial entries. A failed write is reported to the diagnostics
//! channel and never disturbs the conversion itself.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPhase {
    Request,
    Response,
    Error,
}

impl fmt::Display for AuditPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            AuditPhase::Request => "request",
            AuditPhase::Response => "response",
            AuditPhase::Error => "error",
        };
        write!(f, "{phase}")
    }
}

pub struct AuditLog {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl AuditLog {
    /// Opens (or creates) the log file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .with_context(|| {
                format!("Failed to open audit log at {}", path.as_ref().display())
            })?;

        Ok(AuditLog {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(tokio::fs::File::from_std(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one delimited entry. Never fails the caller.
    pub async fn record(&self, correlation_id: Uuid, phase: AuditPhase, detail: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let entry = format!("[{timestamp}] [{correlation_id}] [{phase}]\n{detail}\n--\n");

        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(entry.as_bytes()).await {
            warn!(
                "Failed to append {phase} entry to audit log {}: {e}",
                self.path.display()
            );
            return;
        }
        if let Err(e) = file.flush().await {
            warn!("Failed to flush audit log {}: {e}", self.path.display());
        }
    }
}
