//! Exchange log for later audit.
//!
//! Every successful generation call is appended to `exchanges.jsonl` along
//! with the prompt version, so runs can be compared prompt-by-prompt. The
//! log is best-effort: a failed write is logged and the completion is still
//! returned.

use crate::client::{GenerationClient, TokenUsage};
use crate::models::{GenerationError, PodError, Result, Stage};
use crate::prompt::PromptSpec;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// File name of the log inside the audit directory.
pub const EXCHANGE_LOG_FILE: &str = "exchanges.jsonl";

/// One recorded request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Unique exchange ID
    pub id: Uuid,
    /// When the response arrived
    pub recorded_at: DateTime<Utc>,
    /// Pipeline stage
    pub stage: Stage,
    /// Fingerprint of the prompt definition
    pub prompt_version: Uuid,
    /// Model identifier
    pub model: String,
    pub temperature: f64,
    pub n: usize,
    pub system: String,
    pub user: String,
    /// Completions in service order
    pub responses: Vec<String>,
    /// Round-trip time in milliseconds
    pub latency_ms: u64,
}

impl ExchangeRecord {
    pub fn new(spec: &PromptSpec, responses: &[String], latency_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            stage: spec.stage,
            prompt_version: spec.version,
            model: spec.params.model.clone(),
            temperature: spec.params.temperature,
            n: spec.params.n,
            system: spec.system.clone(),
            user: spec.user.clone(),
            responses: responses.to_vec(),
            latency_ms,
        }
    }
}

/// Append-only JSONL log of exchanges.
pub struct ExchangeLog {
    path: PathBuf,
    /// Serialises appends from concurrent stages
    write_lock: Mutex<()>,
}

impl ExchangeLog {
    /// Log stored at `<dir>/exchanges.jsonl`. Nothing is created until the
    /// first append.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(EXCHANGE_LOG_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a JSON line.
    ///
    /// Blocking `std::fs` IO, run inline on the async `generate` path.
    pub fn append(&self, record: &ExchangeRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| PodError::Internal(format!("Serializing exchange: {e}")))?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PodError::io("creating audit directory", e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PodError::io("opening exchange log", e))?;

        writeln!(file, "{line}").map_err(|e| PodError::io("writing exchange log", e))?;
        Ok(())
    }

    /// Read every record back, in append order.
    pub fn read_all(&self) -> Result<Vec<ExchangeRecord>> {
        let file = fs::File::open(&self.path).map_err(|e| PodError::io("opening exchange log", e))?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| PodError::io("reading exchange log", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                PodError::Internal(format!("Exchange log line {}: {e}", line_num + 1))
            })?;
            records.push(record);
        }

        Ok(records)
    }
}

/// Wraps a client and records each successful exchange.
pub struct AuditedClient<C> {
    inner: C,
    log: ExchangeLog,
}

impl<C: GenerationClient> AuditedClient<C> {
    pub fn new(inner: C, log: ExchangeLog) -> Self {
        Self { inner, log }
    }

    pub fn log(&self) -> &ExchangeLog {
        &self.log
    }
}

#[async_trait]
impl<C: GenerationClient> GenerationClient for AuditedClient<C> {
    async fn generate(&self, spec: &PromptSpec) -> std::result::Result<Vec<String>, GenerationError> {
        let start = Instant::now();
        let responses = self.inner.generate(spec).await?;
        let record = ExchangeRecord::new(spec, &responses, start.elapsed().as_millis() as u64);

        match self.log.append(&record) {
            Ok(()) => debug!(stage = %spec.stage, exchange_id = %record.id, "Exchange recorded"),
            Err(e) => warn!(
                stage = %spec.stage,
                path = %self.log.path().display(),
                error = %e,
                "Failed to record exchange"
            ),
        }

        Ok(responses)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn usage(&self) -> TokenUsage {
        self.inner.usage()
    }
}
