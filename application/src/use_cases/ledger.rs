//! Execution ledger
//!
//! Owns the `execution:<id>` key space. All writes to an execution record go
//! through here so the pending → terminal rule holds across processes: the
//! terminal write is a compare-and-swap against the exact bytes that were
//! read, and a record that is already terminal is never rewritten.

use crate::ports::store::{KeyValueStore, KeyValueStoreExt, StoreError, execution_key};
use relay_domain::{ExecutionId, ExecutionOutcome, ExecutionRecord};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// How many times a racing terminal write is retried before giving up
const MAX_FINISH_ATTEMPTS: usize = 8;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("execution {execution_id} has an unreadable record: {message}")]
    Corrupt {
        execution_id: String,
        message: String,
    },

    #[error("execution {0} kept changing underneath the terminal write")]
    Contended(String),
}

/// Result of a terminal write
#[derive(Debug, Clone, PartialEq)]
pub enum FinishResult {
    /// The record moved to its terminal state
    Written(ExecutionRecord),
    /// The record was already terminal; nothing was written
    AlreadyTerminal(ExecutionRecord),
    /// No record exists for the id; nothing was written
    Missing,
}

pub struct ExecutionLedger {
    store: Arc<dyn KeyValueStore>,
}

impl ExecutionLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write the initial pending record for a new execution.
    pub async fn create_pending(
        &self,
        id: &ExecutionId,
        record: &ExecutionRecord,
    ) -> Result<(), LedgerError> {
        self.store.set_json(&execution_key(id), record).await?;
        debug!(execution_id = %id, tool = %record.tool, "Pending execution recorded");
        Ok(())
    }

    pub async fn get(&self, id: &ExecutionId) -> Result<Option<ExecutionRecord>, LedgerError> {
        match self.store.get(&execution_key(id)).await? {
            Some(bytes) => parse(id, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Move the record to the outcome's terminal state.
    ///
    /// Read-modify-write: tool, args and callback address are kept, status
    /// and result are replaced. If another writer changes the record between
    /// the read and the write, the whole step is retried against the new
    /// contents.
    pub async fn finish(
        &self,
        id: &ExecutionId,
        outcome: &ExecutionOutcome,
    ) -> Result<FinishResult, LedgerError> {
        let key = execution_key(id);

        for _ in 0..MAX_FINISH_ATTEMPTS {
            let Some(current) = self.store.get(&key).await? else {
                warn!(execution_id = %id, "Execution record not found; result not stored");
                return Ok(FinishResult::Missing);
            };

            let mut record = parse(id, &current)?;
            if record.finish(outcome).is_err() {
                warn!(
                    execution_id = %id,
                    status = %record.status,
                    "Execution already terminal; late result discarded"
                );
                return Ok(FinishResult::AlreadyTerminal(record));
            }

            let updated = serde_json::to_vec(&record)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if self.store.compare_and_swap(&key, &current, updated).await? {
                debug!(execution_id = %id, status = %record.status, "Execution finished");
                return Ok(FinishResult::Written(record));
            }
            debug!(execution_id = %id, "Execution record changed during finish; retrying");
        }

        Err(LedgerError::Contended(id.to_string()))
    }
}

fn parse(id: &ExecutionId, bytes: &[u8]) -> Result<ExecutionRecord, LedgerError> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Corrupt {
        execution_id: id.to_string(),
        message: e.to_string(),
    })
}
