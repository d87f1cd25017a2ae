/// Batched command execution
///
/// A statement queues mutations (plain text, or a prepared command with one
/// parameter snapshot per entry) and runs them in order on demand. Each entry
/// must produce an update count; the first failure aborts the batch and is
/// reported together with the counts of the entries that already ran.
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{message, JdbcError, Result};
use crate::models::{CommandOutcome, DbHandle};
use crate::query::CompiledCommand;

/// One queued command with its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub command: CompiledCommand,
    pub params: Vec<Option<String>>,
}

/// Ordered queue of batch entries.
#[derive(Debug, Clone, Default)]
pub struct BatchQueue {
    entries: Vec<BatchEntry>,
}

impl BatchQueue {
    pub fn push(&mut self, entry: BatchEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Remove and return every queued entry.
    pub fn take(&mut self) -> Vec<BatchEntry> {
        std::mem::take(&mut self.entries)
    }
}

/// Update count of a command outcome.
///
/// A record list cannot be counted and fails with an argument error naming
/// the command text.
pub fn update_count(command: &str, outcome: CommandOutcome) -> Result<i32> {
    match outcome {
        CommandOutcome::Record(_) => Ok(1),
        CommandOutcome::Count(n) => Ok(n),
        CommandOutcome::Records(_) => Err(JdbcError::argument(
            "Statement.executeQueryAsUpdate",
            &[&command],
        )),
    }
}

/// Run batch entries sequentially, collecting one update count per entry.
///
/// # Arguments
/// - `backend`: engine to run the entries on
/// - `handle`: open database handle
/// - `entries`: entries in execution order
///
/// Returns the update counts, or a [`JdbcError::Batch`] carrying the counts
/// collected before the failing entry.
pub fn execute_entries(
    backend: &dyn Backend,
    handle: &DbHandle,
    entries: &[BatchEntry],
) -> Result<Vec<i32>> {
    let mut counts = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let text = entry.command.text();
        let result = backend
            .command(handle, text, &entry.params)
            .map_err(|e| JdbcError::from_backend(text, e))
            .and_then(|outcome| update_count(text, outcome));

        match result {
            Ok(count) => counts.push(count),
            Err(e) => {
                warn!(entry = index, command = text, error = %e, "batch aborted");
                return Err(JdbcError::Batch {
                    message: message("Statement.batchFailed", &[&index, &e]),
                    partial: counts,
                });
            }
        }
    }

    debug!(entries = counts.len(), "batch executed");
    Ok(counts)
}
