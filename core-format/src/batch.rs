//! Bounded fan-out over many files.
//!
//! One task is spawned per input; a semaphore caps how many run at once.
//! Every input yields exactly one [`BatchEntry`], in input order, holding
//! either the value or the captured error. A panicking task is reported as
//! [`FormatError::Internal`] for its own entry.

use crate::error::{FormatError, Result};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

#[derive(Debug)]
pub struct BatchEntry<T> {
    pub path: PathBuf,
    pub result: Result<T>,
}

impl<T> BatchEntry<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub async fn run_batch<T, F, Fut>(paths: Vec<PathBuf>, max_concurrent: usize, op: F) -> Vec<BatchEntry<T>>
where
    T: Send + 'static,
    F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let op = Arc::new(op);
    debug!(files = paths.len(), max_concurrent, "Starting batch");

    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let semaphore = Arc::clone(&semaphore);
        let op = Arc::clone(&op);
        let task_path = path.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| FormatError::Internal(format!("batch semaphore closed: {}", e)))?;
            op(task_path).await
        });
        handles.push((path, handle));
    }

    let mut entries = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Batch task panicked");
                Err(FormatError::Internal(format!("task failed: {}", e)))
            }
        };
        entries.push(BatchEntry { path, result });
    }
    entries
}
