//! Bounded pool for fire-and-forget jobs such as inbound chat commands

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, warn};

#[derive(Clone)]
pub struct WorkerPool {
    name: &'static str,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: &'static str, max_workers: usize) -> Self {
        Self {
            name,
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` once a worker slot is free.
    ///
    /// The job runs in its own task; a panic is logged and never reaches the caller.
    pub fn submit<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        let name = self.name;

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!(pool = name, "Worker pool closed, dropping job");
                return;
            };

            if let Err(e) = tokio::spawn(job).await {
                if e.is_panic() {
                    error!(pool = name, error = %e, "Panic in worker job");
                } else {
                    warn!(pool = name, error = %e, "Worker job cancelled");
                }
            }
        })
    }
}
