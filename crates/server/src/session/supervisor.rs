use log::{error, warn};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::{JoinError, JoinSet};

/// Owns the join handles of every session task of one server run
#[derive(Debug, Clone, Default)]
pub struct SessionSupervisor {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a supervised task, reaping any that already finished
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        while let Some(result) = tasks.try_join_next() {
            report(result);
        }
        tasks.spawn(task);
    }

    /// Number of tasks not yet reaped
    pub fn len(&self) -> usize {
        self.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks().is_empty()
    }

    /// Wait for every supervised task to finish
    ///
    /// Callers signal cancellation first; this only waits.
    pub async fn join_all(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks());
        while let Some(result) = tasks.join_next().await {
            report(result);
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        // Nothing panics while holding the lock; recover the set regardless
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn report(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_panic() => error!("Session task panicked: {}", e),
        Err(e) => warn!("Session task aborted: {}", e),
    }
}
