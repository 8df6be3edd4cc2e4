//! Registry of detached tasks.
//!
//! Satellite work (narration, diagram, illustration) runs on spawned tasks
//! that nobody awaits during the turn. The registry tracks them so a turn
//! can be awaited as a whole and so shutdown can drain what is still
//! running. Tasks are never cancelled.

use std::future::Future;
use tokio_util::task::TaskTracker;

/// Tracks every detached task spawned by the application.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    all: TaskTracker,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a task group for one turn.
    pub fn turn(&self, turn_id: u64) -> TurnTasks {
        TurnTasks {
            turn_id,
            group: TaskTracker::new(),
            all: self.all.clone(),
        }
    }

    /// Spawns a task that does not belong to any turn.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.all.spawn(task);
    }

    /// Number of detached tasks still running.
    pub fn pending(&self) -> usize {
        self.all.len()
    }

    /// Waits for every detached task to finish.
    pub async fn drain(&self) {
        self.all.close();
        self.all.wait().await;
        self.all.reopen();
    }
}

/// The detached tasks of one turn.
#[derive(Debug)]
pub struct TurnTasks {
    turn_id: u64,
    group: TaskTracker,
    all: TaskTracker,
}

impl TurnTasks {
    pub fn turn_id(&self) -> u64 {
        self.turn_id
    }

    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::debug!("[TaskRegistry] Spawning {} for turn {}", name, self.turn_id);
        self.all.spawn(self.group.track_future(task));
    }

    /// Closes the group; no more tasks can join this turn.
    pub fn seal(self) -> TurnSettled {
        self.group.close();
        TurnSettled { group: self.group }
    }
}

/// Completion signal for a sealed turn.
#[derive(Debug, Clone)]
pub struct TurnSettled {
    group: TaskTracker,
}

impl TurnSettled {
    /// Resolves once every task of the turn has finished.
    pub async fn wait(&self) {
        self.group.wait().await;
    }

    pub fn is_settled(&self) -> bool {
        self.group.is_closed() && self.group.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_turn_waits_for_its_tasks() {
        let registry = TaskRegistry::new();
        let done = Arc::new(AtomicUsize::new(0));

        let tasks = registry.turn(1);
        for delay in [30, 10] {
            let done = done.clone();
            tasks.spawn("sleep", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        let settled = tasks.seal();

        settled.wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert!(settled.is_settled());
    }

    #[tokio::test]
    async fn test_turns_are_independent() {
        let registry = TaskRegistry::new();
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let slow = registry.turn(1);
        slow.spawn("blocked", async move {
            let _ = gate.await;
        });
        let slow = slow.seal();

        let fast = registry.turn(2);
        fast.spawn("noop", async {});
        fast.seal().wait().await;

        assert!(!slow.is_settled());
        assert!(registry.pending() >= 1);

        release.send(()).unwrap();
        registry.drain().await;
        assert!(slow.is_settled());
    }
}
