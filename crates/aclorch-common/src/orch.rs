//! Base trait for orchestration agents.

use async_trait::async_trait;

/// Base trait for orchestration agents.
///
/// Each orchestration module implements this trait to participate in the
/// daemon's event loop. The loop calls [`Orch::do_task`] whenever data is
/// available on any of the module's consumers.
///
/// Implementations drain their consumers, process each entry in arrival
/// order, and record the outcome. Structural failures are surfaced back to
/// the configuration source; per-rule rejections are logged and consume the
/// event. There is no concurrent mutation of one module's state: the loop is
/// the single writer.
#[async_trait]
pub trait Orch: Send + Sync {
    /// Returns the name of this module (for logging and debugging).
    fn name(&self) -> &str;

    /// Processes pending tasks from all consumers.
    async fn do_task(&mut self);

    /// Returns the priority of this module (lower = processed first).
    fn priority(&self) -> i32 {
        0
    }

    /// Returns true if this module has pending work.
    fn has_pending_tasks(&self) -> bool {
        false
    }

    /// Dumps pending tasks for debugging.
    fn dump_pending_tasks(&self) -> Vec<String> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingOrch {
        name: String,
        task_count: usize,
    }

    #[async_trait]
    impl Orch for CountingOrch {
        fn name(&self) -> &str {
            &self.name
        }

        async fn do_task(&mut self) {
            self.task_count += 1;
        }

        fn has_pending_tasks(&self) -> bool {
            self.task_count == 0
        }
    }

    #[tokio::test]
    async fn test_orch_trait() {
        let mut orch = CountingOrch {
            name: "test".to_string(),
            task_count: 0,
        };

        assert_eq!(orch.name(), "test");
        assert!(orch.has_pending_tasks());

        orch.do_task().await;
        assert_eq!(orch.task_count, 1);
        assert!(!orch.has_pending_tasks());
    }
}
