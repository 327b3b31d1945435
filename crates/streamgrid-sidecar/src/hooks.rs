//! Stop hooks — scoped releases registered at connect time and unwound
//! in reverse order on shutdown.

use std::sync::Mutex;

use futures::future::BoxFuture;
use tracing::{error, info};

pub type StopHook = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A stack of named release actions.
///
/// Hooks run in reverse registration order; every hook runs even when
/// earlier ones fail, and failures are collected rather than short-
/// circuiting. Running twice is a no-op: the stack drains on first use.
#[derive(Default)]
pub struct StopHooks {
    hooks: Mutex<Vec<(String, StopHook)>>,
}

impl StopHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str, hook: StopHook) {
        self.hooks
            .lock()
            .expect("stop hooks lock")
            .push((name.to_string(), hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().expect("stop hooks lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run all registered hooks, newest first. Returns the failures.
    pub async fn run_all(&self) -> Vec<(String, anyhow::Error)> {
        let hooks: Vec<(String, StopHook)> = {
            let mut guard = self.hooks.lock().expect("stop hooks lock");
            guard.drain(..).collect()
        };
        let mut failures = Vec::new();
        for (name, hook) in hooks.into_iter().rev() {
            info!(hook = %name, "running stop hook");
            if let Err(e) = hook().await {
                error!(hook = %name, error = %e, "stop hook failed");
                failures.push((name, e));
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn hooks_run_in_reverse_order() {
        let hooks = StopHooks::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let order = order.clone();
            hooks.push(
                name,
                Box::new(move || {
                    Box::pin(async move {
                        order.lock().unwrap().push(name.to_string());
                        Ok(())
                    })
                }),
            );
        }

        let failures = hooks.run_all().await;
        assert!(failures.is_empty());
        assert_eq!(*order.lock().unwrap(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_unwind() {
        let hooks = StopHooks::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        {
            let order = order.clone();
            hooks.push(
                "first",
                Box::new(move || {
                    Box::pin(async move {
                        order.lock().unwrap().push("first");
                        Ok(())
                    })
                }),
            );
        }
        hooks.push(
            "failing",
            Box::new(|| Box::pin(async { anyhow::bail!("release failed") })),
        );

        let failures = hooks.run_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "failing");
        // The earlier hook still ran.
        assert_eq!(*order.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let hooks = StopHooks::new();
        let count = Arc::new(Mutex::new(0));
        {
            let count = count.clone();
            hooks.push(
                "once",
                Box::new(move || {
                    Box::pin(async move {
                        *count.lock().unwrap() += 1;
                        Ok(())
                    })
                }),
            );
        }

        hooks.run_all().await;
        hooks.run_all().await;
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
