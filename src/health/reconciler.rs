//! Breaker-open health reconciliation.
//!
//! # Responsibilities
//! - Report a node failing as soon as its breaker rejects a call
//! - Report it passing again once the breaker's cool-down has elapsed
//! - Keep both signals off the request's error path

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;

use crate::discovery::ServiceNode;
use crate::health::{HealthError, HealthReporter};
use crate::observability::metrics;

const RECOVERY_NOTE: &str = "close circuit breaker";

/// Keeps an external health-check system in step with breaker-open events.
#[derive(Clone)]
pub struct HealthReconciler {
    reporter: Arc<dyn HealthReporter>,
    report_timeout: Duration,
}

impl HealthReconciler {
    pub fn new(reporter: Arc<dyn HealthReporter>, report_timeout: Duration) -> Self {
        Self {
            reporter,
            report_timeout,
        }
    }

    /// Mark `node` failing, then schedule it to be marked passing after
    /// `cool_down`.
    ///
    /// The failing signal is sent before this returns. The passing signal runs
    /// on its own task; the returned handle may be dropped.
    pub async fn on_breaker_open(&self, node: &ServiceNode, cool_down: Duration) -> JoinHandle<()> {
        let reason = format!(
            "circuit breaker is open (node id: {}, cool down: {:?})",
            node.id, cool_down
        );
        let result = report(self.report_timeout, self.reporter.mark_failing(&node.health_check_ref, &reason)).await;
        log_signal("failing", &node.id, &node.health_check_ref, result);

        let reporter = self.reporter.clone();
        let report_timeout = self.report_timeout;
        let node_id = node.id.clone();
        let check_ref = node.health_check_ref.clone();

        tokio::spawn(async move {
            time::sleep(cool_down).await;
            let result = report(report_timeout, reporter.mark_passing(&check_ref, RECOVERY_NOTE)).await;
            log_signal("passing", &node_id, &check_ref, result);
        })
    }
}

async fn report<F>(limit: Duration, signal: F) -> Result<(), HealthError>
where
    F: std::future::Future<Output = Result<(), HealthError>>,
{
    match time::timeout(limit, signal).await {
        Ok(result) => result,
        Err(_) => Err(HealthError::Agent(format!("timed out after {:?}", limit))),
    }
}

fn log_signal(signal: &'static str, node_id: &str, check_ref: &str, result: Result<(), HealthError>) {
    match result {
        Ok(()) => {
            tracing::info!(node_id = %node_id, check = %check_ref, signal, "Reported node health");
            metrics::record_health_signal(signal, true);
        }
        Err(e) => {
            tracing::warn!(node_id = %node_id, check = %check_ref, signal, error = %e, "Failed to report node health");
            metrics::record_health_signal(signal, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(&'static str, String, Instant)>>,
        fail: bool,
        hang: bool,
    }

    impl Recorder {
        async fn push(&self, signal: &'static str, check: &str) -> Result<(), HealthError> {
            self.calls.lock().push((signal, check.to_string(), Instant::now()));
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(HealthError::Agent("refused".into()));
            }
            Ok(())
        }

        fn signals(&self) -> Vec<&'static str> {
            self.calls.lock().iter().map(|c| c.0).collect()
        }
    }

    #[async_trait]
    impl HealthReporter for Recorder {
        async fn mark_failing(&self, check_ref: &str, _reason: &str) -> Result<(), HealthError> {
            self.push("failing", check_ref).await
        }

        async fn mark_passing(&self, check_ref: &str, _reason: &str) -> Result<(), HealthError> {
            self.push("passing", check_ref).await
        }
    }

    fn node() -> ServiceNode {
        ServiceNode::new("s1", "127.0.0.1:9000", "service:s1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_before_return_passing_after_cool_down() {
        let recorder = Arc::new(Recorder::default());
        let reconciler = HealthReconciler::new(recorder.clone(), Duration::from_secs(1));
        let cool_down = Duration::from_secs(5);

        let started = Instant::now();
        let timer = reconciler.on_breaker_open(&node(), cool_down).await;
        assert_eq!(recorder.signals(), vec!["failing"]);

        time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(recorder.signals(), vec!["failing"]);

        timer.await.unwrap();
        let calls = recorder.calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "passing");
        assert_eq!(calls[1].1, "service:s1");
        assert!(calls[1].2.duration_since(started) >= cool_down);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_errors_are_swallowed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let reconciler = HealthReconciler::new(recorder.clone(), Duration::from_secs(1));

        let timer = reconciler.on_breaker_open(&node(), Duration::from_millis(10)).await;
        timer.await.unwrap();
        assert_eq!(recorder.signals(), vec!["failing", "passing"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_reporter_is_bounded() {
        let recorder = Arc::new(Recorder {
            hang: true,
            ..Default::default()
        });
        let reconciler = HealthReconciler::new(recorder.clone(), Duration::from_millis(50));

        let started = Instant::now();
        let _timer = reconciler.on_breaker_open(&node(), Duration::from_secs(1)).await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_open_event_schedules_its_own_timer() {
        let recorder = Arc::new(Recorder::default());
        let reconciler = HealthReconciler::new(recorder.clone(), Duration::from_secs(1));

        let first = reconciler.on_breaker_open(&node(), Duration::from_secs(2)).await;
        time::sleep(Duration::from_secs(1)).await;
        let second = reconciler.on_breaker_open(&node(), Duration::from_secs(2)).await;

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(recorder.signals(), vec!["failing", "failing", "passing", "passing"]);
    }
}
