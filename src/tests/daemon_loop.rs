#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    use crate::credentials::{CredentialEntry, CredentialSet, RefreshCycleResult};
    use crate::errors::CycleError;
    use crate::orchestrator::daemon::{CycleRunner, Daemon, RunMode};
    use crate::orchestrator::scheduler::SchedulePolicy;
    use crate::resilience::retry::RetrySettings;

    /// Fails the first `failures` runs, then succeeds with a credential expiring `expires_in` from now.
    struct CountingRunner {
        calls: Arc<AtomicUsize>,
        failures: usize,
        expires_in: TimeDelta,
    }

    impl CycleRunner for CountingRunner {
        async fn run_once(&self) -> Result<RefreshCycleResult, CycleError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(CycleError::Authentication {
                    tenant: "tenant-1".to_owned(),
                    reason: "invalid_client".to_owned(),
                });
            }
            let exp = Utc::now() + self.expires_in;
            let entry = CredentialEntry::build("a.azurecr.io", "token", |_| Ok(exp));
            let credentials: CredentialSet = std::iter::once(entry).collect();
            Ok(RefreshCycleResult::new(credentials, 0, 1))
        }
    }

    fn policy() -> SchedulePolicy {
        SchedulePolicy {
            advance_seconds: 600,
            floor_seconds: 600,
            interval_override: None,
        }
    }

    fn daemon(calls: &Arc<AtomicUsize>, failures: usize, mode: RunMode) -> Daemon<CountingRunner> {
        Daemon::new(
            CountingRunner {
                calls: calls.clone(),
                failures,
                expires_in: TimeDelta::days(1),
            },
            policy(),
            mode,
            RetrySettings::new(10, 10),
        )
    }

    fn shutdown_after(delay: Duration) -> impl std::future::Future<Output = ()> + Send {
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(());
        });
        async move {
            let _ = rx.await;
        }
    }

    #[tokio::test]
    async fn one_shot_runs_a_single_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        daemon(&calls, 0, RunMode::OneShot)
            .run(std::future::pending())
            .await
            .expect("one-shot cycle");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_shot_returns_fatal_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let err = daemon(&calls, 1, RunMode::OneShot)
            .run(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::Authentication { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn daemon_retries_after_failure_and_stops_on_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            daemon(&calls, 2, RunMode::Daemon).run(shutdown_after(Duration::from_millis(300))),
        )
        .await
        .expect("daemon did not stop on shutdown");

        assert!(outcome.is_ok());
        // two failures retried, then one success followed by a day-long idle
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn shutdown_while_idle_does_not_start_another_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        daemon(&calls, 0, RunMode::Daemon)
            .run(shutdown_after(Duration::from_millis(50)))
            .await
            .expect("daemon stops cleanly");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn daemon_wakes_before_the_earliest_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let daemon = Daemon::new(
            CountingRunner {
                calls: calls.clone(),
                failures: 0,
                expires_in: TimeDelta::seconds(3600),
            },
            policy(),
            RunMode::Daemon,
            RetrySettings::default(),
        );

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            daemon
                .run(async move {
                    let _ = rx.await;
                })
                .await
        });

        // expiry 3600s, advance 600s: next cycle due at ~3000s
        sleep(Duration::from_secs(2990)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "woke before the scheduled refresh");

        sleep(Duration::from_secs(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "did not wake for the scheduled refresh");

        let _ = tx.send(());
        handle
            .await
            .expect("daemon task")
            .expect("daemon stops cleanly");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
