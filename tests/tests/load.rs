mod utils;
use utils::*;

use loadprobe::prelude::*;
use mock_service::{MockBehavior, StatusCode};
use reqwest::Client;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config(base_url: String) -> RunConfig {
    RunConfig::new([base_url])
        .requests(100)
        .workers(NonZeroUsize::new(5).unwrap())
        .request_timeout(Duration::from_secs(5))
        .probe_timeout(Duration::from_secs(2))
        .cleanup_timeout(Duration::from_secs(2))
}

/// Every 20th creation hangs past the request timeout.
fn flaky() -> MockBehavior {
    MockBehavior {
        slow_create_every: Some(20),
        slow_create_delay: Duration::from_secs(2),
        ..Default::default()
    }
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn bulk_with_timeouts() -> anyhow::Result<()> {
    init();

    let server = mock(flaky()).await?;
    let driver = RequestDriver::new(Client::new(), &server.base_url(), Duration::from_millis(300));
    let harness = Harness::new(Arc::new(driver), NonZeroUsize::new(5).unwrap(), 20);
    let mut created = CreatedResources::default();

    let jobs = harness.plan(Scenario::Create, 100, None);
    let started = Instant::now();
    let outcomes = harness.run_bulk(jobs, &mut created).await;
    let summary = RunSummary::aggregate("CREATE USERS", &outcomes, started, Instant::now());

    assert_eq!(summary.success_count, 95);
    assert_eq!(summary.failure_count, 5);
    assert_eq!(created.len(), 95);
    assert_eq!(summary.errors.values().sum::<usize>(), 5);
    assert!(summary.errors.keys().all(|k| k.status_code == 0));

    let expected = 95. / summary.total_duration.as_secs_f64();
    assert!((summary.throughput - expected).abs() < 1e-6);

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn full_run_cleans_up() -> anyhow::Result<()> {
    init();

    let server = mock(flaky()).await?;
    let config = config(server.base_url()).request_timeout(Duration::from_millis(300));

    let report = LoadProbe::new(config).run().await?;

    assert_eq!(report.target, server.base_url());
    assert!(report.canary.success);
    assert_eq!(report.summary.test_name, "CREATE USERS");
    assert_eq!(report.summary.total(), 100);
    assert_eq!(report.summary.success_count, 95);
    assert_eq!(report.summary.failure_count, 5);
    assert!(report.summary.latency.is_some());

    // The canary's record plus every confirmed bulk creation.
    assert_eq!(report.cleanup.attempted, 96);
    assert_eq!(report.cleanup.deleted, 96);
    assert_eq!(server.state.create_calls(), 101);

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn canary_failure_skips_bulk() -> anyhow::Result<()> {
    init();

    let server = mock(MockBehavior {
        create_status: Some(StatusCode::INTERNAL_SERVER_ERROR),
        ..Default::default()
    })
    .await?;

    let res = LoadProbe::new(config(server.base_url())).run().await;

    match res {
        Err(RunError::CanaryFailed { outcome, cleanup }) => {
            assert_eq!(outcome.status_code, 500);
            assert!(cleanup.is_empty());
            assert_eq!(cleanup.to_string(), "Cleanup: nothing to clean");
        }
        other => panic!("expected a canary failure, got {other:?}"),
    }
    assert_eq!(server.state.create_calls(), 1);
    assert_eq!(server.state.delete_calls(), 0);

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn missing_id_fails_canary() -> anyhow::Result<()> {
    init();

    let server = mock(MockBehavior {
        omit_id: true,
        ..Default::default()
    })
    .await?;

    let res = LoadProbe::new(config(server.base_url())).run().await;
    assert!(matches!(res, Err(RunError::CanaryFailed { .. })));
    assert_eq!(server.state.create_calls(), 1);

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn unreachable_target() -> anyhow::Result<()> {
    init();

    let config =
        config(format!("http://{}", dead_addr()?)).probe_timeout(Duration::from_millis(500));
    let res = LoadProbe::new(config).run().await;
    assert!(matches!(
        res,
        Err(RunError::Probe(ProbeError::ProbeFailed { tried: 1 }))
    ));

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn list_and_read_scenarios() -> anyhow::Result<()> {
    init();

    let server = mock(MockBehavior::default()).await?;

    let report = LoadProbe::new(config(server.base_url()).scenario(Scenario::List).requests(30))
        .run()
        .await?;
    assert_eq!(report.summary.success_count, 30);
    assert!(report.cleanup.is_empty());

    let report = LoadProbe::new(config(server.base_url()).scenario(Scenario::Read).requests(30))
        .run()
        .await?;
    assert_eq!(report.summary.success_count, 30);
    assert_eq!(report.summary.test_name, "READ USER");
    assert_eq!(report.cleanup.deleted, 1);
    assert_eq!(server.state.user_count(), 0);

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn cleanup_twice_is_safe() -> anyhow::Result<()> {
    init();

    let server = mock(MockBehavior::default()).await?;
    let driver = Arc::new(RequestDriver::new(
        Client::new(),
        &server.base_url(),
        Duration::from_secs(2),
    ));
    let harness = Harness::new(driver.clone(), NonZeroUsize::new(4).unwrap(), 0);
    let mut created = CreatedResources::default();

    let jobs = harness.plan(Scenario::Create, 12, None);
    harness.run_bulk(jobs, &mut created).await;
    assert_eq!(created.len(), 12);

    let cleanup = CleanupDriver::new(driver, Duration::from_secs(2));
    let first = cleanup.run(created.ids()).await;
    let second = cleanup.run(created.ids()).await;

    assert_eq!(first.deleted, 12);
    assert!(second.deleted <= first.deleted);
    assert_eq!(second.deleted, 0);
    assert_eq!(server.state.user_count(), 0);

    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn interrupt_still_cleans_up() -> anyhow::Result<()> {
    init();

    // Every other creation hangs, so the burst is still running when the
    // interrupt fires.
    let server = mock(MockBehavior {
        slow_create_every: Some(2),
        slow_create_delay: Duration::from_secs(3),
        ..Default::default()
    })
    .await?;
    let config = config(server.base_url())
        .requests(200)
        .workers(NonZeroUsize::new(2).unwrap());

    let res = LoadProbe::new(config)
        .run_until(tokio::time::sleep(Duration::from_millis(500)))
        .await;

    match res {
        Err(RunError::Interrupted { cleanup }) => {
            // At least the canary's record was confirmed before the interrupt.
            assert!(cleanup.attempted >= 1);
            assert_eq!(cleanup.deleted, cleanup.attempted);
        }
        other => panic!("expected an interrupted run, got {other:?}"),
    }
    assert!(server.state.create_calls() < 201);

    Ok(())
}
