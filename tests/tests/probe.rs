mod utils;
use utils::*;

use loadprobe::prelude::*;
use mock_service::{MockBehavior, StatusCode};
use reqwest::Client;
use std::time::Duration;

fn prober(timeout: Duration) -> Prober {
    Prober::new(Client::new(), "/health", timeout)
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn first_healthy_candidate_wins() -> anyhow::Result<()> {
    init();

    let unhealthy = mock(MockBehavior {
        health_status: StatusCode::SERVICE_UNAVAILABLE,
        ..Default::default()
    })
    .await?;
    let healthy = mock(MockBehavior::default()).await?;
    let also_healthy = mock(MockBehavior::default()).await?;

    let candidates = vec![
        format!("http://{}", dead_addr()?),
        unhealthy.base_url(),
        healthy.base_url(),
        also_healthy.base_url(),
    ];

    let target = prober(Duration::from_secs(2)).probe(&candidates).await?;
    assert_eq!(target, healthy.base_url());

    Ok(())
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn only_middle_candidate_answers() -> anyhow::Result<()> {
    init();

    let b = mock(MockBehavior::default()).await?;
    let candidates = vec![
        format!("http://{}", dead_addr()?),
        format!("{}/", b.base_url()),
        format!("http://{}", dead_addr()?),
    ];

    let target = prober(Duration::from_secs(2)).probe(&candidates).await?;
    assert_eq!(target, b.base_url());

    Ok(())
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn timeout_signals_probe_failed() -> anyhow::Result<()> {
    init();

    let slow = mock(MockBehavior {
        health_delay: Some(Duration::from_secs(3)),
        ..Default::default()
    })
    .await?;

    let res = prober(Duration::from_millis(200))
        .probe(&[slow.base_url()])
        .await;
    assert!(matches!(res, Err(ProbeError::ProbeFailed { tried: 1 })));

    Ok(())
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn survey_reports_every_candidate() -> anyhow::Result<()> {
    init();

    let unhealthy = mock(MockBehavior {
        health_status: StatusCode::INTERNAL_SERVER_ERROR,
        ..Default::default()
    })
    .await?;
    let healthy = mock(MockBehavior::default()).await?;
    let candidates = vec![
        format!("http://{}", dead_addr()?),
        unhealthy.base_url(),
        healthy.base_url(),
    ];

    let survey = prober(Duration::from_secs(2)).survey(&candidates).await;
    assert_eq!(survey.attempts.len(), 3);

    assert_eq!(survey.attempts[0].status, None);
    assert!(survey.attempts[0].error.is_some());
    assert_eq!(survey.attempts[1].status, Some(500));
    assert_eq!(survey.attempts[2].status, Some(200));
    assert!(survey.attempts[2].body.as_deref().unwrap().contains("ok"));

    assert_eq!(survey.recommended(), Some(healthy.base_url().as_str()));
    assert!(survey.to_string().contains("Use this base URL"));

    Ok(())
}
