//! Retry budget, retryable failures and cancellation precedence.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use tokio_util::sync::CancellationToken;

use fetchwizard::config::FetchConfig;
use fetchwizard::http::{Client, FetchOptions, ParsedResponse};

mod common;
use common::{ScriptedFetch, Step};

const URL: &str = "http://backend.test/resource";

fn fast() -> FetchOptions {
    FetchOptions::new().retry_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_retry_three_makes_four_attempts() {
    let fetch = ScriptedFetch::always(Step::NetworkError);
    let client = Client::with_fetch(fetch.clone());

    let err = client.execute(URL, fast().retry(3)).await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(fetch.attempts(), 4);
    assert_eq!(err.request(), URL);
}

#[tokio::test]
async fn test_recovers_after_network_errors() {
    let fetch = ScriptedFetch::new(vec![
        Step::NetworkError,
        Step::NetworkError,
        Step::Status(200, "recovered"),
    ]);
    let client = Client::with_fetch(fetch.clone());

    let data = client.execute(URL, fast().retry(3)).await.unwrap();

    assert_eq!(data, ParsedResponse::Text("recovered".to_string()));
    assert_eq!(fetch.attempts(), 3);
}

#[tokio::test]
async fn test_http_errors_not_retried_by_default() {
    let fetch = ScriptedFetch::always(Step::Status(503, "busy"));
    let client = Client::with_fetch(fetch.clone());

    let err = client.execute(URL, fast().retry(3)).await.unwrap_err();

    assert!(err.is_http());
    assert_eq!(err.data(), Some(&serde_json::json!("busy")));
    assert_eq!(fetch.attempts(), 1);
}

#[tokio::test]
async fn test_configured_status_codes_are_retried() {
    let fetch = ScriptedFetch::always(Step::Status(503, ""));
    let client = Client::with_fetch(fetch.clone());

    let err = client
        .execute(
            URL,
            fast().retry(3).retry_status_codes([StatusCode::SERVICE_UNAVAILABLE]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(fetch.attempts(), 4);
}

#[tokio::test]
async fn test_status_codes_from_config() {
    let fetch = ScriptedFetch::new(vec![Step::Status(502, ""), Step::Status(200, "{\"ok\":true}")]);
    let mut config = FetchConfig::default();
    config.retries.count = Some(2);
    config.retries.base_delay_ms = 0;
    config.retries.status_codes = vec![502];
    let client = Client::new(fetch.clone(), &config).unwrap();

    let data = client.execute(URL, FetchOptions::new()).await.unwrap();

    assert_eq!(data, ParsedResponse::Json(serde_json::json!({ "ok": true })));
    assert_eq!(fetch.attempts(), 2);
}

#[tokio::test]
async fn test_default_budget_depends_on_method() {
    let fetch = ScriptedFetch::always(Step::NetworkError);
    let client = Client::with_fetch(fetch.clone());
    client.execute(URL, fast()).await.unwrap_err();
    assert_eq!(fetch.attempts(), 2);

    let fetch = ScriptedFetch::always(Step::NetworkError);
    let client = Client::with_fetch(fetch.clone());
    client
        .execute(URL, fast().method(Method::POST).body("payload"))
        .await
        .unwrap_err();
    assert_eq!(fetch.attempts(), 1);
}

#[tokio::test]
async fn test_cancel_before_first_attempt() {
    let fetch = ScriptedFetch::always(Step::Status(200, "ok"));
    let client = Client::with_fetch(fetch.clone());
    let signal = CancellationToken::new();
    signal.cancel();

    let err = client.execute(URL, fast().retry(3).signal(signal)).await.unwrap_err();

    assert!(err.is_abort());
    assert_eq!(fetch.attempts(), 0);
}

#[tokio::test]
async fn test_cancel_during_attempt_stops_retries() {
    let fetch = ScriptedFetch::always(Step::Hang);
    let client = Client::with_fetch(fetch.clone());
    let signal = CancellationToken::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .execute(URL, fast().retry(3).timeout(Duration::from_secs(10)).signal(signal))
        .await
        .unwrap_err();

    assert!(err.is_abort());
    assert_eq!(fetch.attempts(), 1);
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let fetch = ScriptedFetch::always(Step::NetworkError);
    let client = Client::with_fetch(fetch.clone());
    let signal = CancellationToken::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .execute(
            URL,
            FetchOptions::new()
                .retry(3)
                .retry_delay(Duration::from_secs(10))
                .signal(signal),
        )
        .await
        .unwrap_err();

    assert!(err.is_abort());
    assert_eq!(fetch.attempts(), 1);
}

#[tokio::test]
async fn test_timeouts_are_retried_per_attempt() {
    let fetch = ScriptedFetch::new(vec![Step::Hang, Step::Status(200, "done")]);
    let client = Client::with_fetch(fetch.clone());

    let data = client
        .execute(URL, fast().retry(1).timeout(Duration::from_millis(30)))
        .await
        .unwrap();

    assert_eq!(data, ParsedResponse::Text("done".to_string()));
    assert_eq!(fetch.attempts(), 2);
}
