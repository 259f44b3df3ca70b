//! Verification key cache integration tests.
//!
//! The realm document must be fetched at most once per process, no matter how
//! many invocations race on a cold cache.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use authorizer_test_utils::{MockKeycloak, TestEventBuilder, TestKeypair, TestTokenBuilder};
use gateway_authorizer::config::Config;
use gateway_authorizer::models::AuthorizerEvent;
use gateway_authorizer::policy::Effect;
use gateway_authorizer::services::Authorizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

const RULES: &str = r#"{"/v1/jobs": [{"method": ["GET"], "group": ["ops"]}]}"#;

fn event(keypair: &TestKeypair, keycloak: &MockKeycloak) -> AuthorizerEvent {
    let token = keypair.sign(
        &TestTokenBuilder::new()
            .issued_by(&keycloak.issuer())
            .with_groups(&["/ops"])
            .build(),
    );
    serde_json::from_value(
        TestEventBuilder::new("GET", "/v1/jobs")
            .with_bearer(&token)
            .build(),
    )
    .unwrap()
}

fn authorizer(keycloak: &MockKeycloak) -> Arc<Authorizer> {
    let config = Config::from_vars(&keycloak.config_vars(Some(RULES))).unwrap();
    Arc::new(Authorizer::from_config(&config))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_start_fetches_once() {
    let keypair = TestKeypair::new(1);
    // Delay keeps every task waiting on the same in-flight fetch
    let keycloak = MockKeycloak::start_expecting(&keypair, 1, Duration::from_millis(200)).await;
    let authorizer = authorizer(&keycloak);
    let event = Arc::new(event(&keypair, &keycloak));

    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let authorizer = Arc::clone(&authorizer);
        let event = Arc::clone(&event);
        tasks.spawn(async move { authorizer.authorize(&event).await });
    }

    while let Some(result) = tasks.join_next().await {
        let decision = result.unwrap().unwrap();
        assert_eq!(decision.effect(), Some(Effect::Allow));
    }

    assert!(authorizer.key_cache().is_cached());
    assert_eq!(keycloak.fetch_count().await, 1);
}

#[tokio::test]
async fn test_warm_cache_does_no_network_io() {
    let keypair = TestKeypair::new(1);
    let keycloak = MockKeycloak::start_expecting(&keypair, 1, Duration::ZERO).await;
    let authorizer = authorizer(&keycloak);
    let event = event(&keypair, &keycloak);

    for _ in 0..5 {
        let decision = authorizer.authorize(&event).await.unwrap();
        assert_eq!(decision.effect(), Some(Effect::Allow));
    }

    assert_eq!(keycloak.fetch_count().await, 1);
}

#[tokio::test]
async fn test_requests_without_token_never_fetch() {
    let keypair = TestKeypair::new(1);
    let keycloak = MockKeycloak::start_expecting(&keypair, 0, Duration::ZERO).await;
    let authorizer = authorizer(&keycloak);

    let event: AuthorizerEvent =
        serde_json::from_value(TestEventBuilder::new("GET", "/v1/jobs").build()).unwrap();
    let decision = authorizer.authorize(&event).await.unwrap();

    assert_eq!(decision.effect(), Some(Effect::Deny));
    assert!(!authorizer.key_cache().is_cached());
}

#[tokio::test]
async fn test_failed_fetch_surfaces_and_is_retried_next_call() {
    let keycloak = MockKeycloak::start_failing(500).await;
    let keypair = TestKeypair::new(1);
    let authorizer = authorizer(&keycloak);
    let event = event(&keypair, &keycloak);

    assert!(authorizer.authorize(&event).await.is_err());
    assert!(authorizer.authorize(&event).await.is_err());

    assert!(!authorizer.key_cache().is_cached());
    // One attempt per invocation, no in-call retries
    assert_eq!(keycloak.fetch_count().await, 2);
}
