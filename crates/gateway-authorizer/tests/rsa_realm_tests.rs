//! Decisions against a realm publishing an RSA key.
//!
//! Keycloak realms sign with RS256 by default and publish an RSA
//! `SubjectPublicKeyInfo` body, so this is the path production traffic takes.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use anyhow::Result;
use authorizer_test_utils::{
    MockKeycloak, TestAuthorizerServer, TestEventBuilder, TestKeypair, TestRsaKeypair,
    TestTokenBuilder, TEST_CLIENT_ID,
};
use jsonwebtoken::Algorithm;
use serde_json::Value;

const GROUP_MGMT_RULES: &str = r#"{"group-mgmt": [{"method": ["GET"], "group": ["admins"]}]}"#;

async fn decide(server: &TestAuthorizerServer, event: Value) -> Result<Value> {
    let response = reqwest::Client::new()
        .post(format!("{}/v1/authorize", server.url()))
        .json(&event)
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    Ok(response.json().await?)
}

fn claims(keycloak: &MockKeycloak, groups: &[&str]) -> Value {
    TestTokenBuilder::new()
        .for_user("alice")
        .issued_by(&keycloak.issuer())
        .for_client(TEST_CLIENT_ID)
        .with_groups(groups)
        .build()
}

fn group_mgmt_event(token: &str) -> Value {
    TestEventBuilder::new("GET", "/group-mgmt")
        .with_bearer(token)
        .build()
}

fn effect(decision: &Value) -> &str {
    decision["policyDocument"]["Statement"][0]["Effect"]
        .as_str()
        .unwrap()
}

#[tokio::test]
async fn test_rs256_group_member_allowed() -> Result<()> {
    let keypair = TestRsaKeypair::new();
    let keycloak = MockKeycloak::start(&keypair).await;
    let server = TestAuthorizerServer::spawn(&keycloak, Some(GROUP_MGMT_RULES)).await?;

    let token = keypair.sign(&claims(&keycloak, &["/admins"]));
    let decision = decide(&server, group_mgmt_event(&token)).await?;

    assert_eq!(effect(&decision), "Allow", "decision: {}", decision);
    assert_eq!(decision["principalId"], "alice");
    assert_eq!(decision["context"], serde_json::json!({}));
    assert!(server.state().authorizer.key_cache().is_cached());
    Ok(())
}

#[tokio::test]
async fn test_rs256_non_member_access_denied() -> Result<()> {
    let keypair = TestRsaKeypair::new();
    let keycloak = MockKeycloak::start(&keypair).await;
    let server = TestAuthorizerServer::spawn(&keycloak, Some(GROUP_MGMT_RULES)).await?;

    let token = keypair.sign(&claims(&keycloak, &["/viewers"]));
    let decision = decide(&server, group_mgmt_event(&token)).await?;

    assert_eq!(effect(&decision), "Deny");
    assert_eq!(decision["principalId"], "alice");
    assert_eq!(
        decision["context"],
        serde_json::json!({ "error": "Access denied" })
    );
    Ok(())
}

#[tokio::test]
async fn test_ps256_uses_same_rsa_key() -> Result<()> {
    let keypair = TestRsaKeypair::new();
    let keycloak = MockKeycloak::start(&keypair).await;
    let server = TestAuthorizerServer::spawn(&keycloak, Some(GROUP_MGMT_RULES)).await?;

    let token = keypair.sign_with(Algorithm::PS256, &claims(&keycloak, &["/admins"]));
    let decision = decide(&server, group_mgmt_event(&token)).await?;

    assert_eq!(effect(&decision), "Allow");
    Ok(())
}

#[tokio::test]
async fn test_eddsa_token_against_rsa_realm_is_invalid() -> Result<()> {
    let keycloak = MockKeycloak::start(&TestRsaKeypair::new()).await;
    let server = TestAuthorizerServer::spawn(&keycloak, Some(GROUP_MGMT_RULES)).await?;

    let token = TestKeypair::new(1).sign(&claims(&keycloak, &["/admins"]));
    let decision = decide(&server, group_mgmt_event(&token)).await?;

    assert_eq!(effect(&decision), "Deny");
    assert_eq!(decision["principalId"], "user");
    assert_eq!(decision["context"]["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn test_pinned_rs256_accepts_rsa_realm_tokens() -> Result<()> {
    let keypair = TestRsaKeypair::new();
    let keycloak = MockKeycloak::start(&keypair).await;
    let mut vars = keycloak.config_vars(Some(GROUP_MGMT_RULES));
    vars.insert("JWT_ALLOWED_ALGORITHMS".to_string(), "RS256".to_string());
    let server = TestAuthorizerServer::spawn_with_vars(&vars).await?;

    let rs256 = keypair.sign(&claims(&keycloak, &["/admins"]));
    assert_eq!(effect(&decide(&server, group_mgmt_event(&rs256)).await?), "Allow");

    let ps256 = keypair.sign_with(Algorithm::PS256, &claims(&keycloak, &["/admins"]));
    let decision = decide(&server, group_mgmt_event(&ps256)).await?;
    assert_eq!(decision["context"]["error"], "Invalid token");
    Ok(())
}
