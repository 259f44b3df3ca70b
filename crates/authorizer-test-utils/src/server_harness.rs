//! Test server harness for E2E testing
//!
//! Provides `MockKeycloak`, a realm document endpoint serving a test key, and
//! `TestAuthorizerServer` for spawning real authorizer instances in tests.

use crate::crypto_fixtures::RealmKey;
use gateway_authorizer::config::Config;
use gateway_authorizer::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Realm served by `MockKeycloak`.
pub const TEST_REALM: &str = "test";

/// Interactive client id configured by `TestAuthorizerServer`.
pub const TEST_CLIENT_ID: &str = "web-app";

/// Machine-to-machine client id configured by `TestAuthorizerServer`.
pub const TEST_M2M_CLIENT_ID: &str = "batch-runner";

/// Mock identity provider serving `GET /realms/{realm}`.
pub struct MockKeycloak {
    server: MockServer,
}

impl MockKeycloak {
    /// Serve `key`'s public key, any number of fetches.
    pub async fn start(key: &impl RealmKey) -> Self {
        Self::start_with(key, None, Duration::ZERO).await
    }

    /// Serve `key`'s public key and verify on drop that exactly
    /// `fetches` requests arrived. Each response is delayed by `delay`.
    pub async fn start_expecting(key: &impl RealmKey, fetches: u64, delay: Duration) -> Self {
        Self::start_with(key, Some(fetches), delay).await
    }

    /// Realm endpoint answering with `status` and no key.
    pub async fn start_failing(status: u16) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/realms/{}", TEST_REALM)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        Self { server }
    }

    async fn start_with(key: &impl RealmKey, fetches: Option<u64>, delay: Duration) -> Self {
        let server = MockServer::start().await;

        let realm_document = serde_json::json!({
            "realm": TEST_REALM,
            "public_key": key.realm_public_key(),
            "token-service": format!("{}/realms/{}/protocol/openid-connect", server.uri(), TEST_REALM),
            "account-service": format!("{}/realms/{}/account", server.uri(), TEST_REALM),
            "tokens-not-before": 0
        });

        let mock = Mock::given(method("GET"))
            .and(path(format!("/realms/{}", TEST_REALM)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(realm_document)
                    .set_delay(delay),
            );

        let mock = match fetches {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(&server).await;

        Self { server }
    }

    /// Base URL, the value of `KEYCLOAK_URL`.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Issuer tokens must carry to pass verification.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.server.uri(), TEST_REALM)
    }

    /// Environment for a `Config` pointing at this realm.
    pub fn config_vars(&self, rules: Option<&str>) -> HashMap<String, String> {
        let mut vars = HashMap::from([
            ("KEYCLOAK_URL".to_string(), self.url()),
            ("KEYCLOAK_REALM".to_string(), TEST_REALM.to_string()),
            ("KEYCLOAK_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
            (
                "M2M_KEYCLOAK_CLIENT_ID".to_string(),
                TEST_M2M_CLIENT_ID.to_string(),
            ),
            ("KEY_FETCH_TIMEOUT_SECONDS".to_string(), "5".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        if let Some(rules) = rules {
            vars.insert("GROUP_ROLE_CONFIG".to_string(), rules.to_string());
        }
        vars
    }

    /// Requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Test harness for spawning the gateway authorizer in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let keycloak = MockKeycloak::start(&TestKeypair::new(1)).await;
///     let server = TestAuthorizerServer::spawn(&keycloak, None).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthorizerServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestAuthorizerServer {
    /// Spawn a server whose identity provider is `keycloak`.
    pub async fn spawn(keycloak: &MockKeycloak, rules: Option<&str>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(&keycloak.config_vars(rules)).await
    }

    /// Spawn a server from raw environment variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(vars: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config));

        // A non-installed recorder: tests in one process must not fight over
        // the global one
        let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();

        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared state, for inspecting caches.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestAuthorizerServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::{TestKeypair, TestRsaKeypair};

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let keycloak = MockKeycloak::start(&TestKeypair::new(1)).await;
        let server = TestAuthorizerServer::spawn(&keycloak, None).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.addr().port() > 0);

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_mock_keycloak_serves_realm_document() -> Result<(), anyhow::Error> {
        let keypair = TestKeypair::new(1);
        let keycloak = MockKeycloak::start(&keypair).await;

        let body: serde_json::Value = reqwest::get(keycloak.issuer()).await?.json().await?;
        assert_eq!(body["public_key"], keypair.public_key_b64());
        assert_eq!(keycloak.fetch_count().await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_mock_keycloak_serves_rsa_key() -> Result<(), anyhow::Error> {
        let keypair = TestRsaKeypair::new();
        let keycloak = MockKeycloak::start(&keypair).await;

        let body: serde_json::Value = reqwest::get(keycloak.issuer()).await?.json().await?;
        assert_eq!(body["public_key"], keypair.public_key_b64());

        Ok(())
    }

    #[tokio::test]
    async fn test_failing_keycloak() -> Result<(), anyhow::Error> {
        let keycloak = MockKeycloak::start_failing(503).await;
        let response = reqwest::get(keycloak.issuer()).await?;
        assert_eq!(response.status(), 503);
        Ok(())
    }
}
