//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating identity provider style claims and
//! gateway authorizer events.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer used when a test does not set one.
pub const DEFAULT_TEST_ISSUER: &str = "https://idp.example.com/realms/master";

/// Authorized party used when a test does not set one.
pub const DEFAULT_TEST_CLIENT: &str = "web-app";

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_groups(&["/admins"])
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    iss: String,
    azp: Option<String>,
    groups: Option<Vec<String>>,
    m2m_groups: Option<Vec<String>>,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            iss: DEFAULT_TEST_ISSUER.to_string(),
            azp: Some(DEFAULT_TEST_CLIENT.to_string()),
            groups: None,
            m2m_groups: None,
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the subject (user/service)
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set the authorized party (`azp`)
    pub fn for_client(mut self, client_id: &str) -> Self {
        self.azp = Some(client_id.to_string());
        self
    }

    /// Drop the `azp` claim entirely
    pub fn without_client(mut self) -> Self {
        self.azp = None;
        self
    }

    /// Set the interactive group claim (`groups-custom`)
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = Some(groups.iter().map(|g| g.to_string()).collect());
        self
    }

    /// Set the machine-to-machine group claim (`groups-custom-m2m`)
    pub fn with_m2m_groups(mut self, groups: &[&str]) -> Self {
        self.m2m_groups = Some(groups.iter().map(|g| g.to_string()).collect());
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("typ".to_string(), json!("Bearer"));

        if let Some(azp) = self.azp {
            claims.insert("azp".to_string(), json!(azp));
        }
        if let Some(groups) = self.groups {
            claims.insert("groups-custom".to_string(), json!(groups));
        }
        if let Some(groups) = self.m2m_groups {
            claims.insert("groups-custom-m2m".to_string(), json!(groups));
        }

        Value::Object(claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for gateway request-authorizer events
///
/// # Example
/// ```rust,ignore
/// let event = TestEventBuilder::new("GET", "/v1/jobs/42")
///     .with_resource("/v1/jobs/{id}")
///     .with_bearer(&token)
///     .build();
/// ```
pub struct TestEventBuilder {
    method: String,
    path: String,
    resource: String,
    headers: Option<Map<String, Value>>,
}

impl TestEventBuilder {
    /// Event for `method` on `path`; the resource template defaults to the path.
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            resource: path.to_string(),
            headers: Some(Map::new()),
        }
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = resource.to_string();
        self
    }

    /// Add `Authorization: Bearer <token>`
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), json!(value));
        self
    }

    /// Send `"headers": null`
    pub fn without_headers(mut self) -> Self {
        self.headers = None;
        self
    }

    /// ARN the gateway would send for this request.
    pub fn method_arn(&self) -> String {
        format!(
            "arn:aws:execute-api:eu-west-1:123456789012:testapi/prod/{}{}",
            self.method, self.path
        )
    }

    /// Build the event as a JSON value
    pub fn build(self) -> Value {
        let method_arn = self.method_arn();
        json!({
            "type": "REQUEST",
            "methodArn": method_arn,
            "resource": self.resource,
            "path": self.path,
            "httpMethod": self.method,
            "headers": self.headers.map(Value::Object).unwrap_or(Value::Null),
        })
    }
}
