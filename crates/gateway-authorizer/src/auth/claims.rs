//! Token claims structure.
//!
//! Contains the claims extracted from verified bearer tokens. The `sub` field
//! is redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which caller shape a token's group membership came from: the
/// `groups-custom` or the `groups-custom-m2m` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupClaim {
    Interactive,
    MachineToMachine,
}

impl GroupClaim {
    /// Recognized shapes in lookup order.
    pub const ALL: [GroupClaim; 2] = [GroupClaim::Interactive, GroupClaim::MachineToMachine];
}

/// Claims of a verified bearer token.
///
/// Immutable once parsed and discarded after the decision is made.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (caller identity) - redacted in Debug output.
    pub sub: String,

    /// Issuer URL.
    pub iss: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Authorized party: the client that obtained the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Group paths for interactive callers, e.g. `/admins`.
    #[serde(
        default,
        rename = "groups-custom",
        skip_serializing_if = "Option::is_none"
    )]
    pub groups: Option<Vec<String>>,

    /// Group paths for machine-to-machine callers.
    #[serde(
        default,
        rename = "groups-custom-m2m",
        skip_serializing_if = "Option::is_none"
    )]
    pub m2m_groups: Option<Vec<String>>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("azp", &self.azp)
            .field("groups", &self.groups)
            .field("m2m_groups", &self.m2m_groups)
            .finish()
    }
}

impl TokenClaims {
    fn claim(&self, source: GroupClaim) -> &[String] {
        let groups = match source {
            GroupClaim::Interactive => &self.groups,
            GroupClaim::MachineToMachine => &self.m2m_groups,
        };
        groups.as_deref().unwrap_or(&[])
    }

    /// The first non-empty group claim and the shape it came from.
    ///
    /// The two shapes are never merged.
    pub fn group_claim(&self) -> Option<(GroupClaim, &[String])> {
        GroupClaim::ALL
            .into_iter()
            .map(|source| (source, self.claim(source)))
            .find(|(_, groups)| !groups.is_empty())
    }

    /// Group memberships used for access decisions.
    pub fn groups(&self) -> &[String] {
        self.group_claim().map(|(_, groups)| groups).unwrap_or(&[])
    }

    /// Check membership of a fully qualified group path such as `/admins`.
    pub fn is_member_of(&self, group_path: &str) -> bool {
        self.groups().iter().any(|g| g == group_path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims(groups: Option<Vec<&str>>, m2m_groups: Option<Vec<&str>>) -> TokenClaims {
        let owned = |v: Vec<&str>| -> Vec<String> { v.into_iter().map(String::from).collect() };
        TokenClaims {
            sub: "user-123".to_string(),
            iss: "https://idp.example.com/realms/master".to_string(),
            exp: 1_900_000_000,
            azp: Some("web-app".to_string()),
            groups: groups.map(owned),
            m2m_groups: m2m_groups.map(owned),
        }
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug_str = format!("{:?}", claims(None, None));

        assert!(
            !debug_str.contains("user-123"),
            "Debug output should not contain actual sub value"
        );
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_interactive_groups_preferred() {
        let c = claims(Some(vec!["/admins"]), Some(vec!["/robots"]));

        let (source, groups) = c.group_claim().unwrap();
        assert_eq!(source, GroupClaim::Interactive);
        assert_eq!(groups.to_vec(), vec!["/admins".to_string()]);
        assert!(!c.is_member_of("/robots"), "claims must not be merged");
    }

    #[test]
    fn test_m2m_groups_used_when_interactive_empty() {
        let c = claims(Some(vec![]), Some(vec!["/robots"]));

        let (source, _) = c.group_claim().unwrap();
        assert_eq!(source, GroupClaim::MachineToMachine);
        assert!(c.is_member_of("/robots"));
    }

    #[test]
    fn test_m2m_groups_used_when_interactive_absent() {
        let c = claims(None, Some(vec!["/robots"]));
        assert!(c.is_member_of("/robots"));
    }

    #[test]
    fn test_no_groups() {
        let c = claims(None, None);
        assert!(c.group_claim().is_none());
        assert!(c.groups().is_empty());
        assert!(!c.is_member_of("/admins"));
    }

    #[test]
    fn test_membership_is_exact() {
        let c = claims(Some(vec!["/admins"]), None);
        assert!(c.is_member_of("/admins"));
        assert!(!c.is_member_of("admins"));
        assert!(!c.is_member_of("/admin"));
    }

    #[test]
    fn test_deserialize_keycloak_claim_names() {
        let json = r#"{
            "sub": "svc",
            "iss": "https://idp.example.com/realms/master",
            "exp": 1900000000,
            "azp": "batch-runner",
            "groups-custom-m2m": ["/robots"],
            "scope": "profile email"
        }"#;

        let c: TokenClaims = serde_json::from_str(json).unwrap();
        assert_eq!(c.azp.as_deref(), Some("batch-runner"));
        assert!(c.groups.is_none());
        assert_eq!(c.m2m_groups, Some(vec!["/robots".to_string()]));
    }

    #[test]
    fn test_deserialize_null_groups() {
        let json = r#"{"sub":"u","iss":"i","exp":1,"groups-custom":null}"#;
        let c: TokenClaims = serde_json::from_str(json).unwrap();
        assert!(c.groups().is_empty());
        assert!(c.azp.is_none());
    }
}
