use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// How much a caller is trusted. Ordered from least to most trusted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    #[default]
    Untrusted,
    Trusted,
    Admin,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Untrusted => "untrusted",
            TrustLevel::Trusted => "trusted",
            TrustLevel::Admin => "admin",
        }
    }

    /// Whether this level is `required` or higher.
    pub fn is_at_least(&self, required: TrustLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    #[serde(default)]
    pub trust: TrustLevel,
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::anonymous_with_trust(TrustLevel::Untrusted)
    }

    pub fn anonymous_with_trust(trust: TrustLevel) -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            trust,
            claims: HashMap::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.trust == TrustLevel::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous();
        assert_eq!(identity.user_id, "anonymous");
        assert_eq!(identity.method, "none");
        assert_eq!(identity.trust, TrustLevel::Untrusted);
        assert!(identity.claims.is_empty());
    }

    #[test]
    fn test_trust_ordering() {
        assert!(TrustLevel::Admin > TrustLevel::Trusted);
        assert!(TrustLevel::Trusted > TrustLevel::Untrusted);
        assert!(TrustLevel::Admin.is_at_least(TrustLevel::Trusted));
        assert!(TrustLevel::Trusted.is_at_least(TrustLevel::Trusted));
        assert!(!TrustLevel::Untrusted.is_at_least(TrustLevel::Trusted));
    }

    #[test]
    fn test_trust_serialization() {
        assert_eq!(
            serde_json::to_string(&TrustLevel::Admin).unwrap(),
            "\"admin\""
        );
        let parsed: TrustLevel = serde_json::from_str("\"trusted\"").unwrap();
        assert_eq!(parsed, TrustLevel::Trusted);
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            user_id: "user123".to_string(),
            method: "api_key".to_string(),
            trust: TrustLevel::Trusted,
            claims: {
                let mut map = HashMap::new();
                map.insert("email".to_string(), serde_json::json!("user@example.com"));
                map
            },
        };

        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.user_id, "user123");
        assert_eq!(deserialized.trust, TrustLevel::Trusted);
        assert_eq!(
            deserialized.claims.get("email"),
            Some(&serde_json::json!("user@example.com"))
        );
    }
}
