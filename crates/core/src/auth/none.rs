use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity, TrustLevel};

/// Authenticator that accepts all requests as anonymous.
/// Must be explicitly configured - the system won't default to this.
pub struct NoneAuthenticator {
    trust: TrustLevel,
}

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self::with_trust(TrustLevel::Untrusted)
    }

    /// Every anonymous caller gets `trust`.
    pub fn with_trust(trust: TrustLevel) -> Self {
        Self { trust }
    }
}

impl Default for NoneAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous_with_trust(self.trust))
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
