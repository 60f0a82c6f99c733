// Authentication types

use serde::Deserialize;

/// Client-credential set for the directory application registration
#[derive(Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Build credentials only when every field is present and non-blank
    pub fn from_parts(
        tenant_id: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Some(Self {
            tenant_id: present(tenant_id)?,
            client_id: present(client_id)?,
            client_secret: present(client_secret)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Token endpoint response for the client-credential grant
#[derive(Deserialize)]
pub struct ClientCredentialResponse {
    pub access_token: String,
    pub expires_in: Option<u64>,
}
