use time::{Duration, OffsetDateTime};

use crate::auth::TokenResponse;
use crate::config::{Environment, VendorConfig};

/// Access tokens are refreshed this long before their stated expiry so a
/// call issued at the boundary cannot race an expiring token.
pub const TOKEN_REFRESH_LEEWAY: Duration = Duration::seconds(30);

/// Per-vendor authentication state.
///
/// Created at client construction; the token fields are mutated only by the
/// authenticate/refresh/disconnect routines, always under the client's
/// session mutex, so state transitions are totally ordered per session.
#[derive(Debug, Clone)]
pub struct VendorSession {
    pub client_id: String,
    pub client_secret: String,
    pub environment: Environment,
    pub base_url: String,
    pub scopes: Vec<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expiry: Option<OffsetDateTime>,
}

impl VendorSession {
    pub fn from_config(config: &VendorConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            environment: config.environment,
            base_url: config.base_url.clone(),
            scopes: config.scopes.clone(),
            access_token: None,
            refresh_token: None,
            token_expiry: None,
        }
    }

    /// Store a freshly acquired token. A grant that returns no new refresh
    /// token keeps the existing one.
    pub fn apply_token(&mut self, token: TokenResponse) {
        self.token_expiry =
            Some(OffsetDateTime::now_utc() + Duration::seconds(token.expires_in as i64));
        self.access_token = Some(token.access_token);
        if token.refresh_token.is_some() {
            self.refresh_token = token.refresh_token;
        }
    }

    /// Drop all token state, returning the session to unauthenticated.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.token_expiry = None;
    }

    /// Whether the access token can still be used, allowing for `leeway`
    /// before the stated expiry. A token without a recorded expiry counts
    /// as invalid.
    pub fn token_valid(&self, leeway: Duration) -> bool {
        match (&self.access_token, self.token_expiry) {
            (Some(_), Some(expiry)) => OffsetDateTime::now_utc() + leeway < expiry,
            _ => false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token_valid(Duration::ZERO)
    }
}
