use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::retry::RetryPolicy;

/// Which vendor deployment the client talks to. Production forbids the
/// client-credentials re-authentication fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(ClientError::config(format!(
                "unknown environment '{other}' (expected sandbox or production)"
            ))),
        }
    }
}

/// Static configuration for one vendor integration.
///
/// Credentials and endpoints come from the environment in deployments
/// (`from_env`) or from the `with_*` builders in tests and embedded use.
/// `extension_namespace` scopes which vendor `extension` URLs survive
/// payload mapping; it defaults to the base URL.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub vendor: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub base_url: String,
    pub environment: Environment,
    pub scopes: Vec<String>,
    pub extension_namespace: String,
    pub timeout: Duration,
    pub max_requests: usize,
    pub rate_limit_window: Duration,
    pub retry: RetryPolicy,
}

impl VendorConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            vendor: "generic".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: String::new(),
            extension_namespace: base_url.clone(),
            base_url,
            environment: Environment::Sandbox,
            scopes: vec!["patient/*.read".to_string()],
            timeout: Duration::from_secs(30),
            max_requests: 10,
            rate_limit_window: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }

    /// Read configuration from `CAREBRIDGE_*` environment variables.
    /// `CLIENT_ID`, `CLIENT_SECRET` and `BASE_URL` are required; the rest
    /// fall back to the programmatic defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| {
                ClientError::config(format!("missing required environment variable {key}"))
            })
        };
        let client_id = require("CAREBRIDGE_CLIENT_ID")?;
        let client_secret = require("CAREBRIDGE_CLIENT_SECRET")?;
        let base_url = require("CAREBRIDGE_BASE_URL")?;

        let mut config = Self::new(client_id, client_secret, base_url);
        if let Some(vendor) = lookup("CAREBRIDGE_VENDOR") {
            config.vendor = vendor;
        }
        if let Some(redirect_uri) = lookup("CAREBRIDGE_REDIRECT_URI") {
            config.redirect_uri = redirect_uri;
        }
        if let Some(environment) = lookup("CAREBRIDGE_ENVIRONMENT") {
            config.environment = environment.parse()?;
        }
        if let Some(scopes) = lookup("CAREBRIDGE_SCOPES") {
            config.scopes = scopes
                .split_whitespace()
                .map(|scope| scope.to_string())
                .collect();
        }
        if let Some(namespace) = lookup("CAREBRIDGE_EXTENSION_NAMESPACE") {
            config.extension_namespace = namespace;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_extension_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.extension_namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, max_requests: usize, window: Duration) -> Self {
        self.max_requests = max_requests;
        self.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// `{base_url}/oauth2/token`
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.base_url.trim_end_matches('/'))
    }

    /// `{base_url}/oauth2/authorize`
    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/authorize", self.base_url.trim_end_matches('/'))
    }
}
