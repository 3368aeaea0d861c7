use serde::Deserialize;
use url::Url;

use crate::config::VendorConfig;
use crate::error::{ClientError, Result};

/// Body of a successful token-endpoint response, any grant type.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// SMART-style launch context appended to the authorization URL. All fields
/// optional; extension pairs carry vendor-specific parameters such as tenant
/// or department.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    pub patient: Option<String>,
    pub encounter: Option<String>,
    pub practitioner: Option<String>,
    pub location: Option<String>,
    pub extensions: Vec<(String, String)>,
}

impl LaunchContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_patient(mut self, patient: impl Into<String>) -> Self {
        self.patient = Some(patient.into());
        self
    }

    #[must_use]
    pub fn with_encounter(mut self, encounter: impl Into<String>) -> Self {
        self.encounter = Some(encounter.into());
        self
    }

    #[must_use]
    pub fn with_practitioner(mut self, practitioner: impl Into<String>) -> Self {
        self.practitioner = Some(practitioner.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.push((key.into(), value.into()));
        self
    }

    fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        if let Some(patient) = &self.patient {
            pairs.push(("patient", patient.as_str()));
        }
        if let Some(encounter) = &self.encounter {
            pairs.push(("encounter", encounter.as_str()));
        }
        if let Some(practitioner) = &self.practitioner {
            pairs.push(("practitioner", practitioner.as_str()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.as_str()));
        }
        for (key, value) in &self.extensions {
            pairs.push((key.as_str(), value.as_str()));
        }
        pairs
    }
}

/// Build the user-facing authorization URL for the authorization-code grant,
/// including launch-context parameters when provided. `aud` names the
/// resource server the token will be used against.
pub fn authorization_url(
    config: &VendorConfig,
    state: &str,
    launch: Option<&LaunchContext>,
) -> Result<Url> {
    let mut url = Url::parse(&config.authorize_url())
        .map_err(|e| ClientError::config(format!("invalid base URL: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("scope", &config.scope_string())
            .append_pair("state", state)
            .append_pair("aud", &config.base_url);
        if let Some(launch) = launch {
            for (key, value) in launch.query_pairs() {
                query.append_pair(key, value);
            }
        }
    }
    Ok(url)
}

/// Form body for the authorization-code grant.
pub(crate) fn authorization_code_form(
    config: &VendorConfig,
    code: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "authorization_code".to_string()),
        ("code", code.to_string()),
        ("redirect_uri", config.redirect_uri.clone()),
        ("client_id", config.client_id.clone()),
        ("client_secret", config.client_secret.clone()),
    ]
}

/// Form body for the client-credentials grant.
pub(crate) fn client_credentials_form(config: &VendorConfig) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "client_credentials".to_string()),
        ("client_id", config.client_id.clone()),
        ("client_secret", config.client_secret.clone()),
        ("scope", config.scope_string()),
    ]
}

/// Form body for the refresh grant.
pub(crate) fn refresh_form(config: &VendorConfig, refresh_token: &str) -> Vec<(&'static str, String)> {
    vec![
        ("grant_type", "refresh_token".to_string()),
        ("refresh_token", refresh_token.to_string()),
        ("client_id", config.client_id.clone()),
        ("client_secret", config.client_secret.clone()),
    ]
}
