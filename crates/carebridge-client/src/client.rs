use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_LOCATION, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use carebridge_core::{Bundle, ClinicalResource};

use crate::audit::{AuditRecorder, AuditSink, TracingAuditSink};
use crate::auth::{self, LaunchContext, TokenResponse};
use crate::config::{Environment, VendorConfig};
use crate::error::{ClientError, Result};
use crate::export::{ExportJob, classify_poll};
use crate::mapping::{map_bundle, map_resource};
use crate::query::{
    ConditionQuery, DocumentQuery, EncounterQuery, MedicationQuery, ObservationQuery, PatientQuery,
};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::session::{TOKEN_REFRESH_LEEWAY, VendorSession};

const FHIR_JSON: &str = "application/fhir+json";

/// Authenticated HTTP client for one vendor endpoint.
///
/// Every operation funnels through the same pipeline: rate-limit check,
/// token check (refreshing under the session mutex when needed), vendor
/// headers, the retry budget for transient failures, then audit of the
/// request and its outcome. A 401 gets exactly one refresh-and-replay when
/// a refresh token is held. A 429 carrying a `Retry-After` hint sleeps the
/// hint out and replays once; a 429 without one rides the retry budget.
pub struct VendorClient {
    config: VendorConfig,
    http: reqwest::Client,
    session: Arc<Mutex<VendorSession>>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    audit: AuditRecorder,
}

impl VendorClient {
    pub fn new(config: VendorConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(TracingAuditSink))
    }

    pub fn with_sink(config: VendorConfig, sink: Arc<dyn AuditSink>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let session = Arc::new(Mutex::new(VendorSession::from_config(&config)));
        let limiter = RateLimiter::new(config.max_requests, config.rate_limit_window);
        let retry = config.retry.clone();
        Ok(Self {
            config,
            http,
            session,
            limiter,
            retry,
            audit: AuditRecorder::new(sink),
        })
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    /// Shared session handle, for embedders that inspect or seed
    /// authentication state directly.
    pub fn session(&self) -> Arc<Mutex<VendorSession>> {
        Arc::clone(&self.session)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_authenticated()
    }

    /// Exchange an authorization code for tokens.
    pub async fn authenticate(&self, code: &str) -> Result<()> {
        let form = auth::authorization_code_form(&self.config, code);
        let token = self.request_token(&form).await?;
        let mut session = self.session.lock().await;
        session.apply_token(token);
        tracing::info!(vendor = %self.config.vendor, "authenticated via authorization code");
        Ok(())
    }

    /// Service-account authentication via the client-credentials grant.
    pub async fn authenticate_client_credentials(&self) -> Result<()> {
        let form = auth::client_credentials_form(&self.config);
        let token = self.request_token(&form).await?;
        let mut session = self.session.lock().await;
        session.apply_token(token);
        tracing::info!(vendor = %self.config.vendor, "authenticated via client credentials");
        Ok(())
    }

    /// Drop all token state, returning the session to unauthenticated.
    ///
    /// Calls already in flight are not aborted; they complete (or fail) with
    /// the token they captured before the disconnect.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        session.clear();
        tracing::info!(vendor = %self.config.vendor, "session disconnected");
    }

    /// User-facing authorization URL for the authorization-code grant.
    pub fn authorization_url(&self, state: &str, launch: Option<&LaunchContext>) -> Result<Url> {
        auth::authorization_url(&self.config, state, launch)
    }

    pub async fn get_patient(&self, id: &str) -> Result<ClinicalResource> {
        let payload = self
            .execute_request(Method::GET, &format!("Patient/{id}"), &[], None)
            .await?;
        map_resource(payload, &self.config.extension_namespace)
    }

    pub async fn search_patients(&self, query: &PatientQuery) -> Result<Bundle> {
        let params = query.to_params();
        let payload = self
            .execute_request(Method::GET, "Patient", &params, None)
            .await?;
        map_bundle(payload, &self.config.extension_namespace)
    }

    pub async fn patient_observations(
        &self,
        patient_id: &str,
        query: &ObservationQuery,
    ) -> Result<Bundle> {
        self.compartment_search("Observation", patient_id, query.to_params())
            .await
    }

    pub async fn patient_conditions(
        &self,
        patient_id: &str,
        query: &ConditionQuery,
    ) -> Result<Bundle> {
        self.compartment_search("Condition", patient_id, query.to_params())
            .await
    }

    pub async fn patient_medications(
        &self,
        patient_id: &str,
        query: &MedicationQuery,
    ) -> Result<Bundle> {
        self.compartment_search("MedicationRequest", patient_id, query.to_params())
            .await
    }

    pub async fn patient_encounters(
        &self,
        patient_id: &str,
        query: &EncounterQuery,
    ) -> Result<Bundle> {
        self.compartment_search("Encounter", patient_id, query.to_params())
            .await
    }

    pub async fn patient_documents(
        &self,
        patient_id: &str,
        query: &DocumentQuery,
    ) -> Result<Bundle> {
        self.compartment_search("DocumentReference", patient_id, query.to_params())
            .await
    }

    /// Consolidated patient summary via the `$everything` operation.
    pub async fn patient_everything(&self, id: &str) -> Result<Bundle> {
        let payload = self
            .execute_request(Method::GET, &format!("Patient/{id}/$everything"), &[], None)
            .await?;
        map_bundle(payload, &self.config.extension_namespace)
    }

    pub async fn search_practitioners(
        &self,
        name: Option<&str>,
        identifier: Option<&str>,
    ) -> Result<Bundle> {
        let mut params = Vec::new();
        if let Some(name) = name {
            params.push(("name", name.to_string()));
        }
        if let Some(identifier) = identifier {
            params.push(("identifier", identifier.to_string()));
        }
        let payload = self
            .execute_request(Method::GET, "Practitioner", &params, None)
            .await?;
        map_bundle(payload, &self.config.extension_namespace)
    }

    pub async fn list_organizations(&self, count: Option<usize>) -> Result<Bundle> {
        self.directory_search("Organization", count).await
    }

    pub async fn list_locations(&self, count: Option<usize>) -> Result<Bundle> {
        self.directory_search("Location", count).await
    }

    /// Probe the vendor's capability statement. Failures are reported, not
    /// surfaced, so callers can use this as a boolean health check.
    pub async fn validate_connection(&self) -> bool {
        self.limiter.check_limit().await;
        let url = format!("{}/metadata", self.config.base_url.trim_end_matches('/'));
        self.audit
            .log_request(&self.config.vendor, "GET", &url, None)
            .await;
        match self.probe_metadata(&url).await {
            Ok((status, capability)) => {
                if let Some(version) = capability.get("fhirVersion").and_then(Value::as_str) {
                    tracing::info!(
                        vendor = %self.config.vendor,
                        fhir_version = version,
                        "vendor connection validated"
                    );
                } else {
                    tracing::info!(vendor = %self.config.vendor, "vendor connection validated");
                }
                self.audit
                    .log_response(&self.config.vendor, status, Some(&capability))
                    .await;
                true
            }
            Err(error) => {
                tracing::warn!(
                    vendor = %self.config.vendor,
                    error = %error,
                    "vendor connection validation failed"
                );
                self.audit
                    .log_error(&self.config.vendor, error.status(), &error.to_string())
                    .await;
                false
            }
        }
    }

    /// Kick off a patient-level bulk export. The returned job carries the
    /// vendor's status URL; the caller owns the polling loop.
    pub async fn initiate_export(&self, patient_id: &str) -> Result<ExportJob> {
        let url = format!(
            "{}/Patient/{patient_id}/$export",
            self.config.base_url.trim_end_matches('/')
        );
        self.limiter.check_limit().await;
        let token = self.ensure_valid_token().await?;
        self.audit
            .log_request(&self.config.vendor, "POST", &url, None)
            .await;

        // Kickoff is not idempotent, so it runs outside the retry budget.
        match self.send_export_kickoff(&url, patient_id, &token).await {
            Ok((status, job)) => {
                tracing::info!(
                    vendor = %self.config.vendor,
                    patient_id,
                    status_url = %job.status_url,
                    "bulk export accepted"
                );
                self.audit
                    .log_response(&self.config.vendor, status, None)
                    .await;
                Ok(job)
            }
            Err(error) => {
                self.audit
                    .log_error(&self.config.vendor, error.status(), &error.to_string())
                    .await;
                Err(error)
            }
        }
    }

    /// Poll an export job's status URL once and classify the answer.
    pub async fn check_export_status(&self, job: &ExportJob) -> Result<ExportJob> {
        self.limiter.check_limit().await;
        let token = self.ensure_valid_token().await?;
        self.audit
            .log_request(&self.config.vendor, "GET", &job.status_url, None)
            .await;

        let response = match self
            .http
            .get(&job.status_url)
            .bearer_auth(&token)
            .header(ACCEPT, FHIR_JSON)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                let error = ClientError::from(error);
                self.audit
                    .log_error(&self.config.vendor, error.status(), &error.to_string())
                    .await;
                return Err(error);
            }
        };

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: Option<Value> = serde_json::from_str(&text).ok();
        self.audit
            .log_response(&self.config.vendor, status, body.as_ref())
            .await;

        let updated = job.with_poll_outcome(classify_poll(status, body.as_ref()));
        tracing::debug!(
            vendor = %self.config.vendor,
            subject_id = %updated.subject_id,
            state = %updated.state,
            files = updated.output_urls.len(),
            "export status polled"
        );
        Ok(updated)
    }

    async fn compartment_search(
        &self,
        path: &str,
        patient_id: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<Bundle> {
        params.insert(0, ("patient", patient_id.to_string()));
        let payload = self.execute_request(Method::GET, path, &params, None).await?;
        map_bundle(payload, &self.config.extension_namespace)
    }

    async fn directory_search(&self, path: &str, count: Option<usize>) -> Result<Bundle> {
        let mut params = Vec::new();
        if let Some(count) = count {
            params.push(("_count", count.to_string()));
        }
        let payload = self.execute_request(Method::GET, path, &params, None).await?;
        map_bundle(payload, &self.config.extension_namespace)
    }

    /// The outbound pipeline every resource operation funnels through.
    async fn execute_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        self.limiter.check_limit().await;
        let token = self.ensure_valid_token().await?;
        self.audit
            .log_request(&self.config.vendor, method.as_str(), &url, body)
            .await;

        let outcome = match self.issue(&method, &url, query, body, &token).await {
            Err(ClientError::Http { status: 401, .. }) => {
                self.replay_after_refresh(&method, &url, query, body).await
            }
            Err(ClientError::RateLimited {
                retry_after: Some(wait),
            }) => {
                tracing::warn!(
                    vendor = %self.config.vendor,
                    wait_secs = wait,
                    "vendor rate limited the call, honoring Retry-After once"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                self.issue(&method, &url, query, body, &token).await
            }
            other => other,
        };

        match &outcome {
            Ok((status, payload)) => {
                self.audit
                    .log_response(&self.config.vendor, *status, Some(payload))
                    .await;
            }
            Err(error) => {
                self.audit
                    .log_error(&self.config.vendor, error.status(), &error.to_string())
                    .await;
            }
        }
        outcome.map(|(_, payload)| payload)
    }

    /// One call under the retry budget; only retryable failures spend it.
    async fn issue(
        &self,
        method: &Method,
        url: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
        token: &str,
    ) -> Result<(u16, Value)> {
        self.retry
            .execute_if(
                || self.send_once(method, url, query, body, token),
                ClientError::is_retryable,
            )
            .await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
        token: &str,
    ) -> Result<(u16, Value)> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .header(ACCEPT, FHIR_JSON);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            // serialized by hand: the vendor expects the FHIR media type, not
            // the application/json that json() would stamp
            request = request.header(CONTENT_TYPE, FHIR_JSON).body(body.to_string());
        }
        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            return Err(ClientError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status.as_u16(), text));
        }
        let payload = response.json::<Value>().await.map_err(|e| {
            ClientError::invalid_response(format!("vendor returned non-JSON payload: {e}"))
        })?;
        Ok((status.as_u16(), payload))
    }

    /// 401 recovery: one forced refresh and one replay. Requires a refresh
    /// token; a second 401 is a fatal auth error.
    async fn replay_after_refresh(
        &self,
        method: &Method,
        url: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<(u16, Value)> {
        let token = {
            let mut session = self.session.lock().await;
            if session.refresh_token.is_none() {
                return Err(ClientError::auth(
                    "vendor rejected the access token and no refresh token is held",
                ));
            }
            tracing::info!(
                vendor = %self.config.vendor,
                "access token rejected, refreshing and replaying once"
            );
            self.acquire_token_locked(&mut session).await?
        };
        match self.issue(method, url, query, body, &token).await {
            Err(ClientError::Http { status: 401, .. }) => Err(ClientError::auth(
                "vendor rejected the request again after a token refresh",
            )),
            other => other,
        }
    }

    /// Return a usable access token, refreshing first when the current one
    /// is absent or inside the expiry leeway. The session mutex is held
    /// across check-and-refresh, so concurrent callers share one refresh.
    async fn ensure_valid_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if session.token_valid(TOKEN_REFRESH_LEEWAY)
            && let Some(access) = session.access_token.clone()
        {
            return Ok(access);
        }
        self.acquire_token_locked(&mut session).await
    }

    /// Refresh path while holding the session lock: refresh grant when a
    /// refresh token exists, client-credentials re-auth only in sandbox,
    /// otherwise an explicit auth error.
    async fn acquire_token_locked(&self, session: &mut VendorSession) -> Result<String> {
        if let Some(refresh) = session.refresh_token.clone() {
            let form = auth::refresh_form(&self.config, &refresh);
            match self.request_token(&form).await {
                Ok(token) => {
                    let access = token.access_token.clone();
                    session.apply_token(token);
                    tracing::debug!(vendor = %self.config.vendor, "access token refreshed");
                    return Ok(access);
                }
                Err(error) if session.environment == Environment::Sandbox => {
                    tracing::warn!(
                        vendor = %self.config.vendor,
                        error = %error,
                        "refresh grant failed, falling back to client credentials"
                    );
                }
                Err(error) => return Err(error),
            }
        } else if session.environment != Environment::Sandbox {
            return Err(ClientError::auth("token expired and no refresh path available"));
        }
        let form = auth::client_credentials_form(&self.config);
        let token = self.request_token(&form).await?;
        let access = token.access_token.clone();
        session.apply_token(token);
        tracing::debug!(vendor = %self.config.vendor, "re-authenticated via client credentials");
        Ok(access)
    }

    async fn request_token(&self, form: &[(&'static str, String)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.config.token_url())
            .form(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ClientError::invalid_response(format!("malformed token response: {e}")))
    }

    async fn send_export_kickoff(
        &self,
        url: &str,
        patient_id: &str,
        token: &str,
    ) -> Result<(u16, ExportJob)> {
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(ACCEPT, FHIR_JSON)
            .header("Prefer", "respond-async")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status.as_u16(), text));
        }
        let status_url = response
            .headers()
            .get(CONTENT_LOCATION)
            .or_else(|| response.headers().get(LOCATION))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::export("vendor accepted the export but returned no status location")
            })?;
        Ok((
            status.as_u16(),
            ExportJob::in_progress(patient_id, status_url),
        ))
    }

    async fn probe_metadata(&self, url: &str) -> Result<(u16, Value)> {
        let response = self.http.get(url).header(ACCEPT, FHIR_JSON).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status.as_u16(), text));
        }
        let capability = response.json::<Value>().await.map_err(|e| {
            ClientError::invalid_response(format!("capability statement is not JSON: {e}"))
        })?;
        Ok((status.as_u16(), capability))
    }
}
