//! Vendor EHR integration client: OAuth2 session management, rate-limited
//! and retried HTTP, audit logging, and mapping of vendor payloads into the
//! internal resource shapes.
//!
//! ```no_run
//! use carebridge_client::{PatientQuery, VendorClient, VendorConfig};
//!
//! # async fn demo() -> carebridge_client::Result<()> {
//! let config = VendorConfig::from_env()?;
//! let client = VendorClient::new(config)?;
//! client.authenticate_client_credentials().await?;
//! let bundle = client
//!     .search_patients(&PatientQuery::new().with_name("smith"))
//!     .await?;
//! println!("matches: {}", bundle.entry.len());
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod mapping;
pub mod query;
pub mod rate_limit;
pub mod retry;
pub mod session;
pub mod telemetry;

pub use audit::{
    AuditDirection, AuditEntry, AuditRecorder, AuditSink, MemoryAuditSink, TracingAuditSink,
};
pub use auth::{LaunchContext, TokenResponse, authorization_url};
pub use client::VendorClient;
pub use config::{Environment, VendorConfig};
pub use error::{ClientError, Result};
pub use export::{ExportJob, ExportState};
pub use mapping::{map_bundle, map_resource};
pub use query::{
    ConditionQuery, DocumentQuery, EncounterQuery, MedicationQuery, ObservationQuery, PatientQuery,
};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use session::{TOKEN_REFRESH_LEEWAY, VendorSession};
pub use telemetry::{init_tracing, init_tracing_with_level};
