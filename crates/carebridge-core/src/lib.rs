pub mod bundle;
pub mod element;
pub mod error;
pub mod id;
pub mod instant;
pub mod kind;
pub mod outcome;
pub mod resource;

pub use bundle::{Bundle, BundleEntry, BundleKind, BundleLink};
pub use element::{is_valid_coded_concept, is_valid_identifier, is_valid_reference};
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{generate_id, is_valid_id, validate_id};
pub use instant::{FhirInstant, now_utc};
pub use kind::ResourceKind;
pub use resource::{ClinicalResource, ResourceMeta};
