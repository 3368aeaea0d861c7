//! Compliance validation for clinical resources: per-kind required-element
//! profiles, full violation reporting, and all-or-nothing bundle checks.

pub mod profile;
pub mod validation;

pub use profile::{RequiredElement, element_present, required_elements};
pub use validation::{
    BundleValidationError, ValidationOutcome, Violation, validate, validate_bundle_entries,
};
