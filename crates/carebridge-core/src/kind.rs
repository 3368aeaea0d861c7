use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Clinical resource kinds exchanged with EHR vendors.
///
/// The union is closed on purpose: the compliance validator matches on it
/// exhaustively, so adding a kind forces a decision about its required
/// elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Patient,
    Practitioner,
    Organization,
    Location,
    Encounter,
    Observation,
    Condition,
    MedicationRequest,
    Procedure,
    DocumentReference,
    DiagnosticReport,
    Immunization,
    AllergyIntolerance,
}

impl ResourceKind {
    /// All supported kinds, in declaration order.
    pub const ALL: [ResourceKind; 13] = [
        ResourceKind::Patient,
        ResourceKind::Practitioner,
        ResourceKind::Organization,
        ResourceKind::Location,
        ResourceKind::Encounter,
        ResourceKind::Observation,
        ResourceKind::Condition,
        ResourceKind::MedicationRequest,
        ResourceKind::Procedure,
        ResourceKind::DocumentReference,
        ResourceKind::DiagnosticReport,
        ResourceKind::Immunization,
        ResourceKind::AllergyIntolerance,
    ];

    /// Wire name of the kind, e.g. `"MedicationRequest"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Practitioner => "Practitioner",
            ResourceKind::Organization => "Organization",
            ResourceKind::Location => "Location",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::Observation => "Observation",
            ResourceKind::Condition => "Condition",
            ResourceKind::MedicationRequest => "MedicationRequest",
            ResourceKind::Procedure => "Procedure",
            ResourceKind::DocumentReference => "DocumentReference",
            ResourceKind::DiagnosticReport => "DiagnosticReport",
            ResourceKind::Immunization => "Immunization",
            ResourceKind::AllergyIntolerance => "AllergyIntolerance",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceKind::Patient),
            "Practitioner" => Ok(ResourceKind::Practitioner),
            "Organization" => Ok(ResourceKind::Organization),
            "Location" => Ok(ResourceKind::Location),
            "Encounter" => Ok(ResourceKind::Encounter),
            "Observation" => Ok(ResourceKind::Observation),
            "Condition" => Ok(ResourceKind::Condition),
            "MedicationRequest" => Ok(ResourceKind::MedicationRequest),
            "Procedure" => Ok(ResourceKind::Procedure),
            "DocumentReference" => Ok(ResourceKind::DocumentReference),
            "DiagnosticReport" => Ok(ResourceKind::DiagnosticReport),
            "Immunization" => Ok(ResourceKind::Immunization),
            "AllergyIntolerance" => Ok(ResourceKind::AllergyIntolerance),
            _ => Err(CoreError::invalid_resource_kind(s)),
        }
    }
}
