//! Typed query parameters for the vendor search operations. Each struct
//! renders to wire pairs via `to_params`; unset fields are omitted.

macro_rules! push_param {
    ($pairs:ident, $key:literal, $field:expr) => {
        if let Some(value) = &$field {
            $pairs.push(($key, value.clone()));
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct PatientQuery {
    pub identifier: Option<String>,
    pub name: Option<String>,
    pub birthdate: Option<String>,
    pub gender: Option<String>,
}

impl PatientQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_birthdate(mut self, birthdate: impl Into<String>) -> Self {
        self.birthdate = Some(birthdate.into());
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_param!(pairs, "identifier", self.identifier);
        push_param!(pairs, "name", self.name);
        push_param!(pairs, "birthdate", self.birthdate);
        push_param!(pairs, "gender", self.gender);
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
    pub category: Option<String>,
    pub code: Option<String>,
    pub date: Option<String>,
}

impl ObservationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_param!(pairs, "category", self.category);
        push_param!(pairs, "code", self.code);
        push_param!(pairs, "date", self.date);
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConditionQuery {
    pub category: Option<String>,
    pub clinical_status: Option<String>,
}

impl ConditionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_clinical_status(mut self, clinical_status: impl Into<String>) -> Self {
        self.clinical_status = Some(clinical_status.into());
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_param!(pairs, "category", self.category);
        push_param!(pairs, "clinical-status", self.clinical_status);
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct MedicationQuery {
    pub status: Option<String>,
}

impl MedicationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_param!(pairs, "status", self.status);
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct EncounterQuery {
    pub date: Option<String>,
    pub status: Option<String>,
}

impl EncounterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_param!(pairs, "date", self.date);
        push_param!(pairs, "status", self.status);
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub category: Option<String>,
    pub date: Option<String>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_param!(pairs, "category", self.category);
        push_param!(pairs, "date", self.date);
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_are_omitted() {
        assert!(PatientQuery::new().to_params().is_empty());
        let params = PatientQuery::new()
            .with_name("smith")
            .with_gender("female")
            .to_params();
        assert_eq!(
            params,
            vec![("name", "smith".to_string()), ("gender", "female".to_string())]
        );
    }

    #[test]
    fn test_condition_status_wire_name() {
        let params = ConditionQuery::new().with_clinical_status("active").to_params();
        assert_eq!(params, vec![("clinical-status", "active".to_string())]);
    }

    #[test]
    fn test_observation_query_full() {
        let params = ObservationQuery::new()
            .with_category("vital-signs")
            .with_code("8867-4")
            .with_date("ge2024-01-01")
            .to_params();
        assert_eq!(params.len(), 3);
        assert_eq!(params[2], ("date", "ge2024-01-01".to_string()));
    }
}
