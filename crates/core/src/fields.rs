//! Import types and their canonical field sets.
//!
//! Each [`ImportType`] has a static list of [`CanonicalField`]s the backend
//! recognises. Column mappings target these keys.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Import type
// ---------------------------------------------------------------------------

/// Which entity kind a CSV import creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    Clients,
    Therapists,
}

impl ImportType {
    /// Wire name, also used as the endpoint path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Therapists => "therapists",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "clients" => Ok(Self::Clients),
            "therapists" => Ok(Self::Therapists),
            _ => Err(CoreError::Validation(format!(
                "Invalid import type '{s}'. Must be one of: clients, therapists"
            ))),
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clients => "Clients",
            Self::Therapists => "Therapists",
        }
    }

    /// The canonical field set for this import type.
    pub fn fields(&self) -> &'static [CanonicalField] {
        match self {
            Self::Clients => CLIENT_FIELDS,
            Self::Therapists => THERAPIST_FIELDS,
        }
    }

    /// Look up a canonical field by key.
    pub fn field(&self, key: &str) -> Option<&'static CanonicalField> {
        self.fields().iter().find(|f| f.key == key)
    }

    /// Whether `key` is a canonical field of this import type.
    pub fn has_field(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// Keys of all required fields, in declaration order.
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> {
        self.fields().iter().filter(|f| f.required).map(|f| f.key)
    }
}

impl std::str::FromStr for ImportType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ImportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// A backend-recognised target field for imported data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanonicalField {
    pub key: &'static str,
    pub display_label: &'static str,
    pub required: bool,
}

const fn field(key: &'static str, display_label: &'static str, required: bool) -> CanonicalField {
    CanonicalField {
        key,
        display_label,
        required,
    }
}

/// Fields accepted by the client import.
pub const CLIENT_FIELDS: &[CanonicalField] = &[
    field("first_name", "First name", true),
    field("last_name", "Last name", true),
    field("email", "Email address", true),
    field("phone", "Phone number", false),
    field("date_of_birth", "Date of birth", false),
    field("gender", "Gender", false),
    field("bsn", "BSN (citizen service number)", false),
    field("street", "Street", false),
    field("house_number", "House number", false),
    field("postal_code", "Postal code", false),
    field("city", "City", false),
    field("insurance_company", "Insurance company", false),
    field("insurance_number", "Insurance policy number", false),
    field("general_practitioner", "General practitioner", false),
    field("notes", "Notes", false),
];

/// Fields accepted by the therapist import.
pub const THERAPIST_FIELDS: &[CanonicalField] = &[
    field("first_name", "First name", true),
    field("last_name", "Last name", true),
    field("email", "Email address", true),
    field("phone", "Phone number", false),
    field("specializations", "Specializations", false),
    field("big_number", "BIG registration number", false),
    field("agb_code", "AGB code", false),
    field("license_expiry", "License expiry date", false),
    field("bio", "Biography", false),
    field("hourly_rate", "Hourly rate", false),
];
