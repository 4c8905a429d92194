use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pet owner. Authentication lives outside this service; owner-scoped
/// endpoints identify the caller by the `X-Owner-Id` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    /// BCP-47-ish language tag for documents and extraction output ("uk").
    pub preferred_language: String,
    pub created_at: NaiveDateTime,
}

/// Fields accepted when registering an owner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOwner {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    #[serde(default = "default_language")]
    pub preferred_language: String,
}

fn default_language() -> String {
    "uk".to_string()
}

/// Partial profile update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub preferred_language: Option<String>,
}
