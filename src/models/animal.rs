use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Sex, Species};

/// A tracked animal. `knowledge_base_id` is the handle of the animal's
/// external semantic index — null until the first document is ingested,
/// cleared again by a data wipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub sex: Sex,
    pub date_of_birth: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub knowledge_base_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnimal {
    pub owner_id: Uuid,
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub sex: Sex,
    pub date_of_birth: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
}

/// Partial update for an animal. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalPatch {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
}
