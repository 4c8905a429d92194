use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One numeric clinical observation.
///
/// Exactly one of two shapes holds:
/// - grouped: `lab_test_id` is set, `knowledge_base_document_id` is null —
///   the metric is embedded in the parent lab test's single index document;
/// - standalone: `lab_test_id` is null and the metric carries its own
///   index document handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetric {
    pub id: Uuid,
    pub animal_id: Uuid,
    pub lab_test_id: Option<Uuid>,
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
    pub record_date: NaiveDate,
    pub notes: Option<String>,
    pub knowledge_base_document_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewHealthMetric {
    pub animal_id: Uuid,
    pub lab_test_id: Option<Uuid>,
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
    pub record_date: NaiveDate,
    pub notes: Option<String>,
}

/// Editable metric fields. Name and unit are immutable post-creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetricPatch {
    pub value: Option<f64>,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
    pub notes: Option<String>,
}
