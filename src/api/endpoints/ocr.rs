//! Document analysis endpoint.
//!
//! Two modes share one extraction pass:
//! - scan-only (no `animalId`): the caller gets the structured result
//!   back for review before saving anything;
//! - scan-and-save: the result is committed as a lab test with metrics
//!   and pushed to the animal's knowledge base.

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::types::AppContext;
use crate::db::repository::{animal, health_metric, lab_test, owner};
use crate::models::{Animal, HealthMetric, LabTest, NewHealthMetric, NewLabTest};
use crate::pipeline::{ExtractionResult, NormalizedDocument};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub document_base64: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    pub animal_id: Option<Uuid>,
    /// Caller overrides win over extracted values.
    pub test_date: Option<NaiveDate>,
    pub clinic_name: Option<String>,
    pub test_type: Option<String>,
}

fn default_media_type() -> String {
    "image/jpeg".to_string()
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    #[serde(rename_all = "camelCase")]
    ScanOnly {
        success: bool,
        #[serde(flatten)]
        extraction: ExtractionResult,
    },
    #[serde(rename_all = "camelCase")]
    Saved {
        success: bool,
        lab_test: LabTest,
        metrics: Vec<HealthMetric>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sync_error: Option<String>,
    },
}

/// `POST /api/ocr/analyze`.
pub async fn analyze(
    State(ctx): State<AppContext>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let extraction_service = ctx
        .extraction
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable(messages::OCR_NOT_CONFIGURED.to_string()))?;

    if request.document_base64.trim().is_empty() {
        return Err(ApiError::BadRequest(
            messages::DOCUMENT_DATA_REQUIRED.to_string(),
        ));
    }

    // Resolve the target animal up front so a bad id fails before the
    // engine is paid for.
    let target: Option<Animal> = match request.animal_id {
        Some(animal_id) => {
            let conn = ctx.db.conn();
            Some(
                animal::get_animal(&conn, &animal_id)?
                    .ok_or_else(|| ApiError::NotFound("Animal not found".into()))?,
            )
        }
        None => None,
    };
    let language = {
        let conn = ctx.db.conn();
        target
            .as_ref()
            .and_then(|a| owner::get_owner(&conn, &a.owner_id).ok().flatten())
            .map(|o| o.preferred_language)
            .unwrap_or_else(|| "uk".to_string())
    };

    let document = NormalizedDocument::from_base64(&request.media_type, &request.document_base64)?;
    let extraction = extraction_service.extract(&document, &language).await?;
    info!(
        metrics = extraction.metrics.len(),
        saved = target.is_some(),
        "document analyzed"
    );

    let Some(animal) = target else {
        return Ok(Json(AnalyzeResponse::ScanOnly {
            success: true,
            extraction,
        }));
    };

    // Commit as a lab test. Caller-supplied metadata overrides the
    // extracted values; the date falls back to today.
    let test_date = request
        .test_date
        .or(extraction.test_date)
        .unwrap_or_else(|| Utc::now().date_naive());
    let test_id = {
        let conn = ctx.db.conn();
        let test = lab_test::insert_lab_test(
            &conn,
            &NewLabTest {
                animal_id: animal.id,
                test_date,
                clinic_name: request.clinic_name.clone().or(extraction.clinic_name.clone()),
                test_type: request.test_type.clone().or(extraction.test_type.clone()),
                notes: None,
            },
        )?;
        for item in &extraction.metrics {
            health_metric::insert_health_metric(
                &conn,
                &NewHealthMetric {
                    animal_id: animal.id,
                    lab_test_id: Some(test.id),
                    metric_name: item.name.clone(),
                    value: item.value,
                    unit: item.unit.clone(),
                    reference_min: item.reference_min,
                    reference_max: item.reference_max,
                    record_date: test_date,
                    notes: None,
                },
            )?;
        }
        test.id
    };

    let sync_error = match &ctx.knowledge {
        Some(knowledge) if !extraction.metrics.is_empty() => {
            match knowledge.upsert_lab_test_document(&test_id).await {
                Ok(()) => None,
                Err(err) => {
                    warn!(lab_test_id = %test_id, %err, "knowledge base sync failed");
                    Some(err.to_string())
                }
            }
        }
        _ => None,
    };

    let (saved_test, metrics) = {
        let conn = ctx.db.conn();
        let test = lab_test::get_lab_test(&conn, &test_id)?
            .ok_or_else(|| ApiError::Internal("lab test vanished after insert".into()))?;
        let metrics = health_metric::get_health_metrics_by_lab_test(&conn, &test_id)?;
        (test, metrics)
    };
    Ok(Json(AnalyzeResponse::Saved {
        success: true,
        lab_test: saved_test,
        metrics,
        sync_error,
    }))
}
