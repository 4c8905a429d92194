//! Health metric endpoints.
//!
//! A metric edit must be reflected in the knowledge base: for a grouped
//! metric the whole parent lab-test document is regenerated, for a
//! standalone metric its own document is replaced.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::types::AppContext;
use crate::db::repository::{animal, health_metric};
use crate::knowledge::SyncError;
use crate::models::{HealthMetric, HealthMetricPatch, NewHealthMetric};
use crate::pipeline::coerce_numeric;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricRequest {
    pub animal_id: Uuid,
    pub lab_test_id: Option<Uuid>,
    pub metric_name: String,
    /// Number or numeric string; see the lab-test create path.
    pub value: serde_json::Value,
    #[serde(default)]
    pub unit: String,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
    pub record_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    #[serde(flatten)]
    pub metric: HealthMetric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

/// `GET /api/health-metrics/animal/:animal_id`.
pub async fn list_by_animal(
    State(ctx): State<AppContext>,
    Path(animal_id): Path<Uuid>,
) -> Result<Json<Vec<HealthMetric>>, ApiError> {
    let conn = ctx.db.conn();
    Ok(Json(health_metric::get_health_metrics_by_animal(
        &conn,
        &animal_id,
    )?))
}

/// `POST /api/health-metrics` — create one metric, standalone or
/// attached to an existing lab test.
pub async fn create(
    State(ctx): State<AppContext>,
    Json(request): Json<CreateMetricRequest>,
) -> Result<Json<MetricResponse>, ApiError> {
    let value = coerce_numeric(&request.value)
        .ok_or_else(|| ApiError::BadRequest(messages::invalid_metric_value(&request.metric_name)))?;

    let metric_id = {
        let conn = ctx.db.conn();
        if animal::get_animal(&conn, &request.animal_id)?.is_none() {
            return Err(ApiError::NotFound("Animal not found".into()));
        }
        health_metric::insert_health_metric(
            &conn,
            &NewHealthMetric {
                animal_id: request.animal_id,
                lab_test_id: request.lab_test_id,
                metric_name: request.metric_name,
                value,
                unit: request.unit,
                reference_min: request.reference_min,
                reference_max: request.reference_max,
                record_date: request.record_date,
                notes: request.notes,
            },
        )?
        .id
    };

    let sync_error = regenerate(&ctx, &metric_id).await?;
    load_response(&ctx, &metric_id, sync_error)
}

/// `PATCH /api/health-metrics/:id` — value, bounds and notes only.
pub async fn update(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<HealthMetricPatch>,
) -> Result<Json<MetricResponse>, ApiError> {
    {
        let conn = ctx.db.conn();
        health_metric::update_health_metric(&conn, &id, &patch)?
            .ok_or_else(|| ApiError::NotFound("Health metric not found".into()))?;
    }
    let sync_error = regenerate(&ctx, &id).await?;
    load_response(&ctx, &id, sync_error)
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub success: bool,
}

/// `DELETE /api/health-metrics/:id`. A grouped metric triggers a parent
/// document regeneration; a standalone one takes its document with it.
pub async fn delete(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let metric = {
        let conn = ctx.db.conn();
        let metric = health_metric::get_health_metric(&conn, &id)?
            .ok_or_else(|| ApiError::NotFound("Health metric not found".into()))?;
        health_metric::delete_health_metric(&conn, &id)?;
        metric
    };

    if let Some(knowledge) = &ctx.knowledge {
        match metric.lab_test_id {
            Some(lab_test_id) => {
                if let Err(err) = knowledge.upsert_lab_test_document(&lab_test_id).await {
                    warn!(%lab_test_id, %err, "parent document regeneration failed");
                }
            }
            None => {
                if let Some(doc) = &metric.knowledge_base_document_id {
                    let index_id = {
                        let conn = ctx.db.conn();
                        animal::get_animal(&conn, &metric.animal_id)?
                            .and_then(|a| a.knowledge_base_id)
                    };
                    if let Some(index) = index_id {
                        knowledge.remove_document_best_effort(&index, doc).await;
                    }
                }
            }
        }
    }
    Ok(Json(DeletedResponse { success: true }))
}

/// Refreshes the knowledge base after a metric write. A lost race on
/// the parent lab test is a 409; other failures become `syncError`.
async fn regenerate(ctx: &AppContext, metric_id: &Uuid) -> Result<Option<String>, ApiError> {
    let Some(knowledge) = &ctx.knowledge else {
        return Ok(None);
    };
    let lab_test_id = {
        let conn = ctx.db.conn();
        health_metric::get_health_metric(&conn, metric_id)?.and_then(|m| m.lab_test_id)
    };

    let result = match lab_test_id {
        Some(parent) => knowledge.upsert_lab_test_document(&parent).await,
        None => knowledge.upsert_metric_document(metric_id).await,
    };
    match result {
        Ok(()) => Ok(None),
        Err(SyncError::Conflict) => Err(SyncError::Conflict.into()),
        Err(err) => {
            warn!(%metric_id, %err, "knowledge base sync failed");
            Ok(Some(err.to_string()))
        }
    }
}

fn load_response(
    ctx: &AppContext,
    metric_id: &Uuid,
    sync_error: Option<String>,
) -> Result<Json<MetricResponse>, ApiError> {
    let conn = ctx.db.conn();
    let metric = health_metric::get_health_metric(&conn, metric_id)?
        .ok_or_else(|| ApiError::NotFound("Health metric not found".into()))?;
    Ok(Json(MetricResponse { metric, sync_error }))
}
