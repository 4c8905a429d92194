use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{HealthMetric, HealthMetricPatch, NewHealthMetric};

const COLUMNS: &str = "id, animal_id, lab_test_id, metric_name, value, unit,
     reference_min, reference_max, record_date, notes, knowledge_base_document_id, created_at";

pub fn insert_health_metric(
    conn: &Connection,
    new: &NewHealthMetric,
) -> Result<HealthMetric, DatabaseError> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO health_metrics (id, animal_id, lab_test_id, metric_name, value, unit,
         reference_min, reference_max, record_date, notes, knowledge_base_document_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11)",
        params![
            id.to_string(),
            new.animal_id.to_string(),
            new.lab_test_id.map(|v| v.to_string()),
            new.metric_name,
            new.value,
            new.unit,
            new.reference_min,
            new.reference_max,
            new.record_date,
            new.notes,
            now,
        ],
    )?;
    Ok(HealthMetric {
        id,
        animal_id: new.animal_id,
        lab_test_id: new.lab_test_id,
        metric_name: new.metric_name.clone(),
        value: new.value,
        unit: new.unit.clone(),
        reference_min: new.reference_min,
        reference_max: new.reference_max,
        record_date: new.record_date,
        notes: new.notes.clone(),
        knowledge_base_document_id: None,
        created_at: now,
    })
}

pub fn get_health_metric(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<HealthMetric>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM health_metrics WHERE id = ?1"),
        params![id.to_string()],
        metric_from_row,
    )
    .optional()?
    .transpose()
}

pub fn get_health_metrics_by_animal(
    conn: &Connection,
    animal_id: &Uuid,
) -> Result<Vec<HealthMetric>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM health_metrics WHERE animal_id = ?1 ORDER BY record_date DESC"
    ))?;
    let rows = stmt.query_map(params![animal_id.to_string()], metric_from_row)?;

    let mut metrics = Vec::new();
    for row in rows {
        metrics.push(row??);
    }
    Ok(metrics)
}

pub fn get_health_metrics_by_lab_test(
    conn: &Connection,
    lab_test_id: &Uuid,
) -> Result<Vec<HealthMetric>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM health_metrics WHERE lab_test_id = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![lab_test_id.to_string()], metric_from_row)?;

    let mut metrics = Vec::new();
    for row in rows {
        metrics.push(row??);
    }
    Ok(metrics)
}

/// Value/bounds/notes only — name and unit are immutable.
pub fn update_health_metric(
    conn: &Connection,
    id: &Uuid,
    patch: &HealthMetricPatch,
) -> Result<Option<HealthMetric>, DatabaseError> {
    conn.execute(
        "UPDATE health_metrics SET
             value = COALESCE(?2, value),
             reference_min = COALESCE(?3, reference_min),
             reference_max = COALESCE(?4, reference_max),
             notes = COALESCE(?5, notes)
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.value,
            patch.reference_min,
            patch.reference_max,
            patch.notes,
        ],
    )?;
    get_health_metric(conn, id)
}

/// Persist a standalone metric's own index document handle.
pub fn set_metric_document_id(
    conn: &Connection,
    id: &Uuid,
    document_id: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE health_metrics SET knowledge_base_document_id = ?2 WHERE id = ?1",
        params![id.to_string(), document_id],
    )?;
    Ok(())
}

pub fn delete_health_metric(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM health_metrics WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed > 0)
}

/// Standalone metrics only (lab-test metrics go away with their parent).
pub fn delete_standalone_metrics_by_animal(
    conn: &Connection,
    animal_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM health_metrics WHERE animal_id = ?1 AND lab_test_id IS NULL",
        params![animal_id.to_string()],
    )?;
    Ok(changed)
}

fn metric_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Result<HealthMetric, DatabaseError>> {
    let id: String = row.get(0)?;
    let animal_id: String = row.get(1)?;
    let lab_test_id: Option<String> = row.get(2)?;
    let metric_name: String = row.get(3)?;
    let value: f64 = row.get(4)?;
    let unit: String = row.get(5)?;
    let reference_min: Option<f64> = row.get(6)?;
    let reference_max: Option<f64> = row.get(7)?;
    let record_date: NaiveDate = row.get(8)?;
    let notes: Option<String> = row.get(9)?;
    let knowledge_base_document_id: Option<String> = row.get(10)?;
    let created_at: NaiveDateTime = row.get(11)?;

    Ok((|| {
        Ok(HealthMetric {
            id: parse_uuid(&id)?,
            animal_id: parse_uuid(&animal_id)?,
            lab_test_id: lab_test_id.as_deref().map(parse_uuid).transpose()?,
            metric_name,
            value,
            unit,
            reference_min,
            reference_max,
            record_date,
            notes,
            knowledge_base_document_id,
            created_at,
        })
    })())
}
