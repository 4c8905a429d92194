//! Dual-write orchestration between the local database and the vector
//! index.
//!
//! The protocol for (re)generating a lab-test document:
//! 1. read the row and remember its sync version;
//! 2. delete the old index document, if any — best-effort, since the
//!    handle may already dangle and must not block the replace;
//! 3. upload the freshly rendered document;
//! 4. persist the new handle guarded by the remembered version.
//! If step 4 loses to a concurrent regeneration the upload is stale:
//! the orphaned document is removed and `Conflict` reported. If step 3
//! fails after step 2 removed the old document, the stored handle is
//! cleared so it never dangles; the row then shows up as unsynced and
//! a later resync repairs it.

use std::sync::Arc;

use tracing::{info, warn};

use super::render::{
    lab_test_file_name, metric_file_name, render_lab_test_document, render_metric_document,
};
use super::store::VectorIndex;
use super::SyncError;
use crate::db::repository::{animal, health_metric, lab_test};
use crate::db::Database;
use crate::models::{Animal, HealthMetric, LabTest};
use uuid::Uuid;

pub struct KnowledgeSync {
    db: Database,
    index: Arc<dyn VectorIndex>,
}

impl KnowledgeSync {
    pub fn new(db: Database, index: Arc<dyn VectorIndex>) -> Self {
        Self { db, index }
    }

    /// Returns the animal's index id, creating the index on first use.
    pub async fn ensure_index(&self, animal_id: &Uuid) -> Result<String, SyncError> {
        let animal = self.load_animal(animal_id)?;
        if let Some(index_id) = animal.knowledge_base_id {
            return Ok(index_id);
        }

        let index_id = self
            .index
            .create_index(&format!("KB: {}", animal.name), &animal_id.to_string())
            .await?;
        {
            let conn = self.db.conn();
            animal::set_knowledge_base_id(&conn, animal_id, Some(&index_id))?;
        }
        info!(%animal_id, index_id, "created knowledge base");
        Ok(index_id)
    }

    /// Regenerates the lab test's index document from current database
    /// state.
    pub async fn upsert_lab_test_document(&self, lab_test_id: &Uuid) -> Result<(), SyncError> {
        let (test, metrics) = self.load_lab_test(lab_test_id)?;
        let index_id = self.ensure_index(&test.animal_id).await?;
        let content = render_lab_test_document(&test, &metrics);
        let file_name = lab_test_file_name(&test);

        if let Some(old_id) = &test.knowledge_base_document_id {
            if let Err(err) = self.index.delete_document(&index_id, old_id).await {
                warn!(%lab_test_id, %old_id, %err, "old index document removal failed");
            }
        }

        let new_id = match self.index.upload_document(&index_id, &file_name, content).await {
            Ok(id) => id,
            Err(err) => {
                // The old document is already gone; drop the handle so
                // the row reads as unsynced instead of dangling.
                let conn = self.db.conn();
                lab_test::clear_document_id(&conn, lab_test_id)?;
                return Err(err);
            }
        };

        let stored = {
            let conn = self.db.conn();
            lab_test::set_document_id_if_version(&conn, lab_test_id, Some(&new_id), test.sync_version)?
        };
        if !stored {
            warn!(%lab_test_id, "regeneration lost the version race");
            let _ = self.index.delete_document(&index_id, &new_id).await;
            return Err(SyncError::Conflict);
        }
        info!(%lab_test_id, document_id = %new_id, "lab test synced");
        Ok(())
    }

    /// Regenerates a standalone metric's index document.
    pub async fn upsert_metric_document(&self, metric_id: &Uuid) -> Result<(), SyncError> {
        let metric = self.load_metric(metric_id)?;
        let index_id = self.ensure_index(&metric.animal_id).await?;
        let content = render_metric_document(&metric);
        let file_name = metric_file_name(&metric);

        if let Some(old_id) = &metric.knowledge_base_document_id {
            if let Err(err) = self.index.delete_document(&index_id, old_id).await {
                warn!(%metric_id, %old_id, %err, "old index document removal failed");
            }
        }

        let new_id = match self.index.upload_document(&index_id, &file_name, content).await {
            Ok(id) => id,
            Err(err) => {
                let conn = self.db.conn();
                health_metric::set_metric_document_id(&conn, metric_id, None)?;
                return Err(err);
            }
        };

        let conn = self.db.conn();
        health_metric::set_metric_document_id(&conn, metric_id, Some(&new_id))?;
        Ok(())
    }

    /// Best-effort removal of an index document; a failure is logged,
    /// never propagated, because the local row is already gone.
    pub async fn remove_document_best_effort(&self, index_id: &str, document_id: &str) {
        if let Err(err) = self.index.delete_document(index_id, document_id).await {
            warn!(index_id, document_id, %err, "failed to remove index document");
        }
    }

    /// Best-effort teardown of the animal's whole index.
    pub async fn remove_index_best_effort(&self, animal_id: &Uuid) {
        let index_id = match self.load_animal(animal_id) {
            Ok(animal) => animal.knowledge_base_id,
            Err(_) => None,
        };
        let Some(index_id) = index_id else { return };

        if let Err(err) = self.index.delete_index(&index_id).await {
            warn!(%animal_id, index_id, %err, "failed to remove index");
        }
        let cleared = {
            let conn = self.db.conn();
            animal::set_knowledge_base_id(&conn, animal_id, None)
        };
        if let Err(err) = cleared {
            warn!(%animal_id, %err, "failed to clear index handle");
        }
    }

    /// Re-uploads every lab test whose document handle is missing.
    /// Tests with no metrics are left alone — they are intentionally
    /// unsynced, the same as on create. Version conflicts mean someone
    /// else is already syncing that row and are counted as skipped,
    /// not failed.
    pub async fn reconcile_animal(&self, animal_id: &Uuid) -> Result<ReconcileReport, SyncError> {
        let unsynced = {
            let conn = self.db.conn();
            lab_test::get_unsynced_lab_tests(&conn, animal_id)?
        };

        let mut report = ReconcileReport::default();
        for test in &unsynced {
            let has_metrics = {
                let conn = self.db.conn();
                !health_metric::get_health_metrics_by_lab_test(&conn, &test.id)?.is_empty()
            };
            if !has_metrics {
                continue;
            }
            match self.upsert_lab_test_document(&test.id).await {
                Ok(()) => report.synced += 1,
                Err(SyncError::Conflict) => report.skipped += 1,
                Err(err) => {
                    warn!(lab_test_id = %test.id, %err, "resync failed");
                    report.failed += 1;
                }
            }
        }
        info!(%animal_id, synced = report.synced, failed = report.failed, "reconcile done");
        Ok(report)
    }

    fn load_animal(&self, animal_id: &Uuid) -> Result<Animal, SyncError> {
        let conn = self.db.conn();
        animal::get_animal(&conn, animal_id)?.ok_or_else(|| SyncError::NotFound {
            entity: "animal",
            id: animal_id.to_string(),
        })
    }

    fn load_lab_test(&self, lab_test_id: &Uuid) -> Result<(LabTest, Vec<HealthMetric>), SyncError> {
        let conn = self.db.conn();
        let test = lab_test::get_lab_test(&conn, lab_test_id)?.ok_or_else(|| SyncError::NotFound {
            entity: "lab test",
            id: lab_test_id.to_string(),
        })?;
        let metrics = health_metric::get_health_metrics_by_lab_test(&conn, lab_test_id)?;
        Ok((test, metrics))
    }

    fn load_metric(&self, metric_id: &Uuid) -> Result<HealthMetric, SyncError> {
        let conn = self.db.conn();
        health_metric::get_health_metric(&conn, metric_id)?.ok_or_else(|| SyncError::NotFound {
            entity: "health metric",
            id: metric_id.to_string(),
        })
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::owner;
    use crate::knowledge::store::mock::InMemoryIndex;
    use crate::models::enums::{Sex, Species};
    use crate::models::{NewAnimal, NewHealthMetric, NewLabTest, NewOwner};
    use chrono::NaiveDate;
    use std::sync::atomic::Ordering;

    fn setup() -> (KnowledgeSync, Arc<InMemoryIndex>, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let animal_id = {
            let conn = db.conn();
            let o = owner::insert_owner(
                &conn,
                &NewOwner {
                    first_name: "Ivan".into(),
                    last_name: "Petrenko".into(),
                    email: "ivan@example.com".into(),
                    phone: None,
                    city: None,
                    preferred_language: "uk".into(),
                },
            )
            .unwrap();
            animal::insert_animal(
                &conn,
                &NewAnimal {
                    owner_id: o.id,
                    name: "Рекс".into(),
                    species: Species::Dog,
                    breed: "Лабрадор".into(),
                    sex: Sex::Male,
                    date_of_birth: None,
                    weight_kg: None,
                },
            )
            .unwrap()
            .id
        };
        let index = Arc::new(InMemoryIndex::default());
        (KnowledgeSync::new(db, index.clone()), index, animal_id)
    }

    fn add_lab_test(sync: &KnowledgeSync, animal_id: Uuid) -> Uuid {
        let conn = sync.db.conn();
        let test = lab_test::insert_lab_test(
            &conn,
            &NewLabTest {
                animal_id,
                test_date: NaiveDate::from_ymd_opt(2025, 10, 8).unwrap(),
                clinic_name: Some("ВетКлініка".into()),
                test_type: Some("Аналіз крові".into()),
                notes: None,
            },
        )
        .unwrap();
        health_metric::insert_health_metric(
            &conn,
            &NewHealthMetric {
                animal_id,
                lab_test_id: Some(test.id),
                metric_name: "Гемоглобін".into(),
                value: 95.0,
                unit: "г/л".into(),
                reference_min: Some(110.0),
                reference_max: Some(180.0),
                record_date: NaiveDate::from_ymd_opt(2025, 10, 8).unwrap(),
                notes: None,
            },
        )
        .unwrap();
        test.id
    }

    #[tokio::test]
    async fn ensure_index_is_idempotent() {
        let (sync, index, animal_id) = setup();
        let first = sync.ensure_index(&animal_id).await.unwrap();
        let second = sync.ensure_index(&animal_id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(index.indexes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upsert_uploads_rendered_document_and_stores_handle() {
        let (sync, index, animal_id) = setup();
        let test_id = add_lab_test(&sync, animal_id);

        sync.upsert_lab_test_document(&test_id).await.unwrap();

        let stored = {
            let conn = sync.db.conn();
            lab_test::get_lab_test(&conn, &test_id).unwrap().unwrap()
        };
        let doc_id = stored.knowledge_base_document_id.unwrap();
        let index_id = sync.ensure_index(&animal_id).await.unwrap();
        let content = index.document_content(&index_id, &doc_id).unwrap();
        assert!(content.contains("Status: BELOW NORMAL (Low)"));
    }

    #[tokio::test]
    async fn upsert_replaces_rather_than_duplicates() {
        let (sync, index, animal_id) = setup();
        let test_id = add_lab_test(&sync, animal_id);

        sync.upsert_lab_test_document(&test_id).await.unwrap();
        sync.upsert_lab_test_document(&test_id).await.unwrap();

        let index_id = sync.ensure_index(&animal_id).await.unwrap();
        assert_eq!(index.document_count(&index_id), 1);
    }

    #[tokio::test]
    async fn failed_upload_clears_handle_and_marks_unsynced() {
        let (sync, index, animal_id) = setup();
        let test_id = add_lab_test(&sync, animal_id);
        sync.upsert_lab_test_document(&test_id).await.unwrap();

        index.fail_uploads.store(true, Ordering::SeqCst);
        let err = sync.upsert_lab_test_document(&test_id).await.unwrap_err();
        assert!(matches!(err, SyncError::Backend(_)));

        let conn = sync.db.conn();
        let stored = lab_test::get_lab_test(&conn, &test_id).unwrap().unwrap();
        assert!(stored.knowledge_base_document_id.is_none());
        assert_eq!(lab_test::get_unsynced_lab_tests(&conn, &animal_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_regeneration_reports_conflict() {
        let (sync, index, animal_id) = setup();
        let test_id = add_lab_test(&sync, animal_id);
        sync.upsert_lab_test_document(&test_id).await.unwrap();

        // Snapshot the row, then let another writer bump the version
        // before our write lands.
        let before = {
            let conn = sync.db.conn();
            lab_test::get_lab_test(&conn, &test_id).unwrap().unwrap()
        };
        {
            let conn = sync.db.conn();
            lab_test::clear_document_id(&conn, &test_id).unwrap();
        }

        let index_id = sync.ensure_index(&animal_id).await.unwrap();
        let new_id = index
            .upload_document(&index_id, "x.txt", "stale".into())
            .await
            .unwrap();
        let stored = {
            let conn = sync.db.conn();
            lab_test::set_document_id_if_version(&conn, &test_id, Some(&new_id), before.sync_version)
                .unwrap()
        };
        assert!(!stored);
    }

    #[tokio::test]
    async fn replace_survives_missing_old_document() {
        let (sync, index, animal_id) = setup();
        let test_id = add_lab_test(&sync, animal_id);
        sync.upsert_lab_test_document(&test_id).await.unwrap();

        // Purge the document behind the service's back, leaving the
        // stored handle dangling.
        let index_id = sync.ensure_index(&animal_id).await.unwrap();
        let dangling = {
            let conn = sync.db.conn();
            lab_test::get_lab_test(&conn, &test_id)
                .unwrap()
                .unwrap()
                .knowledge_base_document_id
                .unwrap()
        };
        index.delete_document(&index_id, &dangling).await.unwrap();

        sync.upsert_lab_test_document(&test_id).await.unwrap();

        let conn = sync.db.conn();
        let stored = lab_test::get_lab_test(&conn, &test_id).unwrap().unwrap();
        assert_ne!(
            stored.knowledge_base_document_id.as_deref(),
            Some(dangling.as_str())
        );
        assert_eq!(index.document_count(&index_id), 1);
    }

    #[tokio::test]
    async fn reconcile_syncs_unsynced_tests() {
        let (sync, _index, animal_id) = setup();
        add_lab_test(&sync, animal_id);
        add_lab_test(&sync, animal_id);

        let report = sync.reconcile_animal(&animal_id).await.unwrap();
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 0);

        let conn = sync.db.conn();
        assert!(lab_test::get_unsynced_lab_tests(&conn, &animal_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconcile_leaves_metricless_tests_alone() {
        let (sync, _index, animal_id) = setup();
        add_lab_test(&sync, animal_id);
        let bare = {
            let conn = sync.db.conn();
            lab_test::insert_lab_test(
                &conn,
                &NewLabTest {
                    animal_id,
                    test_date: NaiveDate::from_ymd_opt(2025, 10, 9).unwrap(),
                    clinic_name: None,
                    test_type: None,
                    notes: None,
                },
            )
            .unwrap()
            .id
        };

        let report = sync.reconcile_animal(&animal_id).await.unwrap();
        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);

        let conn = sync.db.conn();
        let remaining = lab_test::get_unsynced_lab_tests(&conn, &animal_id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, bare);
    }

    #[tokio::test]
    async fn remove_index_clears_handle() {
        let (sync, index, animal_id) = setup();
        sync.ensure_index(&animal_id).await.unwrap();

        sync.remove_index_best_effort(&animal_id).await;

        let conn = sync.db.conn();
        let animal = animal::get_animal(&conn, &animal_id).unwrap().unwrap();
        assert!(animal.knowledge_base_id.is_none());
        assert!(index.indexes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn standalone_metric_document_lifecycle() {
        let (sync, _index, animal_id) = setup();
        let metric_id = {
            let conn = sync.db.conn();
            health_metric::insert_health_metric(
                &conn,
                &NewHealthMetric {
                    animal_id,
                    lab_test_id: None,
                    metric_name: "Вага".into(),
                    value: 12.5,
                    unit: "кг".into(),
                    reference_min: None,
                    reference_max: None,
                    record_date: NaiveDate::from_ymd_opt(2025, 10, 8).unwrap(),
                    notes: None,
                },
            )
            .unwrap()
            .id
        };

        sync.upsert_metric_document(&metric_id).await.unwrap();

        let conn = sync.db.conn();
        let metric = health_metric::get_health_metric(&conn, &metric_id).unwrap().unwrap();
        assert!(metric.knowledge_base_document_id.is_some());
    }
}
