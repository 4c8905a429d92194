use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{LabTest, LabTestPatch, NewLabTest};

const COLUMNS: &str = "id, animal_id, test_date, clinic_name, test_type, notes,
     knowledge_base_document_id, sync_version, created_at, updated_at";

pub fn insert_lab_test(conn: &Connection, new: &NewLabTest) -> Result<LabTest, DatabaseError> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO lab_tests (id, animal_id, test_date, clinic_name, test_type, notes,
         knowledge_base_document_id, sync_version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, ?7, ?7)",
        params![
            id.to_string(),
            new.animal_id.to_string(),
            new.test_date,
            new.clinic_name,
            new.test_type,
            new.notes,
            now,
        ],
    )?;
    Ok(LabTest {
        id,
        animal_id: new.animal_id,
        test_date: new.test_date,
        clinic_name: new.clinic_name.clone(),
        test_type: new.test_type.clone(),
        notes: new.notes.clone(),
        knowledge_base_document_id: None,
        sync_version: 0,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_lab_test(conn: &Connection, id: &Uuid) -> Result<Option<LabTest>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM lab_tests WHERE id = ?1"),
        params![id.to_string()],
        lab_test_from_row,
    )
    .optional()?
    .transpose()
}

pub fn get_lab_tests_by_animal(
    conn: &Connection,
    animal_id: &Uuid,
) -> Result<Vec<LabTest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM lab_tests WHERE animal_id = ?1 ORDER BY test_date DESC"
    ))?;
    let rows = stmt.query_map(params![animal_id.to_string()], lab_test_from_row)?;

    let mut tests = Vec::new();
    for row in rows {
        tests.push(row??);
    }
    Ok(tests)
}

/// Lab tests whose external document is missing — candidates for resync.
pub fn get_unsynced_lab_tests(
    conn: &Connection,
    animal_id: &Uuid,
) -> Result<Vec<LabTest>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM lab_tests
         WHERE animal_id = ?1 AND knowledge_base_document_id IS NULL
         ORDER BY test_date DESC"
    ))?;
    let rows = stmt.query_map(params![animal_id.to_string()], lab_test_from_row)?;

    let mut tests = Vec::new();
    for row in rows {
        tests.push(row??);
    }
    Ok(tests)
}

pub fn update_lab_test(
    conn: &Connection,
    id: &Uuid,
    patch: &LabTestPatch,
) -> Result<Option<LabTest>, DatabaseError> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "UPDATE lab_tests SET
             test_date = COALESCE(?2, test_date),
             clinic_name = COALESCE(?3, clinic_name),
             test_type = COALESCE(?4, test_type),
             notes = COALESCE(?5, notes),
             updated_at = ?6
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.test_date,
            patch.clinic_name,
            patch.test_type,
            patch.notes,
            now,
        ],
    )?;
    get_lab_test(conn, id)
}

/// Persist a freshly uploaded document handle, guarded by the optimistic
/// sync version. Returns `false` when the version moved underneath the
/// caller (a concurrent regeneration won) — the caller must treat its
/// upload as stale.
pub fn set_document_id_if_version(
    conn: &Connection,
    id: &Uuid,
    document_id: Option<&str>,
    expected_version: i64,
) -> Result<bool, DatabaseError> {
    let now = Utc::now().naive_utc();
    let changed = conn.execute(
        "UPDATE lab_tests
         SET knowledge_base_document_id = ?2, sync_version = sync_version + 1, updated_at = ?3
         WHERE id = ?1 AND sync_version = ?4",
        params![id.to_string(), document_id, now, expected_version],
    )?;
    Ok(changed > 0)
}

/// Unconditionally drop the document handle (compensation after a failed
/// replace: the old document is gone, the handle must not dangle).
pub fn clear_document_id(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "UPDATE lab_tests
         SET knowledge_base_document_id = NULL, sync_version = sync_version + 1, updated_at = ?2
         WHERE id = ?1",
        params![id.to_string(), now],
    )?;
    Ok(())
}

pub fn delete_lab_test(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM lab_tests WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed > 0)
}

fn lab_test_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<LabTest, DatabaseError>> {
    let id: String = row.get(0)?;
    let animal_id: String = row.get(1)?;
    let test_date: NaiveDate = row.get(2)?;
    let clinic_name: Option<String> = row.get(3)?;
    let test_type: Option<String> = row.get(4)?;
    let notes: Option<String> = row.get(5)?;
    let knowledge_base_document_id: Option<String> = row.get(6)?;
    let sync_version: i64 = row.get(7)?;
    let created_at: NaiveDateTime = row.get(8)?;
    let updated_at: NaiveDateTime = row.get(9)?;

    Ok((|| {
        Ok(LabTest {
            id: parse_uuid(&id)?,
            animal_id: parse_uuid(&animal_id)?,
            test_date,
            clinic_name,
            test_type,
            notes,
            knowledge_base_document_id,
            sync_version,
            created_at,
            updated_at,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::animal::insert_animal;
    use crate::db::repository::owner::insert_owner;
    use crate::db::Database;
    use crate::models::enums::{Sex, Species};
    use crate::models::{NewAnimal, NewOwner};

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let animal_id = {
            let conn = db.conn();
            let owner = insert_owner(
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
            insert_animal(
                &conn,
                &NewAnimal {
                    owner_id: owner.id,
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
        (db, animal_id)
    }

    fn new_test(animal_id: Uuid) -> NewLabTest {
        NewLabTest {
            animal_id,
            test_date: NaiveDate::from_ymd_opt(2025, 10, 8).unwrap(),
            clinic_name: Some("ВетКлініка".into()),
            test_type: Some("Аналіз крові".into()),
            notes: None,
        }
    }

    #[test]
    fn insert_starts_unsynced_at_version_zero() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        let test = insert_lab_test(&conn, &new_test(animal_id)).unwrap();
        assert_eq!(test.sync_version, 0);
        assert!(test.knowledge_base_document_id.is_none());

        let unsynced = get_unsynced_lab_tests(&conn, &animal_id).unwrap();
        assert_eq!(unsynced.len(), 1);
    }

    #[test]
    fn set_document_id_increments_version() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        let test = insert_lab_test(&conn, &new_test(animal_id)).unwrap();

        assert!(set_document_id_if_version(&conn, &test.id, Some("file_1"), 0).unwrap());
        let fetched = get_lab_test(&conn, &test.id).unwrap().unwrap();
        assert_eq!(fetched.knowledge_base_document_id.as_deref(), Some("file_1"));
        assert_eq!(fetched.sync_version, 1);

        assert!(get_unsynced_lab_tests(&conn, &animal_id).unwrap().is_empty());
    }

    #[test]
    fn stale_version_rejected() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        let test = insert_lab_test(&conn, &new_test(animal_id)).unwrap();

        assert!(set_document_id_if_version(&conn, &test.id, Some("file_1"), 0).unwrap());
        // A second writer still holding version 0 loses the race.
        assert!(!set_document_id_if_version(&conn, &test.id, Some("file_2"), 0).unwrap());

        let fetched = get_lab_test(&conn, &test.id).unwrap().unwrap();
        assert_eq!(fetched.knowledge_base_document_id.as_deref(), Some("file_1"));
    }

    #[test]
    fn clear_document_id_resets_handle() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        let test = insert_lab_test(&conn, &new_test(animal_id)).unwrap();
        assert!(set_document_id_if_version(&conn, &test.id, Some("file_1"), 0).unwrap());

        clear_document_id(&conn, &test.id).unwrap();
        let fetched = get_lab_test(&conn, &test.id).unwrap().unwrap();
        assert!(fetched.knowledge_base_document_id.is_none());
        assert_eq!(fetched.sync_version, 2);
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        let test = insert_lab_test(&conn, &new_test(animal_id)).unwrap();

        let patch = LabTestPatch {
            notes: Some("повторити через місяць".into()),
            ..Default::default()
        };
        let updated = update_lab_test(&conn, &test.id, &patch).unwrap().unwrap();
        assert_eq!(updated.clinic_name.as_deref(), Some("ВетКлініка"));
        assert_eq!(updated.notes.as_deref(), Some("повторити через місяць"));
    }
}
