use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::{Sex, Species};
use crate::models::{Animal, AnimalPatch, NewAnimal};

const COLUMNS: &str = "id, owner_id, name, species, breed, sex, date_of_birth, weight_kg,
     knowledge_base_id, created_at, updated_at";

pub fn insert_animal(conn: &Connection, new: &NewAnimal) -> Result<Animal, DatabaseError> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO animals (id, owner_id, name, species, breed, sex, date_of_birth, weight_kg,
         knowledge_base_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?9)",
        params![
            id.to_string(),
            new.owner_id.to_string(),
            new.name,
            new.species.as_str(),
            new.breed,
            new.sex.as_str(),
            new.date_of_birth,
            new.weight_kg,
            now,
        ],
    )?;
    Ok(Animal {
        id,
        owner_id: new.owner_id,
        name: new.name.clone(),
        species: new.species,
        breed: new.breed.clone(),
        sex: new.sex,
        date_of_birth: new.date_of_birth,
        weight_kg: new.weight_kg,
        knowledge_base_id: None,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_animal(conn: &Connection, id: &Uuid) -> Result<Option<Animal>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM animals WHERE id = ?1"),
        params![id.to_string()],
        animal_from_row,
    )
    .optional()?
    .transpose()
}

pub fn get_animals_by_owner(
    conn: &Connection,
    owner_id: &Uuid,
) -> Result<Vec<Animal>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM animals WHERE owner_id = ?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![owner_id.to_string()], animal_from_row)?;

    let mut animals = Vec::new();
    for row in rows {
        animals.push(row??);
    }
    Ok(animals)
}

pub fn update_animal(
    conn: &Connection,
    id: &Uuid,
    patch: &AnimalPatch,
) -> Result<Option<Animal>, DatabaseError> {
    let now = Utc::now().naive_utc();
    conn.execute(
        "UPDATE animals SET
             name = COALESCE(?2, name),
             breed = COALESCE(?3, breed),
             date_of_birth = COALESCE(?4, date_of_birth),
             weight_kg = COALESCE(?5, weight_kg),
             updated_at = ?6
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.name,
            patch.breed,
            patch.date_of_birth,
            patch.weight_kg,
            now,
        ],
    )?;
    get_animal(conn, id)
}

/// Persist (or clear) the animal's external index handle.
pub fn set_knowledge_base_id(
    conn: &Connection,
    id: &Uuid,
    knowledge_base_id: Option<&str>,
) -> Result<(), DatabaseError> {
    let now = Utc::now().naive_utc();
    let changed = conn.execute(
        "UPDATE animals SET knowledge_base_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), knowledge_base_id, now],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "animal".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_animal(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM animals WHERE id = ?1", params![id.to_string()])?;
    Ok(changed > 0)
}

fn animal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Animal, DatabaseError>> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let species: String = row.get(3)?;
    let breed: String = row.get(4)?;
    let sex: String = row.get(5)?;
    let date_of_birth: Option<NaiveDate> = row.get(6)?;
    let weight_kg: Option<f64> = row.get(7)?;
    let knowledge_base_id: Option<String> = row.get(8)?;
    let created_at: NaiveDateTime = row.get(9)?;
    let updated_at: NaiveDateTime = row.get(10)?;

    Ok((|| {
        Ok(Animal {
            id: parse_uuid(&id)?,
            owner_id: parse_uuid(&owner_id)?,
            name,
            species: Species::from_str(&species)?,
            breed,
            sex: Sex::from_str(&sex)?,
            date_of_birth,
            weight_kg,
            knowledge_base_id,
            created_at,
            updated_at,
        })
    })())
}
