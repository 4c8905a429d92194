use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{NewOwner, Owner, OwnerPatch};

pub fn insert_owner(conn: &Connection, new: &NewOwner) -> Result<Owner, DatabaseError> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO owners (id, first_name, last_name, email, phone, city, preferred_language, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.to_string(),
            new.first_name,
            new.last_name,
            new.email,
            new.phone,
            new.city,
            new.preferred_language,
            now,
        ],
    )?;
    Ok(Owner {
        id,
        first_name: new.first_name.clone(),
        last_name: new.last_name.clone(),
        email: new.email.clone(),
        phone: new.phone.clone(),
        city: new.city.clone(),
        preferred_language: new.preferred_language.clone(),
        created_at: now,
    })
}

pub fn get_owner(conn: &Connection, id: &Uuid) -> Result<Option<Owner>, DatabaseError> {
    conn.query_row(
        "SELECT id, first_name, last_name, email, phone, city, preferred_language, created_at
         FROM owners WHERE id = ?1",
        params![id.to_string()],
        owner_from_row,
    )
    .optional()?
    .transpose()
}

pub fn get_owner_by_email(conn: &Connection, email: &str) -> Result<Option<Owner>, DatabaseError> {
    conn.query_row(
        "SELECT id, first_name, last_name, email, phone, city, preferred_language, created_at
         FROM owners WHERE email = ?1",
        params![email],
        owner_from_row,
    )
    .optional()?
    .transpose()
}

pub fn update_owner(
    conn: &Connection,
    id: &Uuid,
    patch: &OwnerPatch,
) -> Result<Option<Owner>, DatabaseError> {
    conn.execute(
        "UPDATE owners SET
             first_name = COALESCE(?2, first_name),
             last_name = COALESCE(?3, last_name),
             email = COALESCE(?4, email),
             phone = COALESCE(?5, phone),
             city = COALESCE(?6, city),
             preferred_language = COALESCE(?7, preferred_language)
         WHERE id = ?1",
        params![
            id.to_string(),
            patch.first_name,
            patch.last_name,
            patch.email,
            patch.phone,
            patch.city,
            patch.preferred_language,
        ],
    )?;
    get_owner(conn, id)
}

fn owner_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Owner, DatabaseError>> {
    let id: String = row.get(0)?;
    let first_name: String = row.get(1)?;
    let last_name: String = row.get(2)?;
    let email: String = row.get(3)?;
    let phone: Option<String> = row.get(4)?;
    let city: Option<String> = row.get(5)?;
    let preferred_language: String = row.get(6)?;
    let created_at: NaiveDateTime = row.get(7)?;
    Ok(parse_uuid(&id).map(|id| Owner {
        id,
        first_name,
        last_name,
        email,
        phone,
        city,
        preferred_language,
        created_at,
    }))
}
