use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::MessageRole;
use crate::models::ChatMessage;

pub fn insert_chat_message(
    conn: &Connection,
    animal_id: &Uuid,
    role: MessageRole,
    content: &str,
) -> Result<ChatMessage, DatabaseError> {
    let id = Uuid::new_v4();
    let now = Utc::now().naive_utc();
    conn.execute(
        "INSERT INTO chat_messages (id, animal_id, role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id.to_string(),
            animal_id.to_string(),
            role.as_str(),
            content,
            now,
        ],
    )?;
    Ok(ChatMessage {
        id,
        animal_id: *animal_id,
        role,
        content: content.to_string(),
        created_at: now,
    })
}

pub fn get_chat_messages_by_animal(
    conn: &Connection,
    animal_id: &Uuid,
) -> Result<Vec<ChatMessage>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, animal_id, role, content, created_at
         FROM chat_messages WHERE animal_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt.query_map(params![animal_id.to_string()], |row| {
        let id: String = row.get(0)?;
        let animal_id: String = row.get(1)?;
        let role: String = row.get(2)?;
        let content: String = row.get(3)?;
        let created_at: NaiveDateTime = row.get(4)?;
        Ok((id, animal_id, role, content, created_at))
    })?;

    let mut messages = Vec::new();
    for row in rows {
        let (id, animal_id, role, content, created_at) = row?;
        messages.push(ChatMessage {
            id: parse_uuid(&id)?,
            animal_id: parse_uuid(&animal_id)?,
            role: MessageRole::from_str(&role)?,
            content,
            created_at,
        });
    }
    Ok(messages)
}

pub fn delete_chat_message(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM chat_messages WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed > 0)
}

pub fn delete_chat_messages_by_animal(
    conn: &Connection,
    animal_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM chat_messages WHERE animal_id = ?1",
        params![animal_id.to_string()],
    )?;
    Ok(changed)
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

    #[test]
    fn messages_ordered_by_creation() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        insert_chat_message(&conn, &animal_id, MessageRole::User, "Чи все гаразд?").unwrap();
        insert_chat_message(&conn, &animal_id, MessageRole::Assistant, "Так.").unwrap();

        let messages = get_chat_messages_by_animal(&conn, &animal_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn rollback_removes_single_message() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        let msg =
            insert_chat_message(&conn, &animal_id, MessageRole::User, "Питання без відповіді")
                .unwrap();
        assert!(delete_chat_message(&conn, &msg.id).unwrap());
        assert!(get_chat_messages_by_animal(&conn, &animal_id).unwrap().is_empty());
    }

    #[test]
    fn bulk_delete_by_animal() {
        let (db, animal_id) = setup();
        let conn = db.conn();
        insert_chat_message(&conn, &animal_id, MessageRole::User, "1").unwrap();
        insert_chat_message(&conn, &animal_id, MessageRole::Assistant, "2").unwrap();
        assert_eq!(delete_chat_messages_by_animal(&conn, &animal_id).unwrap(), 2);
    }
}
