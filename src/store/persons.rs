use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::store::{Person, PersonInput, PersonPatch};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn row_to_person(row: &Row<'_>) -> rusqlite::Result<Person> {
    let dob_text: String = row.get(4)?;
    let dob = NaiveDate::parse_from_str(&dob_text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Person {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        gender: row.get(3)?,
        dob,
    })
}

fn person_by_id_sync(conn: &Connection, id: i64) -> Result<Option<Person>> {
    let person = conn
        .query_row(
            "SELECT id, first_name, last_name, gender, dob FROM persons WHERE id = ?1",
            params![id],
            row_to_person,
        )
        .optional()?;
    Ok(person)
}

/// Lowest positive id not currently in use. Deleted ids get recycled.
fn next_available_id(conn: &Connection) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM persons ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    let mut next_id = 1;
    for id in ids {
        if id == next_id {
            next_id += 1;
        } else if id > next_id {
            break;
        }
    }
    Ok(next_id)
}

/// Fetch a single person by id
pub async fn person_by_id(db: &Db, id: i64) -> Result<Option<Person>> {
    db.with_connection(move |conn| person_by_id_sync(conn, id))
        .await
}

/// Fetch all persons, ascending id order
pub async fn list_persons(db: &Db) -> Result<Vec<Person>> {
    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT id, first_name, last_name, gender, dob FROM persons ORDER BY id")?;
        let persons = stmt
            .query_map([], row_to_person)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(persons)
    })
    .await
}

/// Resolve a set of ids to person records, ascending id order.
/// Ids with no record are silently skipped (dangling-edge tolerance).
pub async fn persons_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<Person>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.with_connection(move |conn| {
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT id, first_name, last_name, gender, dob FROM persons \
             WHERE id IN ({}) ORDER BY id",
            placeholders
        );
        let mut stmt = conn.prepare(&query)?;
        let persons = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), row_to_person)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(persons)
    })
    .await
}

/// Insert a new person, assigning the lowest available id
pub async fn insert_person(db: &Db, input: PersonInput) -> Result<Person> {
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        let id = next_available_id(&tx)?;
        tx.execute(
            "INSERT INTO persons (id, first_name, last_name, gender, dob) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                input.first_name,
                input.last_name,
                input.gender,
                input.dob.format(DATE_FORMAT).to_string(),
            ],
        )?;
        tx.commit()?;
        Ok(Person {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            gender: input.gender,
            dob: input.dob,
        })
    })
    .await
}

/// Apply a partial update to an existing person
pub async fn update_person(db: &Db, id: i64, patch: PersonPatch) -> Result<Person> {
    db.with_connection(move |conn| {
        let mut person =
            person_by_id_sync(conn, id)?.ok_or(KintreeError::PersonNotFound(id))?;

        if let Some(first_name) = patch.first_name {
            person.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            person.last_name = last_name;
        }
        if let Some(gender) = patch.gender {
            person.gender = gender;
        }
        if let Some(dob) = patch.dob {
            person.dob = dob;
        }

        conn.execute(
            "UPDATE persons SET first_name = ?2, last_name = ?3, gender = ?4, dob = ?5 \
             WHERE id = ?1",
            params![
                person.id,
                person.first_name,
                person.last_name,
                person.gender,
                person.dob.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(person)
    })
    .await
}

/// Delete a person and every relationship referencing it
pub async fn delete_person(db: &Db, id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM persons WHERE id = ?1", params![id], |_| {
                Ok(())
            })
            .optional()?
            .is_some();
        if !exists {
            return Err(KintreeError::PersonNotFound(id));
        }
        tx.execute(
            "DELETE FROM relationships WHERE parent_id = ?1 OR child_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM persons WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::store;
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (db, temp_dir)
    }

    fn input(first: &str, last: &str) -> PersonInput {
        PersonInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            gender: "female".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let (db, _temp) = setup_db().await;
        let a = insert_person(&db, input("Ada", "Lovelace")).await.unwrap();
        let b = insert_person(&db, input("Grace", "Hopper")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn test_insert_recycles_lowest_free_id() {
        let (db, _temp) = setup_db().await;
        insert_person(&db, input("A", "A")).await.unwrap();
        insert_person(&db, input("B", "B")).await.unwrap();
        insert_person(&db, input("C", "C")).await.unwrap();

        delete_person(&db, 2).await.unwrap();
        let d = insert_person(&db, input("D", "D")).await.unwrap();
        assert_eq!(d.id, 2);
    }

    #[tokio::test]
    async fn test_person_roundtrip() {
        let (db, _temp) = setup_db().await;
        let inserted = insert_person(&db, input("Ada", "Lovelace")).await.unwrap();
        let fetched = person_by_id(&db, inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.dob, NaiveDate::from_ymd_opt(1990, 6, 15).unwrap());
    }

    #[tokio::test]
    async fn test_person_by_id_absent() {
        let (db, _temp) = setup_db().await;
        assert!(person_by_id(&db, 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_partial() {
        let (db, _temp) = setup_db().await;
        let p = insert_person(&db, input("Ada", "Lovelace")).await.unwrap();

        let patch = PersonPatch {
            last_name: Some("Byron".to_string()),
            ..Default::default()
        };
        let updated = update_person(&db, p.id, patch).await.unwrap();
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Byron");

        let fetched = person_by_id(&db, p.id).await.unwrap().unwrap();
        assert_eq!(fetched.last_name, "Byron");
    }

    #[tokio::test]
    async fn test_update_missing_person() {
        let (db, _temp) = setup_db().await;
        let err = update_person(&db, 42, PersonPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, KintreeError::PersonNotFound(42)));
    }

    #[tokio::test]
    async fn test_delete_cascades_relationships() {
        let (db, _temp) = setup_db().await;
        let parent = insert_person(&db, input("A", "A")).await.unwrap();
        let child = insert_person(&db, input("B", "B")).await.unwrap();
        store::insert_relation(&db, parent.id, child.id).await.unwrap();

        delete_person(&db, parent.id).await.unwrap();

        assert!(person_by_id(&db, parent.id).await.unwrap().is_none());
        assert!(store::list_relations(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_person() {
        let (db, _temp) = setup_db().await;
        let err = delete_person(&db, 7).await.unwrap_err();
        assert!(matches!(err, KintreeError::PersonNotFound(7)));
    }

    #[tokio::test]
    async fn test_persons_by_ids_skips_missing() {
        let (db, _temp) = setup_db().await;
        let a = insert_person(&db, input("A", "A")).await.unwrap();
        let b = insert_person(&db, input("B", "B")).await.unwrap();

        let found = persons_by_ids(&db, &[b.id, a.id, 999]).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]); // ascending, 999 skipped
    }

    #[tokio::test]
    async fn test_persons_by_ids_empty() {
        let (db, _temp) = setup_db().await;
        assert!(persons_by_ids(&db, &[]).await.unwrap().is_empty());
    }
}
