use crate::db::Db;
use crate::error::{KintreeError, Result};
use crate::store::Relationship;
use rusqlite::{params, Connection, OptionalExtension};

fn find_relation_sync(
    conn: &Connection,
    parent_id: i64,
    child_id: i64,
) -> Result<Option<Relationship>> {
    let relation = conn
        .query_row(
            "SELECT id, parent_id, child_id FROM relationships \
             WHERE parent_id = ?1 AND child_id = ?2 LIMIT 1",
            params![parent_id, child_id],
            |row| {
                Ok(Relationship {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    child_id: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(relation)
}

/// All parent ids of a child. May contain duplicates if the edge set is
/// malformed; deduplication is the kinship resolver's job.
pub async fn parents_of(db: &Db, child_id: i64) -> Result<Vec<i64>> {
    db.with_connection(move |conn| {
        let mut stmt =
            conn.prepare("SELECT parent_id FROM relationships WHERE child_id = ?1")?;
        let ids = stmt
            .query_map(params![child_id], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(ids)
    })
    .await
}

/// All child ids of a parent
pub async fn children_of(db: &Db, parent_id: i64) -> Result<Vec<i64>> {
    db.with_connection(move |conn| {
        let mut stmt =
            conn.prepare("SELECT child_id FROM relationships WHERE parent_id = ?1")?;
        let ids = stmt
            .query_map(params![parent_id], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(ids)
    })
    .await
}

/// Look up a relation by its endpoints
pub async fn find_relation(db: &Db, parent_id: i64, child_id: i64) -> Result<Option<Relationship>> {
    db.with_connection(move |conn| find_relation_sync(conn, parent_id, child_id))
        .await
}

/// Record a parent-child relation. Fails if the same pair is already recorded.
pub async fn insert_relation(db: &Db, parent_id: i64, child_id: i64) -> Result<Relationship> {
    db.with_connection(move |conn| {
        if find_relation_sync(conn, parent_id, child_id)?.is_some() {
            return Err(KintreeError::RelationExists {
                parent_id,
                child_id,
            });
        }
        conn.execute(
            "INSERT INTO relationships (parent_id, child_id) VALUES (?1, ?2)",
            params![parent_id, child_id],
        )?;
        Ok(Relationship {
            id: conn.last_insert_rowid(),
            parent_id,
            child_id,
        })
    })
    .await
}

/// Delete a relation by its endpoints
pub async fn delete_relation(db: &Db, parent_id: i64, child_id: i64) -> Result<()> {
    db.with_connection(move |conn| {
        let deleted = conn.execute(
            "DELETE FROM relationships WHERE parent_id = ?1 AND child_id = ?2",
            params![parent_id, child_id],
        )?;
        if deleted == 0 {
            return Err(KintreeError::RelationNotFound {
                parent_id,
                child_id,
            });
        }
        Ok(())
    })
    .await
}

/// Fetch all relations, ascending id order
pub async fn list_relations(db: &Db) -> Result<Vec<Relationship>> {
    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT id, parent_id, child_id FROM relationships ORDER BY id")?;
        let relations = stmt
            .query_map([], |row| {
                Ok(Relationship {
                    id: row.get(0)?,
                    parent_id: row.get(1)?,
                    child_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        Ok(relations)
    })
    .await
}
