use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Mutex;
use tracing::warn;

use crate::domain::{CatalogItem, Slot};
use crate::embedder::{deserialize_embedding, serialize_embedding};
use crate::errors::AppError;

use super::CatalogRepository;

pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
    db_path: String,
}

impl Clone for SqliteCatalogStore {
    fn clone(&self) -> Self {
        // Re-open a connection for clones (needed when handed into a
        // spawn_blocking closure). Panics on failure: a clone silently
        // falling back to a different database would desynchronize state
        // callers assume is shared.
        let conn = Connection::open(&self.db_path).unwrap_or_else(|e| {
            panic!(
                "failed to re-open catalog DB at {} for clone: {}",
                self.db_path, e
            )
        });
        if let Err(e) = apply_pragmas(&conn) {
            warn!("failed to set PRAGMAs on cloned DB connection: {}", e);
        }
        Self {
            conn: Mutex::new(conn),
            db_path: self.db_path.clone(),
        }
    }
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA busy_timeout=3000;
         PRAGMA foreign_keys=ON;",
    )
}

impl SqliteCatalogStore {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS catalog_items (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL,
                slot            TEXT,
                item_type       TEXT NOT NULL,
                color           TEXT,
                image_ref       TEXT,
                description     TEXT NOT NULL DEFAULT '',
                embedding       BLOB,
                embedding_stale INTEGER NOT NULL DEFAULT 1,
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_catalog_owner ON catalog_items(owner_id);
            CREATE INDEX IF NOT EXISTS idx_catalog_owner_slot ON catalog_items(owner_id, slot);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_string(),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::open(":memory:")
    }

    fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogItem> {
        let raw_slot: Option<String> = row.get("slot")?;
        Ok(CatalogItem {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            slot: raw_slot.and_then(|s| Slot::from_stored(&s)),
            item_type: row.get("item_type")?,
            color: row.get("color")?,
            image_ref: row.get("image_ref")?,
            description: row.get("description")?,
        })
    }
}

#[async_trait]
impl CatalogRepository for SqliteCatalogStore {
    async fn list_by_owner(
        &self,
        owner_id: &str,
        only_with_embedding: bool,
    ) -> Result<Vec<CatalogItem>, AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let sql = if only_with_embedding {
            "SELECT * FROM catalog_items WHERE owner_id = ?1 AND embedding IS NOT NULL"
        } else {
            "SELECT * FROM catalog_items WHERE owner_id = ?1"
        };
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let rows = stmt
            .query_map(params![owner_id], Self::row_to_item)
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::StorageFailure(e.to_string()))
    }

    async fn get(&self, id: &str) -> Result<Option<CatalogItem>, AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        conn.query_row(
            "SELECT * FROM catalog_items WHERE id = ?1",
            params![id],
            Self::row_to_item,
        )
        .optional()
        .map_err(|e| AppError::StorageFailure(e.to_string()))
    }

    async fn list_missing_embeddings(&self, limit: usize) -> Result<Vec<CatalogItem>, AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM catalog_items WHERE embedding IS NULL OR embedding_stale = 1 LIMIT ?1",
            )
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_item)
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::StorageFailure(e.to_string()))
    }

    async fn store_embedding(&self, id: &str, vector: &[f32]) -> Result<(), AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let bytes = serialize_embedding(vector);
        conn.execute(
            "UPDATE catalog_items SET embedding = ?1, embedding_stale = 0 WHERE id = ?2",
            params![bytes, id],
        )
        .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        Ok(())
    }

    async fn stored_embedding(&self, id: &str) -> Result<Option<Vec<f32>>, AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM catalog_items WHERE id = ?1 AND embedding_stale = 0",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        match bytes {
            Some(b) => Ok(Some(
                deserialize_embedding(&b).map_err(|e| AppError::StorageFailure(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn upsert(&self, item: CatalogItem) -> Result<(), AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        let slot = item.slot.map(|s| s.as_str().to_string());
        conn.execute(
            "INSERT INTO catalog_items (id, owner_id, slot, item_type, color, image_ref, description, embedding_stale, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                slot = excluded.slot,
                item_type = excluded.item_type,
                color = excluded.color,
                image_ref = excluded.image_ref,
                description = excluded.description,
                embedding_stale = 1,
                updated_at = datetime('now')",
            params![
                item.id,
                item.owner_id,
                slot,
                item.item_type,
                item.color,
                item.image_ref,
                item.description,
            ],
        )
        .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        conn.execute("DELETE FROM catalog_items WHERE id = ?1", params![id])
            .map_err(|e| AppError::StorageFailure(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, owner: &str, slot: Slot) -> CatalogItem {
        CatalogItem {
            id: id.into(),
            owner_id: owner.into(),
            slot: Some(slot),
            item_type: "T-Shirt".into(),
            color: Some("blue".into()),
            image_ref: None,
            description: "a plain tee".into(),
        }
    }

    #[tokio::test]
    async fn upsert_then_list_by_owner() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        store.upsert(sample("1", "u1", Slot::Top)).await.unwrap();
        store.upsert(sample("2", "u2", Slot::Top)).await.unwrap();

        let items = store.list_by_owner("u1", false).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "1");
    }

    #[tokio::test]
    async fn legacy_shoes_slot_normalizes_on_read() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO catalog_items (id, owner_id, slot, item_type, description) VALUES ('s1','u1','shoes','Loafers','')",
                [],
            )
            .unwrap();
        }
        let item = store.get("s1").await.unwrap().unwrap();
        assert_eq!(item.slot, Some(Slot::Footwear));
    }

    #[tokio::test]
    async fn store_embedding_then_stored_embedding_roundtrips() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        store.upsert(sample("1", "u1", Slot::Top)).await.unwrap();
        store.store_embedding("1", &[0.1, 0.2, 0.3]).await.unwrap();
        let v = store.stored_embedding("1").await.unwrap().unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);

        let with_emb = store.list_by_owner("u1", true).await.unwrap();
        assert_eq!(with_emb.len(), 1);
    }

    #[tokio::test]
    async fn stale_embedding_is_treated_as_a_miss() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        store.upsert(sample("1", "u1", Slot::Top)).await.unwrap();
        store.store_embedding("1", &[0.1, 0.2, 0.3]).await.unwrap();
        assert!(store.stored_embedding("1").await.unwrap().is_some());

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE catalog_items SET embedding_stale = 1 WHERE id = '1'",
                [],
            )
            .unwrap();
        }
        assert!(store.stored_embedding("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = SqliteCatalogStore::open_in_memory().unwrap();
        store.upsert(sample("1", "u1", Slot::Top)).await.unwrap();
        store.delete("1").await.unwrap();
        assert!(store.get("1").await.unwrap().is_none());
    }
}
