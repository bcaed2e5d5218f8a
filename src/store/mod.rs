//! Catalog persistence: the collaborator that owns `CatalogItem` rows.

pub mod sqlite;
pub mod worker;

use crate::domain::CatalogItem;
use crate::errors::AppError;
use async_trait::async_trait;

/// Persisted-state boundary the core consumes but does not own.
///
/// A different backend (Postgres, a remote service) can be swapped in by
/// implementing this trait; the rest of the core only ever talks to it.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All items owned by `owner_id`. When `only_with_embedding` is true,
    /// rows with a null `embedding` are excluded.
    async fn list_by_owner(
        &self,
        owner_id: &str,
        only_with_embedding: bool,
    ) -> Result<Vec<CatalogItem>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<CatalogItem>, AppError>;

    /// Items lacking a stored embedding, across all owners, up to `limit`.
    async fn list_missing_embeddings(&self, limit: usize) -> Result<Vec<CatalogItem>, AppError>;

    async fn store_embedding(&self, id: &str, vector: &[f32]) -> Result<(), AppError>;

    async fn stored_embedding(&self, id: &str) -> Result<Option<Vec<f32>>, AppError>;

    async fn upsert(&self, item: CatalogItem) -> Result<(), AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;
}
