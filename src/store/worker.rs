//! Background embedding worker: batches enqueued items and persists their
//! vectors in one commit per batch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::embedder::LazyEmbeddingService;
use crate::store::CatalogRepository;

/// Default micro-batch size: drain up to this many items per round.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Default micro-batch timeout: flush whatever is queued after this long.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(2);
/// Bound on the enqueue channel; beyond this, new jobs are dropped with a warning.
const QUEUE_CAPACITY: usize = 1024;

pub struct EmbeddingWorker {
    tx: mpsc::Sender<String>,
}

impl EmbeddingWorker {
    /// Spawns the supervised background task and returns a handle for
    /// enqueuing refresh jobs. The task runs for the lifetime of the process.
    pub fn spawn(
        store: Arc<dyn CatalogRepository>,
        embedder: Arc<LazyEmbeddingService>,
        batch_size: usize,
        batch_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(Self::run(store, embedder, rx, batch_size, batch_timeout));
        Self { tx }
    }

    /// Non-blocking, best-effort enqueue. Drops the job (with a warning) if
    /// the queue is full rather than block the caller.
    pub fn enqueue(&self, item_id: String) {
        if let Err(e) = self.tx.try_send(item_id) {
            warn!("embedding queue full, dropping refresh job: {}", e);
        }
    }

    async fn run(
        store: Arc<dyn CatalogRepository>,
        embedder: Arc<LazyEmbeddingService>,
        mut rx: mpsc::Receiver<String>,
        batch_size: usize,
        batch_timeout: Duration,
    ) {
        info!(
            "embedding worker started (batch_size={}, batch_timeout={:?})",
            batch_size, batch_timeout
        );
        loop {
            let mut batch = Vec::with_capacity(batch_size);
            match rx.recv().await {
                Some(first) => batch.push(first),
                None => {
                    info!("embedding worker shutting down: channel closed");
                    return;
                }
            }

            let deadline = tokio::time::Instant::now() + batch_timeout;
            while batch.len() < batch_size {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match timeout(remaining, rx.recv()).await {
                    Ok(Some(id)) => {
                        // Drop-oldest-duplicate: coalesce repeat enqueues of the same item.
                        if let Some(pos) = batch.iter().position(|x| x == &id) {
                            batch.remove(pos);
                        }
                        batch.push(id);
                    }
                    Ok(None) => break,
                    Err(_) => break,
                }
            }

            Self::process_batch(&store, &embedder, &batch).await;
        }
    }

    async fn process_batch(
        store: &Arc<dyn CatalogRepository>,
        embedder: &Arc<LazyEmbeddingService>,
        batch: &[String],
    ) {
        if batch.is_empty() {
            return;
        }
        let Some(svc) = embedder.get() else {
            debug!("embedding model not ready yet, re-queuing {} items later", batch.len());
            return;
        };

        let mut items = Vec::with_capacity(batch.len());
        for id in batch {
            match store.get(id).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => debug!("embedding job for missing item {} skipped", id),
                Err(e) => warn!("failed to load item {} for embedding: {}", id, e),
            }
        }
        if items.is_empty() {
            return;
        }

        let texts: Vec<String> = items.iter().map(|i| i.name_text()).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        match svc.embed_texts(&text_refs) {
            Ok(vectors) => {
                for (item, vector) in items.iter().zip(vectors.iter()) {
                    if let Err(e) = store.store_embedding(&item.id, vector).await {
                        warn!("failed to persist embedding for {}: {}", item.id, e);
                    }
                }
                debug!("persisted {} embeddings in one batch", items.len());
            }
            Err(e) => warn!("batch embedding failed, will retry on next Retriever miss: {}", e),
        }
    }
}

/// Refreshes every item lacking an embedding in chunks, committing each
/// chunk independently. Returns the number of items successfully refreshed.
/// Does not touch the live worker queue; intended for an administrative
/// "reindex everything" operation run off the request path.
pub async fn batch_refresh_embeddings(
    store: &Arc<dyn CatalogRepository>,
    embedder: &crate::embedder::EmbeddingService,
    chunk_size: usize,
) -> anyhow::Result<usize> {
    let mut refreshed = 0;
    loop {
        let items = store.list_missing_embeddings(chunk_size).await?;
        if items.is_empty() {
            break;
        }
        let texts: Vec<String> = items.iter().map(|i| i.name_text()).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = embedder.embed_texts(&text_refs)?;
        for (item, vector) in items.iter().zip(vectors.iter()) {
            store.store_embedding(&item.id, vector).await?;
        }
        refreshed += items.len();
        if items.len() < chunk_size {
            break;
        }
    }
    Ok(refreshed)
}
