//! Retrieval-augmented filtering (C4): narrows a user's catalog to a
//! query-relevant candidate set before the selector runs.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{CatalogItem, Slot};
use crate::embedder::{Embedder, cosine_similarity};
use crate::store::CatalogRepository;

struct Thresholds {
    per_slot: usize,
    min_per_slot: usize,
    min_total: usize,
}

fn adaptive_thresholds(n: usize) -> Thresholds {
    let n = n as f64;
    if n < 20.0 {
        Thresholds {
            per_slot: n as usize,
            min_per_slot: 1,
            min_total: (n as usize / 2).max(3),
        }
    } else if n < 100.0 {
        let per_slot = (n / 10.0).clamp(10.0, 15.0) as usize;
        Thresholds {
            per_slot,
            min_per_slot: (per_slot / 3).max(2),
            min_total: (n as usize / 5).max(8),
        }
    } else if n < 500.0 {
        let per_slot = (n / 20.0).clamp(15.0, 25.0) as usize;
        Thresholds {
            per_slot,
            min_per_slot: (per_slot / 4).max(3),
            min_total: (n as usize / 10).max(12),
        }
    } else {
        let per_slot = (n / 30.0).clamp(20.0, 30.0) as usize;
        Thresholds {
            per_slot,
            min_per_slot: (per_slot / 3).max(5),
            min_total: (n as usize / 15).max(15),
        }
    }
}

/// Retrieves the candidate items for a query, falling back to the full
/// owned catalog whenever filtering would be unsafe or unnecessary.
pub struct Retriever {
    store: Arc<dyn CatalogRepository>,
}

impl Retriever {
    pub fn new(store: Arc<dyn CatalogRepository>) -> Self {
        Self { store }
    }

    /// `intent_label` is the already-classified occasion label (see `intent`),
    /// embedded once here to bias scores toward items matching the occasion.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        owner_id: &str,
        query: &str,
        intent_label: &str,
    ) -> Vec<CatalogItem> {
        let owned = match self.store.list_by_owner(owner_id, false).await {
            Ok(items) => items,
            Err(e) => {
                warn!("retriever: failed to load catalog for {}: {}", owner_id, e);
                return Vec::new();
            }
        };
        if owned.is_empty() {
            return Vec::new();
        }

        let n = owned.len();
        let thresholds = adaptive_thresholds(n);
        if n < thresholds.min_total {
            debug!("retriever: catalog size {} below min_total, returning all", n);
            return owned;
        }

        let query_vec = match embedder.embed_query(query) {
            Ok(v) => v,
            Err(e) => {
                warn!("retriever: query embedding failed, returning full catalog: {}", e);
                return owned;
            }
        };
        let intent_vec = embedder.embed_query(intent_label).ok();

        let mut scored: Vec<(f32, &CatalogItem)> = Vec::with_capacity(owned.len());
        for item in &owned {
            let item_vec = match self.store.stored_embedding(&item.id).await {
                Ok(Some(v)) => v,
                _ => match embedder.embed_query(&item.name_text()) {
                    Ok(v) => v,
                    Err(_) => {
                        scored.push((0.0, item));
                        continue;
                    }
                },
            };
            let query_sim = cosine_similarity(&query_vec, &item_vec);
            let score = match &intent_vec {
                Some(iv) => 0.7 * query_sim + 0.3 * cosine_similarity(iv, &item_vec),
                None => query_sim,
            };
            scored.push((score, item));
        }

        let mut by_slot: HashMap<Option<Slot>, Vec<(f32, &CatalogItem)>> = HashMap::new();
        for (score, item) in scored {
            by_slot.entry(item.slot).or_default().push((score, item));
        }

        let mut retained: Vec<CatalogItem> = Vec::new();
        for bucket in by_slot.values_mut() {
            bucket.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.1.id.cmp(&b.1.id))
            });
            bucket.truncate(thresholds.per_slot);
            retained.extend(bucket.iter().map(|(_, item)| (*item).clone()));
        }

        for slot in Slot::REQUIRED {
            let count = retained.iter().filter(|i| i.slot == Some(slot)).count();
            if count < thresholds.min_per_slot {
                debug!(
                    "retriever: slot {:?} under min_per_slot ({} < {}), falling back to full catalog",
                    slot, count, thresholds.min_per_slot
                );
                return owned;
            }
        }
        if retained.len() < thresholds.min_total {
            debug!(
                "retriever: retained {} under min_total {}, falling back to full catalog",
                retained.len(),
                thresholds.min_total
            );
            return owned;
        }

        retained
    }
}
