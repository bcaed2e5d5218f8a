//! Suggestion Orchestrator (C8): the single state machine a request walks
//! through, wiring together the cache, retriever, LLM delegate, and selector.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::SuggestionCache;
use crate::domain::SuggestionResult;
use crate::embedder::Embedder;
use crate::intent::{classify_intent_zero_shot, classify_query_shape};
use crate::llm::OutfitDelegate;
use crate::retriever::Retriever;
use crate::selector;
use crate::store::CatalogRepository;

pub struct Orchestrator {
    store: Arc<dyn CatalogRepository>,
    retriever: Retriever,
    cache: Arc<SuggestionCache>,
    delegate: Option<Arc<dyn OutfitDelegate>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CatalogRepository>,
        cache: Arc<SuggestionCache>,
        delegate: Option<Arc<dyn OutfitDelegate>>,
    ) -> Self {
        let retriever = Retriever::new(store.clone());
        Self { store, retriever, cache, delegate }
    }

    /// Runs the full RECV → CACHE_LOOKUP → LOAD_CANDIDATES → LLM_ATTEMPT? →
    /// (rule engine) → CACHE_STORE → RESPOND pipeline for one request.
    pub async fn suggest(
        &self,
        embedder: &dyn Embedder,
        owner_id: &str,
        query: &str,
        limit: usize,
    ) -> Arc<SuggestionResult> {
        if let Some(cached) = self.cache.get(owner_id, query) {
            debug!("orchestrator: cache hit for owner {}", owner_id);
            return cached;
        }

        let (_shape, item_type) = classify_query_shape(query);
        let classified = classify_intent_zero_shot(embedder, query);
        let intent_label = classified.label.clone();

        let candidates = self.retriever.retrieve(embedder, owner_id, query, &intent_label).await;
        if candidates.is_empty() {
            // Distinguish "no items at all" from "retrieval failed" is not
            // observable from here; both produce an empty, schema-conformant
            // response per §8 scenario 1.
            let owned = self.store.list_by_owner(owner_id, false).await.unwrap_or_default();
            let intent = if owned.is_empty() { "none".to_string() } else { intent_label };
            let result = Arc::new(SuggestionResult::empty(intent));
            return result;
        }

        if let Some(delegate) = &self.delegate {
            let k = limit.clamp(1, 3);
            match delegate.suggest(query, &intent_label, item_type, &candidates).await {
                Some(mut outfits) => {
                    for outfit in &mut outfits {
                        outfit.score = 100.0;
                    }
                    outfits.truncate(k);
                    let result = Arc::new(SuggestionResult { intent: intent_label, outfits });
                    self.cache.put(owner_id, query, result.clone());
                    return result;
                }
                None => {
                    debug!("orchestrator: llm delegate unavailable or invalid, falling back to rule engine");
                }
            }
        }

        let outfits = selector::assemble_outfits(embedder, query, &candidates, &intent_label, limit);
        let result = Arc::new(SuggestionResult { intent: intent_label, outfits });
        if !result.outfits.is_empty() {
            self.cache.put(owner_id, query, result.clone());
        } else {
            warn!("orchestrator: rule engine produced no outfits for owner {}", owner_id);
        }
        result
    }
}
