//! Rule-based outfit assembly (C6): per-slot soft scoring plus hard
//! avoid/prefer filters, bounded greedy assembly, and outfit-level ranking.

pub mod color;
pub mod rules;

use std::collections::HashMap;

use crate::domain::{CatalogItem, Outfit, Slot};
use crate::embedder::{Embedder, cosine_similarity};

/// Up to `k` outfits (capped at 3) assembled from `candidates` for the given
/// query and occasion label. Never panics; an empty required slot pool
/// yields no outfits rather than a partial one.
pub fn assemble_outfits(
    embedder: &dyn Embedder,
    query: &str,
    candidates: &[CatalogItem],
    intent_label: &str,
    k: usize,
) -> Vec<Outfit> {
    let embed = |text: &str| embedder.embed_query(text).unwrap_or_default();
    assemble_outfits_with(&embed, query, candidates, intent_label, k)
}

/// Same as [`assemble_outfits`] but takes a text-to-vector function directly,
/// so the assembly/ranking logic can be exercised with synthetic vectors in
/// tests without loading the embedding model.
fn assemble_outfits_with(
    embed: &dyn Fn(&str) -> Vec<f32>,
    query: &str,
    candidates: &[CatalogItem],
    intent_label: &str,
    k: usize,
) -> Vec<Outfit> {
    let k = k.min(3).max(1);
    let query_vec = embed(query);
    let intent_vec = embed(intent_label);

    let mut by_slot: HashMap<Slot, Vec<&CatalogItem>> = HashMap::new();
    for item in candidates {
        if let Some(slot) = item.slot {
            by_slot.entry(slot).or_default().push(item);
        }
    }

    let mut pools: HashMap<Slot, Vec<(f32, &CatalogItem)>> = HashMap::new();
    for (&slot, items) in &by_slot {
        let mut scored = score_slot(embed, &query_vec, &intent_vec, intent_label, slot, items);
        apply_hard_filters(intent_label, slot, &mut scored);
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        scored.truncate(8);
        pools.insert(slot, scored);
    }

    for required in Slot::REQUIRED {
        if pools.get(&required).is_none_or(Vec::is_empty) {
            return Vec::new();
        }
    }

    let mut seen_combos = std::collections::HashSet::new();
    let mut outfits = Vec::new();

    for i in 0..10 {
        let top = pick(&pools, Slot::Top, i);
        let bottom = pick(&pools, Slot::Bottom, i);
        let footwear = pick(&pools, Slot::Footwear, i);
        let (Some(top), Some(bottom), Some(footwear)) = (top, bottom, footwear) else {
            continue;
        };
        let layer = pick(&pools, Slot::Layer, 0);
        let accessories = pick(&pools, Slot::Accessories, 0);

        let mut ids = vec![top.id.clone(), bottom.id.clone(), footwear.id.clone()];
        if let Some(l) = &layer {
            ids.push(l.id.clone());
        }
        if let Some(a) = &accessories {
            ids.push(a.id.clone());
        }
        ids.sort();
        if !seen_combos.insert(ids) {
            continue;
        }

        let colors: Vec<&str> = [&Some(top), &Some(bottom), &Some(footwear), &layer, &accessories]
            .into_iter()
            .flatten()
            .filter_map(|item| item.color.as_deref())
            .collect();
        let color_score = color::palette_score(&colors);

        let items_for_semantic = [Some(top), Some(bottom), Some(footwear), layer.clone(), accessories.clone()];
        let sem_scores: Vec<f32> = items_for_semantic
            .iter()
            .flatten()
            .map(|item| {
                let item_vec = embed(&item.name_text());
                cosine_similarity(&query_vec, &item_vec)
            })
            .collect();
        let semantic_score = if sem_scores.is_empty() {
            0.0
        } else {
            sem_scores.iter().sum::<f32>() / sem_scores.len() as f32
        };

        let total = 0.4 * color_score + 0.6 * semantic_score + rules::outfit_level_bias(intent_label);
        let score = (total * 100.0).clamp(0.0, 100.0);

        outfits.push(Outfit {
            top: Some(top.clone()),
            bottom: Some(bottom.clone()),
            footwear: Some(footwear.clone()),
            layer: layer.cloned(),
            accessories: accessories.cloned(),
            score,
            rationale: format!(
                "Matched to your \"{}\" request with a {} occasion in mind.",
                query, intent_label
            ),
        });

        if outfits.len() >= k * 3 {
            break;
        }
    }

    outfits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    outfits.truncate(k);
    outfits
}

fn pick<'a>(
    pools: &'a HashMap<Slot, Vec<(f32, &'a CatalogItem)>>,
    slot: Slot,
    i: usize,
) -> Option<&'a CatalogItem> {
    let pool = pools.get(&slot)?;
    if pool.is_empty() {
        return None;
    }
    let idx = i.min(pool.len() - 1);
    Some(pool[idx].1)
}

fn score_slot<'a>(
    embed: &dyn Fn(&str) -> Vec<f32>,
    query_vec: &[f32],
    intent_vec: &[f32],
    intent_label: &str,
    slot: Slot,
    items: &[&'a CatalogItem],
) -> Vec<(f32, &'a CatalogItem)> {
    let (bonus, penalty) = rules::bias_magnitudes(intent_label);
    let (prefer_tokens, avoid_tokens) = rules::soft_bias_tokens(intent_label, slot);

    items
        .iter()
        .map(|&item| {
            let name_text = item.name_text();
            let item_vec = embed(&name_text);
            let raw = 0.6 * cosine_similarity(query_vec, &item_vec)
                + 0.4 * cosine_similarity(intent_vec, &item_vec);

            let mut bias = 0.0;
            if prefer_tokens.iter().any(|t| name_text.contains(t)) {
                bias += bonus;
            }
            if avoid_tokens.iter().any(|t| name_text.contains(t)) {
                bias += penalty;
            }
            (raw + bias, item)
        })
        .collect()
}

/// Removes items matching an intent's hard-avoid list for `slot`, unless
/// doing so would empty the pool entirely (graceful degradation). Hard-prefer
/// matches are floated to the front.
fn apply_hard_filters(intent_label: &str, slot: Slot, scored: &mut Vec<(f32, &CatalogItem)>) {
    let rule = rules::hard_rules(intent_label)
        .iter()
        .find(|r| r.slot == slot);
    let Some(rule) = rule else { return };

    if !rule.avoid.is_empty() {
        let filtered: Vec<_> = scored
            .iter()
            .filter(|(_, item)| !rule.avoid.iter().any(|t| item.name_text().contains(t)))
            .cloned()
            .collect();
        if !filtered.is_empty() {
            *scored = filtered;
        }
    }

    if !rule.prefer.is_empty() {
        scored.sort_by(|a, b| {
            let a_pref = rule.prefer.iter().any(|t| a.1.name_text().contains(t));
            let b_pref = rule.prefer.iter().any(|t| b.1.name_text().contains(t));
            b_pref.cmp(&a_pref)
        });
    }
}

#[cfg(test)]
mod tests;
