//! Intent classification (C5): a zero-shot occasion label plus a fast
//! keyword-based request-shape classifier.

use crate::embedder::{Embedder, cosine_similarity};

pub const LABELS: [&str; 7] = [
    "business", "formal", "party", "casual", "workout", "beach", "hiking",
];

fn seeds(label: &str) -> &'static [&'static str] {
    match label {
        "business" => &[
            "professional business attire for the office",
            "smart business casual outfit for work meetings",
        ],
        "formal" => &[
            "formal black tie evening wear",
            "elegant formal attire for a wedding or gala",
        ],
        "party" => &[
            "fun outfit for a night out party",
            "stylish going-out clubbing look",
        ],
        "casual" => &[
            "relaxed everyday casual clothing",
            "comfortable weekend outfit",
        ],
        "workout" => &[
            "athletic gym workout clothes",
            "activewear for running and training",
        ],
        "beach" => &[
            "breezy beach vacation outfit",
            "swimwear and sandals for the beach",
        ],
        "hiking" => &[
            "rugged outdoor hiking gear",
            "trail-ready hiking outfit with boots",
        ],
        _ => &[],
    }
}

#[derive(Debug, Clone)]
pub struct IntentScore {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct ClassifiedIntent {
    pub label: String,
    pub ranked: Vec<IntentScore>,
}

/// Zero-shot intent classification: embed the query once, compare against
/// two hand-written seed phrases per label, and pick the highest mean
/// cosine similarity. Falls back to "casual" on embedding failure.
pub fn classify_intent_zero_shot(embedder: &dyn Embedder, query: &str) -> ClassifiedIntent {
    let query_vec = match embedder.embed_query(query) {
        Ok(v) => v,
        Err(_) => {
            return ClassifiedIntent {
                label: "casual".to_string(),
                ranked: Vec::new(),
            };
        }
    };

    let mut ranked = Vec::with_capacity(LABELS.len());
    for &label in &LABELS {
        let mut sims = Vec::new();
        for seed in seeds(label) {
            if let Ok(seed_vec) = embedder.embed_query(seed) {
                sims.push(cosine_similarity(&query_vec, &seed_vec));
            }
        }
        let mean = if sims.is_empty() {
            0.0
        } else {
            sims.iter().sum::<f32>() / sims.len() as f32
        };
        ranked.push(IntentScore {
            label: label.to_string(),
            score: mean,
        });
    }
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let label = ranked
        .first()
        .map(|r| r.label.clone())
        .unwrap_or_else(|| "casual".to_string());
    ClassifiedIntent { label, ranked }
}

/// What kind of answer the user wants, independent of the occasion label.
/// Informational metadata threaded through to the LLM delegate's prompt and
/// the response's `item_type` field — it does not change which selector
/// codepath runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    FullOutfit,
    ItemSearch,
    BlendedOutfitItem,
    ActivityItem,
}

impl QueryShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullOutfit => "full_outfit",
            Self::ItemSearch => "item_search",
            Self::BlendedOutfitItem => "blended_outfit_item",
            Self::ActivityItem => "activity_item",
        }
    }
}

const ITEM_KEYWORDS: &[&str] = &[
    "shoe", "shoes", "sneaker", "sneakers", "trainers", "boots", "loafers", "slides", "rings",
];
const ACTIVITY_KEYWORDS: &[(&str, &[&str])] = &[
    ("footwear", &["walk", "walking", "run", "running", "jog", "jogging"]),
    ("footwear", &["hike", "hiking", "trail"]),
];
const OUTFIT_HINTS: &[&str] = &[
    "outfit", "wear", "dress", "suggest", "occasion", "party", "wedding", "date", "dinner",
    "restaurant", "business", "interview", "office",
];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Keyword-based classification of what shape of answer the user wants:
/// a full outfit, a search for a specific item, an outfit that must also
/// surface a specific item, or an activity-appropriate item.
pub fn classify_query_shape(query: &str) -> (QueryShape, Option<&'static str>) {
    let t = query.to_lowercase();
    let t = t.trim_end_matches(['?', '!', '.']).trim();

    for (item_type, keys) in ACTIVITY_KEYWORDS {
        if contains_any(t, keys) {
            if !contains_any(t, OUTFIT_HINTS) {
                return (QueryShape::ActivityItem, Some(item_type));
            }
            return (QueryShape::FullOutfit, None);
        }
    }

    let requested = if contains_any(t, ITEM_KEYWORDS) {
        Some("shoes")
    } else {
        None
    };
    let has_outfit_hint = contains_any(t, OUTFIT_HINTS);

    match (requested, has_outfit_hint) {
        (Some(item), true) => (QueryShape::BlendedOutfitItem, Some(item)),
        (Some(item), false) => (QueryShape::ItemSearch, Some(item)),
        (None, _) => (QueryShape::FullOutfit, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_only_is_activity_item() {
        let (shape, item) = classify_query_shape("shoes for a walk");
        // contains an outfit hint? "walk" matches activity keyword only, no outfit hint present.
        assert_eq!(shape, QueryShape::ActivityItem);
        assert_eq!(item, Some("footwear"));
    }

    #[test]
    fn plain_item_search() {
        let (shape, item) = classify_query_shape("show me some sneakers");
        assert_eq!(shape, QueryShape::ItemSearch);
        assert_eq!(item, Some("shoes"));
    }

    #[test]
    fn blended_outfit_and_item() {
        let (shape, item) = classify_query_shape("outfit with boots for the office");
        assert_eq!(shape, QueryShape::BlendedOutfitItem);
        assert_eq!(item, Some("shoes"));
    }

    #[test]
    fn default_is_full_outfit() {
        let (shape, item) = classify_query_shape("business meeting tomorrow");
        assert_eq!(shape, QueryShape::FullOutfit);
        assert_eq!(item, None);
    }

    #[test]
    fn label_set_has_seven_entries() {
        assert_eq!(LABELS.len(), 7);
        for label in LABELS {
            assert_eq!(seeds(label).len(), 2);
        }
    }
}
