//! Per-intent prefer/avoid tables and bias constants, encoded verbatim from
//! the rule engine this selector is modeled on.

use crate::domain::Slot;

pub struct SlotRule {
    pub slot: Slot,
    pub avoid: &'static [&'static str],
    pub prefer: &'static [&'static str],
}

/// Hard filters for a given occasion label. Items matching `avoid` are
/// removed from a slot's pool unless doing so would empty it.
pub fn hard_rules(intent: &str) -> &'static [SlotRule] {
    match intent {
        "business" | "formal" => &[
            SlotRule {
                slot: Slot::Top,
                avoid: &["t-shirt", "tee", "hoodie"],
                prefer: &["dress shirt", "blazer"],
            },
            SlotRule {
                slot: Slot::Bottom,
                avoid: &["shorts", "joggers", "sweatpants"],
                prefer: &["chinos", "dress pants", "trousers"],
            },
            SlotRule {
                slot: Slot::Footwear,
                avoid: &["running", "athletic", "sneaker"],
                prefer: &["loafers", "boots"],
            },
            SlotRule {
                slot: Slot::Layer,
                avoid: &["fleece"],
                prefer: &["blazer"],
            },
        ],
        "beach" => &[
            SlotRule {
                slot: Slot::Footwear,
                avoid: &["dress shoe", "lace-up", "oxford", "boots", "loafers", "heel"],
                prefer: &["sandals", "slides", "flip-flops"],
            },
            SlotRule {
                slot: Slot::Layer,
                avoid: &["heavy", "suede", "wool", "fleece", "blazer", "sweater"],
                prefer: &[],
            },
        ],
        "hiking" => &[SlotRule {
            slot: Slot::Footwear,
            avoid: &[],
            prefer: &["boots", "hiking"],
        }],
        "workout" => &[
            SlotRule {
                slot: Slot::Top,
                avoid: &["dress shirt"],
                prefer: &["athletic", "tank"],
            },
            SlotRule {
                slot: Slot::Bottom,
                avoid: &["jeans", "chinos"],
                prefer: &["shorts"],
            },
            SlotRule {
                slot: Slot::Footwear,
                avoid: &["boots"],
                prefer: &["sneaker"],
            },
            SlotRule {
                slot: Slot::Layer,
                avoid: &[],
                prefer: &["hoodie"],
            },
        ],
        _ => &[],
    }
}

/// Soft preference/avoidance tokens that bias per-slot scoring without
/// filtering anything out. Applies even to intents with no hard rules
/// (e.g. "casual", "party").
pub fn soft_bias_tokens(intent: &str, slot: Slot) -> (&'static [&'static str], &'static [&'static str]) {
    match (intent, slot) {
        ("casual", Slot::Top) => (&["t-shirt", "polo", "sweater"], &[]),
        ("casual", Slot::Bottom) => (&["jeans", "chinos"], &[]),
        ("casual", Slot::Footwear) => (&["sneaker", "boots"], &[]),
        ("party", Slot::Bottom) => (&[], &["shorts"]),
        ("party", Slot::Top) => (&[], &["hoodie"]),
        _ => (&[], &[]),
    }
}

/// Per-slot bias magnitude: preferred-item bonus and avoided-item penalty,
/// tuned tighter for strict intents.
pub fn bias_magnitudes(intent: &str) -> (f32, f32) {
    match intent {
        "business" | "formal" => (0.18, -0.35),
        "beach" => (0.12, -0.35),
        _ => (0.12, -0.15),
    }
}

/// Small per-label tie-breaking constant applied at outfit level, distinct
/// from the per-slot bias above.
pub fn outfit_level_bias(intent: &str) -> f32 {
    match intent {
        "business" | "formal" => 0.05,
        "party" => 0.04,
        "casual" => 0.03,
        "workout" => 0.05,
        "beach" => 0.06,
        "hiking" => 0.02,
        _ => 0.02,
    }
}
