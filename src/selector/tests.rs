use super::*;

fn item(id: &str, slot: Slot, item_type: &str, color: &str, description: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        owner_id: "u1".to_string(),
        slot: Some(slot),
        item_type: item_type.to_string(),
        color: Some(color.to_string()),
        image_ref: None,
        description: description.to_string(),
    }
}

/// A synthetic embedder: every distinct input string gets a stable
/// pseudo-random-but-deterministic vector derived from its bytes, so cosine
/// similarity is reproducible without a real model. Text containing `token`
/// is nudged toward a shared axis, so items sharing vocabulary with the query
/// score higher than unrelated ones.
fn synthetic_embed(text: &str) -> Vec<f32> {
    let t = text.to_lowercase();
    let mut v = vec![0.0f32; 8];
    for (i, b) in t.bytes().enumerate() {
        v[i % 8] += f32::from(b);
    }
    for axis_word in ["business", "beach", "casual", "dress", "sandal"] {
        if t.contains(axis_word) {
            v[0] += 1000.0;
        }
    }
    v
}

#[test]
fn business_hard_filter_removes_tshirt_and_sneaker() {
    let candidates = vec![
        item("top-1", Slot::Top, "T-Shirt", "white", "casual cotton tee"),
        item("top-2", Slot::Top, "Dress Shirt", "blue", "business dress shirt"),
        item("bottom-1", Slot::Bottom, "Chinos", "khaki", "business chinos"),
        item("fw-1", Slot::Footwear, "Sneaker", "white", "running sneaker"),
        item("fw-2", Slot::Footwear, "Loafers", "brown", "business loafers"),
    ];

    let outfits = assemble_outfits_with(&synthetic_embed, "business meeting", &candidates, "business", 3);

    assert!(!outfits.is_empty());
    for outfit in &outfits {
        assert_eq!(outfit.top.as_ref().unwrap().id, "top-2");
        assert_eq!(outfit.footwear.as_ref().unwrap().id, "fw-2");
    }
}

#[test]
fn beach_hard_filter_prefers_sandals_over_boots() {
    let candidates = vec![
        item("top-1", Slot::Top, "Tank Top", "white", "beach tank"),
        item("bottom-1", Slot::Bottom, "Shorts", "tan", "beach shorts"),
        item("fw-1", Slot::Footwear, "Boots", "brown", "leather boots"),
        item("fw-2", Slot::Footwear, "Sandals", "tan", "beach sandals"),
    ];

    let outfits = assemble_outfits_with(&synthetic_embed, "beach day", &candidates, "beach", 3);

    assert!(!outfits.is_empty());
    for outfit in &outfits {
        assert_eq!(outfit.footwear.as_ref().unwrap().id, "fw-2");
    }
}

#[test]
fn empty_required_slot_pool_yields_no_outfits() {
    let candidates = vec![
        item("top-1", Slot::Top, "T-Shirt", "white", "casual tee"),
        item("bottom-1", Slot::Bottom, "Jeans", "blue", "casual jeans"),
        // no footwear at all
    ];

    let outfits = assemble_outfits_with(&synthetic_embed, "casual day", &candidates, "casual", 3);
    assert!(outfits.is_empty());
}

#[test]
fn hard_filter_degrades_gracefully_when_avoid_would_empty_pool() {
    // Every footwear candidate is a sneaker, which "business" avoids; since
    // filtering them all out would leave an empty pool, the filter should be
    // suppressed rather than dropping the required slot entirely.
    let candidates = vec![
        item("top-1", Slot::Top, "Dress Shirt", "white", "business shirt"),
        item("bottom-1", Slot::Bottom, "Chinos", "khaki", "business chinos"),
        item("fw-1", Slot::Footwear, "Sneaker", "white", "running sneaker"),
        item("fw-2", Slot::Footwear, "Sneaker", "black", "athletic sneaker"),
    ];

    let outfits = assemble_outfits_with(&synthetic_embed, "business meeting", &candidates, "business", 3);
    assert!(!outfits.is_empty());
    assert!(outfits[0].footwear.is_some());
}

#[test]
fn outfits_are_deduplicated_and_capped_at_k() {
    let candidates = vec![
        item("top-1", Slot::Top, "Shirt", "white", "plain shirt"),
        item("bottom-1", Slot::Bottom, "Pants", "black", "plain pants"),
        item("fw-1", Slot::Footwear, "Shoe", "black", "plain shoe"),
    ];

    let outfits = assemble_outfits_with(&synthetic_embed, "something casual", &candidates, "casual", 2);
    assert!(outfits.len() <= 2);

    let mut ids: Vec<Vec<String>> = outfits
        .iter()
        .map(|o| {
            let mut v: Vec<String> = o.items().iter().map(|i| i.id.clone()).collect();
            v.sort();
            v
        })
        .collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

#[test]
fn k_is_clamped_between_one_and_three() {
    let candidates = vec![
        item("top-1", Slot::Top, "Shirt", "white", "plain shirt"),
        item("bottom-1", Slot::Bottom, "Pants", "black", "plain pants"),
        item("fw-1", Slot::Footwear, "Shoe", "black", "plain shoe"),
    ];

    let outfits = assemble_outfits_with(&synthetic_embed, "casual", &candidates, "casual", 0);
    assert!(outfits.len() <= 1);

    let outfits = assemble_outfits_with(&synthetic_embed, "casual", &candidates, "casual", 100);
    assert!(outfits.len() <= 3);
}
