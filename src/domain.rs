//! Core data model: catalog items, slots, and suggestion results.

use serde::{Deserialize, Serialize};

/// A role an item can fill inside an outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Top,
    Bottom,
    Footwear,
    Layer,
    OnePiece,
    Accessories,
}

impl Slot {
    /// Parses a freeform, possibly legacy slot string.
    ///
    /// Older rows used `"shoes"` where the current vocabulary is `"footwear"`;
    /// callers reading from storage must go through this rather than `FromStr`.
    pub fn from_stored(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "bottom" => Some(Self::Bottom),
            "footwear" | "shoes" => Some(Self::Footwear),
            "layer" | "outerwear" => Some(Self::Layer),
            "one-piece" | "one_piece" | "onepiece" => Some(Self::OnePiece),
            "accessories" | "accessory" => Some(Self::Accessories),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Footwear => "footwear",
            Self::Layer => "layer",
            Self::OnePiece => "one-piece",
            Self::Accessories => "accessories",
        }
    }

    pub const REQUIRED: [Slot; 3] = [Slot::Top, Slot::Bottom, Slot::Footwear];
    pub const OPTIONAL: [Slot; 2] = [Slot::Layer, Slot::Accessories];
}

/// One piece of clothing owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub owner_id: String,
    pub slot: Option<Slot>,
    pub item_type: String,
    pub color: Option<String>,
    pub image_ref: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl CatalogItem {
    /// Text used for embedding and rule matching: lowercased type + description.
    pub fn name_text(&self) -> String {
        format!("{} {}", self.item_type, self.description).to_lowercase()
    }
}

/// An assembled outfit: at most one item per slot.
#[derive(Debug, Clone, Serialize)]
pub struct Outfit {
    pub top: Option<CatalogItem>,
    pub bottom: Option<CatalogItem>,
    pub footwear: Option<CatalogItem>,
    pub layer: Option<CatalogItem>,
    pub accessories: Option<CatalogItem>,
    pub score: f32,
    pub rationale: String,
}

impl Outfit {
    /// Every outfit emitted by the core must fill top, bottom, and footwear.
    pub fn is_complete(&self) -> bool {
        self.top.is_some() && self.bottom.is_some() && self.footwear.is_some()
    }

    /// All items participating in this outfit, in slot order.
    pub fn items(&self) -> Vec<&CatalogItem> {
        [&self.top, &self.bottom, &self.footwear, &self.layer, &self.accessories]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// The final response shape for a suggestion request.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResult {
    pub intent: String,
    pub outfits: Vec<Outfit>,
}

impl SuggestionResult {
    pub fn empty(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            outfits: Vec::new(),
        }
    }
}
