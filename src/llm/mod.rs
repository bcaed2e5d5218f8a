//! LLM Delegate (C7): an optional generative-model attempt at a structured
//! outfit proposal, tried before the rule-based selector.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::domain::{CatalogItem, Outfit, Slot};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_SECS: u64 = 2;

const PER_SLOT_CAP: usize = 5;
const EMERGENCY_CAP: usize = 20;

/// A trimmed-down view of a candidate item sent to the model: id, short name,
/// slot, color, and a truncated description.
#[derive(Debug, Clone)]
struct Projected {
    id: String,
    slot: Slot,
    name: String,
    color: Option<String>,
}

/// Projects candidates down to a per-slot-bounded set so the prompt stays
/// under a reasonable token budget. Required slots get up to `PER_SLOT_CAP`
/// each; `layer`/`accessories` likewise. If the total still exceeds
/// `EMERGENCY_CAP`, truncates further and logs the reduction.
fn project_candidates(candidates: &[CatalogItem]) -> Vec<Projected> {
    let mut by_slot: std::collections::HashMap<Slot, Vec<&CatalogItem>> =
        std::collections::HashMap::new();
    for item in candidates {
        if let Some(slot) = item.slot {
            by_slot.entry(slot).or_default().push(item);
        }
    }

    let mut projected = Vec::new();
    for slot in Slot::REQUIRED.iter().chain(Slot::OPTIONAL.iter()) {
        if let Some(items) = by_slot.get(slot) {
            for item in items.iter().take(PER_SLOT_CAP) {
                projected.push(Projected {
                    id: item.id.clone(),
                    slot: *slot,
                    name: truncate(&item.name_text(), 100),
                    color: item.color.clone(),
                });
            }
        }
    }

    if projected.len() > EMERGENCY_CAP {
        warn!(
            "llm delegate: projected candidate set ({}) exceeds emergency cap ({}), truncating",
            projected.len(),
            EMERGENCY_CAP
        );
        projected.truncate(EMERGENCY_CAP);
    }
    projected
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn build_prompt(query: &str, intent_label: &str, item_type: Option<&str>, projected: &[Projected]) -> String {
    let catalog_lines: Vec<String> = projected
        .iter()
        .map(|p| {
            format!(
                "- id={} slot={} color={} name=\"{}\"",
                p.id,
                p.slot.as_str(),
                p.color.as_deref().unwrap_or("unknown"),
                p.name
            )
        })
        .collect();

    format!(
        "You are assembling outfit suggestions from a user's wardrobe.\n\
         User request: \"{query}\"\n\
         Classified occasion: {intent_label}\n\
         Requested item type (if any): {item_type}\n\
         \n\
         Candidate items (choose ids only from this list):\n{catalog}\n\
         \n\
         Respond with JSON only, no prose, matching exactly this shape:\n\
         {{\"intent\": string, \"item_type\": string|null, \"outfits\": [\
         {{\"top\": id|null, \"bottom\": id|null, \"footwear\": id|null, \
         \"layer\": id|null, \"accessories\": id|null, \"rationale\": string}}]}}\n\
         Every outfit must set top, bottom, and footwear to valid ids from the list above.",
        query = query,
        intent_label = intent_label,
        item_type = item_type.unwrap_or("none"),
        catalog = catalog_lines.join("\n"),
    )
}

#[derive(Debug, Deserialize)]
struct DelegateOutfit {
    top: Option<String>,
    bottom: Option<String>,
    footwear: Option<String>,
    layer: Option<String>,
    accessories: Option<String>,
    rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DelegateResponse {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    outfits: Vec<DelegateOutfit>,
}

/// Parses JSON tolerantly: a direct parse first, then a scan for the first
/// balanced `{ … }` block (models sometimes wrap JSON in prose or fencing).
fn parse_tolerant(text: &str) -> Option<DelegateResponse> {
    if let Ok(parsed) = serde_json::from_str::<DelegateResponse>(text) {
        return Some(parsed);
    }
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..=i];
                    return serde_json::from_str::<DelegateResponse>(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

fn resolve<'a>(id: &Option<String>, by_id: &'a std::collections::HashMap<&str, &CatalogItem>) -> Option<&'a CatalogItem> {
    by_id.get(id.as_deref()?).copied()
}

/// Validates and converts a tolerant-parsed response into outfits, rejecting
/// any outfit that references an id outside the projected candidate set or
/// that fails to fill all of top/bottom/footwear.
fn to_outfits(response: DelegateResponse, projected: &[Projected], candidates: &[CatalogItem]) -> Vec<Outfit> {
    let projected_ids: std::collections::HashSet<&str> =
        projected.iter().map(|p| p.id.as_str()).collect();
    let by_id: std::collections::HashMap<&str, &CatalogItem> =
        candidates.iter().map(|c| (c.id.as_str(), c)).collect();

    response
        .outfits
        .into_iter()
        .filter_map(|o| {
            for id in [&o.top, &o.bottom, &o.footwear, &o.layer, &o.accessories]
                .into_iter()
                .flatten()
            {
                if !projected_ids.contains(id.as_str()) {
                    debug!("llm delegate: rejecting outfit referencing unknown id {}", id);
                    return None;
                }
            }

            let top = resolve(&o.top, &by_id).cloned();
            let bottom = resolve(&o.bottom, &by_id).cloned();
            let footwear = resolve(&o.footwear, &by_id).cloned();
            if top.is_none() || bottom.is_none() || footwear.is_none() {
                return None;
            }

            Some(Outfit {
                top,
                bottom,
                footwear,
                layer: resolve(&o.layer, &by_id).cloned(),
                accessories: resolve(&o.accessories, &by_id).cloned(),
                score: 80.0,
                rationale: o
                    .rationale
                    .unwrap_or_else(|| "Suggested by the assistant.".to_string()),
            })
        })
        .collect()
}

/// Something that can attempt a structured outfit proposal given a query and
/// a candidate pool. Returns `None` on any failure so the caller falls back
/// to the rule-based selector.
#[async_trait]
pub trait OutfitDelegate: Send + Sync {
    async fn suggest(
        &self,
        query: &str,
        intent_label: &str,
        item_type: Option<&str>,
        candidates: &[CatalogItem],
    ) -> Option<Vec<Outfit>>;
}

pub struct GeminiDelegate {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiDelegate {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(
            api_key,
            model,
            "https://generativelanguage.googleapis.com/v1".to_string(),
        )
    }

    fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { api_key, model, base_url, client }
    }

    async fn call(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": 0.4,
                "responseMimeType": "application/json",
            },
        });

        for attempt in 0..MAX_RETRIES {
            let resp = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&payload)
                .send()
                .await?;

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt + 1 >= MAX_RETRIES {
                    anyhow::bail!("gemini rate limited after {} attempts", MAX_RETRIES);
                }
                let delay = Duration::from_secs(BASE_BACKOFF_SECS * 2u64.pow(attempt));
                warn!("gemini delegate rate limited, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                continue;
            }
            if !status.is_success() {
                anyhow::bail!("gemini delegate returned status {}", status);
            }

            let body: Value = resp.json().await?;
            let text = body["candidates"][0]["content"]["parts"][0]["text"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("gemini response missing text part"))?;
            return Ok(text.to_string());
        }
        anyhow::bail!("gemini delegate exhausted retries")
    }
}

#[async_trait]
impl OutfitDelegate for GeminiDelegate {
    async fn suggest(
        &self,
        query: &str,
        intent_label: &str,
        item_type: Option<&str>,
        candidates: &[CatalogItem],
    ) -> Option<Vec<Outfit>> {
        let projected = project_candidates(candidates);
        if projected.is_empty() {
            return None;
        }
        let prompt = build_prompt(query, intent_label, item_type, &projected);

        let text = match self.call(&prompt).await {
            Ok(t) => t,
            Err(e) => {
                warn!("llm delegate call failed, falling back to rule engine: {}", e);
                return None;
            }
        };

        let parsed = parse_tolerant(&text)?;
        let outfits = to_outfits(parsed, &projected, candidates);
        if outfits.is_empty() { None } else { Some(outfits) }
    }
}
