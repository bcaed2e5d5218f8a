//! End-to-end coverage of the concrete scenarios: full HTTP round trips
//! through the gateway router, backed by an in-memory catalog store and a
//! deterministic fake embedder so no network or model download is needed.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use wardrobe_suggest::cache::SuggestionCache;
use wardrobe_suggest::config::AuthConfig;
use wardrobe_suggest::domain::{CatalogItem, Outfit, Slot};
use wardrobe_suggest::embedder::Embedder;
use wardrobe_suggest::gateway::{AppState, Authenticator, StaticTokenAuthenticator, router};
use wardrobe_suggest::llm::OutfitDelegate;
use wardrobe_suggest::orchestrator::Orchestrator;
use wardrobe_suggest::store::CatalogRepository;
use wardrobe_suggest::store::sqlite::SqliteCatalogStore;

const OCCASION_LABELS: [&str; 7] =
    ["business", "formal", "party", "casual", "workout", "beach", "hiking"];

/// A one-hot-per-label stand-in for the real sentence embedding: each
/// dimension lights up when the text literally mentions that occasion word.
/// Good enough to drive intent classification deterministically in tests
/// without a model download; item names carry no occasion words so they
/// embed to the zero vector, which is exactly the degenerate case
/// `cosine_similarity` already guards against.
struct FakeEmbedder;

impl Embedder for FakeEmbedder {
    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let t = text.to_lowercase();
        Ok(OCCASION_LABELS.iter().map(|l| if t.contains(l) { 1.0 } else { 0.0 }).collect())
    }
}

fn item(id: &str, owner: &str, slot: Slot, item_type: &str, color: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        owner_id: owner.to_string(),
        slot: Some(slot),
        item_type: item_type.to_string(),
        color: Some(color.to_string()),
        image_ref: None,
        description: String::new(),
    }
}

const OWNER: &str = "owner-1";
const TOKEN: &str = "test-token";

async fn build_state(
    items: Vec<CatalogItem>,
    delegate: Option<Arc<dyn OutfitDelegate>>,
) -> AppState {
    let store = SqliteCatalogStore::open_in_memory().unwrap();
    for i in items {
        store.upsert(i).await.unwrap();
    }
    let store: Arc<dyn CatalogRepository> = Arc::new(store);
    let cache = Arc::new(SuggestionCache::new(1_000, Duration::from_secs(300)));
    let orchestrator = Arc::new(Orchestrator::new(store, cache, delegate));

    let mut tokens = HashMap::new();
    tokens.insert(TOKEN.to_string(), OWNER.to_string());
    let authenticator: Arc<dyn Authenticator> =
        Arc::new(StaticTokenAuthenticator::new(&AuthConfig { tokens }));

    AppState::new(orchestrator, Arc::new(FakeEmbedder), authenticator, 30)
}

fn suggest_request(body: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/v2/suggestions")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        0,
    )));
    req
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn scenario_1_empty_wardrobe_yields_none_intent_and_no_outfits() {
    let app = router(build_state(vec![], None).await);
    let response = app.oneshot(suggest_request(r#"{"text": "business meeting"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["intent"], "none");
    assert_eq!(json["outfits"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn scenario_2_small_wardrobe_returns_at_least_one_outfit() {
    let items = vec![
        item("1", OWNER, Slot::Top, "T-Shirt", "blue"),
        item("2", OWNER, Slot::Top, "Polo", "white"),
        item("3", OWNER, Slot::Bottom, "Jeans", "navy"),
        item("4", OWNER, Slot::Bottom, "Chinos", "khaki"),
        item("5", OWNER, Slot::Footwear, "Sneaker", "white"),
        item("6", OWNER, Slot::Footwear, "Boots", "brown"),
        item("7", OWNER, Slot::Accessories, "Watch", "black"),
        item("8", OWNER, Slot::Accessories, "Belt", "brown"),
    ];
    let app = router(build_state(items, None).await);
    let response = app.oneshot(suggest_request(r#"{"text": "casual coffee"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let outfits = json["outfits"].as_array().unwrap();
    assert!(!outfits.is_empty());
    let first = &outfits[0];
    assert!(!first["top"].is_null());
    assert!(!first["bottom"].is_null());
    assert!(!first["footwear"].is_null());
}

#[tokio::test]
async fn scenario_3_business_strict_filter_excludes_tshirt() {
    let items = vec![
        item("1", OWNER, Slot::Top, "T-Shirt", "blue"),
        item("2", OWNER, Slot::Top, "Dress Shirt", "white"),
        item("3", OWNER, Slot::Bottom, "Chinos", "khaki"),
        item("4", OWNER, Slot::Footwear, "Loafers", "brown"),
    ];
    let app = router(build_state(items, None).await);
    let response =
        app.oneshot(suggest_request(r#"{"text": "job interview"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    for outfit in json["outfits"].as_array().unwrap() {
        let top_name = outfit["top"]["name"].as_str().unwrap_or_default().to_lowercase();
        assert!(top_name.contains("shirt") || top_name.contains("polo"));
        assert!(!top_name.contains("t-shirt"));
    }
}

#[tokio::test]
async fn scenario_4_beach_filter_prefers_sandals_over_loafers() {
    let items = vec![
        item("1", OWNER, Slot::Top, "Shirt", "white"),
        item("2", OWNER, Slot::Bottom, "Shorts", "khaki"),
        item("3", OWNER, Slot::Footwear, "Sandals", "brown"),
        item("4", OWNER, Slot::Footwear, "Dress Loafers", "black"),
    ];
    let app = router(build_state(items, None).await);
    let response = app.oneshot(suggest_request(r#"{"text": "beach day"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    for outfit in json["outfits"].as_array().unwrap() {
        if !outfit["footwear"].is_null() {
            let name = outfit["footwear"]["name"].as_str().unwrap_or_default().to_lowercase();
            assert!(name.contains("sandal"));
        }
    }
}

struct FixedOutfitDelegate;

#[async_trait]
impl OutfitDelegate for FixedOutfitDelegate {
    async fn suggest(
        &self,
        _query: &str,
        _intent_label: &str,
        _item_type: Option<&str>,
        candidates: &[CatalogItem],
    ) -> Option<Vec<Outfit>> {
        let top = candidates.iter().find(|i| i.slot == Some(Slot::Top))?.clone();
        let bottom = candidates.iter().find(|i| i.slot == Some(Slot::Bottom))?.clone();
        let footwear = candidates.iter().find(|i| i.slot == Some(Slot::Footwear))?.clone();
        Some(vec![Outfit {
            top: Some(top),
            bottom: Some(bottom),
            footwear: Some(footwear),
            layer: None,
            accessories: None,
            score: 0.0,
            rationale: "picked by the model".to_string(),
        }])
    }
}

#[tokio::test]
async fn scenario_5_llm_valid_result_is_scored_100() {
    let items = vec![
        item("1", OWNER, Slot::Top, "Shirt", "white"),
        item("2", OWNER, Slot::Bottom, "Chinos", "khaki"),
        item("3", OWNER, Slot::Footwear, "Loafers", "brown"),
    ];
    let delegate: Arc<dyn OutfitDelegate> = Arc::new(FixedOutfitDelegate);
    let app = router(build_state(items, Some(delegate)).await);
    let response = app.oneshot(suggest_request(r#"{"text": "dinner out"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let outfits = json["outfits"].as_array().unwrap();
    assert_eq!(outfits.len(), 1);
    assert_eq!(outfits[0]["score"].as_f64().unwrap(), 100.0);
    assert_eq!(outfits[0]["rationale"], "picked by the model");
}

struct EmptyOutfitDelegate;

#[async_trait]
impl OutfitDelegate for EmptyOutfitDelegate {
    async fn suggest(
        &self,
        _query: &str,
        _intent_label: &str,
        _item_type: Option<&str>,
        _candidates: &[CatalogItem],
    ) -> Option<Vec<Outfit>> {
        None
    }
}

#[tokio::test]
async fn scenario_6_llm_failure_falls_back_to_rule_engine_and_stays_schema_conformant() {
    let items = vec![
        item("1", OWNER, Slot::Top, "Shirt", "white"),
        item("2", OWNER, Slot::Bottom, "Chinos", "khaki"),
        item("3", OWNER, Slot::Footwear, "Loafers", "brown"),
    ];
    let delegate: Arc<dyn OutfitDelegate> = Arc::new(EmptyOutfitDelegate);
    let app = router(build_state(items, Some(delegate)).await);
    let response = app.oneshot(suggest_request(r#"{"text": "dinner out"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json.get("intent").is_some());
    assert!(json["outfits"].is_array());
    for outfit in json["outfits"].as_array().unwrap() {
        assert_ne!(outfit["score"].as_f64().unwrap(), 100.0);
    }
}

#[tokio::test]
async fn whitespace_only_query_is_bad_request() {
    let app = router(build_state(vec![], None).await);
    let response = app.oneshot(suggest_request(r#"{"text": "   "}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_identical_request_is_served_from_cache() {
    let items = vec![
        item("1", OWNER, Slot::Top, "Shirt", "white"),
        item("2", OWNER, Slot::Bottom, "Chinos", "khaki"),
        item("3", OWNER, Slot::Footwear, "Loafers", "brown"),
    ];
    let app = router(build_state(items, None).await);

    let first = app.clone().oneshot(suggest_request(r#"{"text": "casual coffee"}"#)).await.unwrap();
    let first_json = json_body(first).await;

    let second = app.oneshot(suggest_request(r#"{"text": "casual coffee"}"#)).await.unwrap();
    let second_json = json_body(second).await;

    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn healthz_never_requires_auth() {
    let app = router(build_state(vec![], None).await);
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}
