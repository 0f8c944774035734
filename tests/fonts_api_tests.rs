mod common;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use codemaster::Config;
use codemaster::service::FontsService;
use codemaster::service::fonts::CACHE_FILE;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

const KEY: &str = "test-fonts-key";

fn item(family: &str, category: &str) -> Value {
    json!({
        "family": family,
        "category": category,
        "variants": ["regular", "700"],
        "subsets": ["latin"],
        "version": "v1",
        "lastModified": "2024-01-01",
        "files": { "regular": format!("https://fonts.example/{family}.ttf") }
    })
}

async fn webfonts(
    State(hits): State<Arc<AtomicUsize>>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    hits.fetch_add(1, Ordering::SeqCst);
    if q.get("key").map(String::as_str) != Some(KEY) {
        return Err(StatusCode::FORBIDDEN);
    }
    let mut items = vec![
        item("Roboto", "sans-serif"),
        item("Fira Code", "monospace"),
        item("Merriweather", "serif"),
        item("Lobster", "display"),
    ];
    if q.get("sort").map(String::as_str) == Some("alpha") {
        items.sort_by(|a, b| a["family"].as_str().cmp(&b["family"].as_str()));
    }
    Ok(Json(json!({ "kind": "webfonts#webfontList", "items": items })))
}

async fn setup() -> (Arc<AtomicUsize>, Config) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/webfonts/v1/webfonts", get(webfonts))
        .with_state(hits.clone());
    let addr = common::serve(app).await;

    let mut cfg = Config::default();
    cfg.api_endpoints.fonts = common::base_url(addr, "/webfonts/v1");
    (hits, cfg)
}

fn service(cfg: &Config, key: Option<&str>, cache_dir: &Path) -> FontsService {
    FontsService::new(reqwest::Client::new(), cfg, key.map(str::to_string), cache_dir)
        .with_retry_policy(common::fast_retry())
}

#[tokio::test]
async fn catalog_is_ranked_and_cached_per_sort() {
    let (hits, cfg) = setup().await;
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let svc = service(&cfg, Some(KEY), dir.path());

    let families = svc.families("popularity").await;
    let names: Vec<&str> = families.iter().map(|f| f.family.as_str()).collect();
    assert_eq!(names, vec!["Roboto", "Fira Code", "Merriweather", "Lobster"]);
    let ranks: Vec<usize> = families.iter().map(|f| f.popularity_rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
    assert!(families.iter().all(|f| !f.fallback));
    assert!(families[0].suitable_for_ui && families[0].suitable_for_body);
    assert!(!families[1].suitable_for_headings);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let cache = dir.path().join(CACHE_FILE);
    let snapshot: Value =
        serde_json::from_slice(&std::fs::read(&cache).expect("cache not written"))
            .expect("cache is not json");
    assert_eq!(snapshot["sort"], "popularity");
    assert_eq!(snapshot["families"].as_array().map(Vec::len), Some(4));

    // Same sort: served from disk.
    let again = svc.families("popularity").await;
    assert_eq!(again, families);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // A different sort refetches and replaces the snapshot.
    let alpha = svc.families("alpha").await;
    assert_eq!(alpha[0].family, "Fira Code");
    assert_eq!(alpha[0].popularity_rank, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn coding_fonts_and_pairings_use_the_live_catalog() {
    let (_hits, cfg) = setup().await;
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let svc = service(&cfg, Some(KEY), dir.path());

    let coding = svc.coding_fonts().await;
    assert_eq!(coding.len(), 1);
    assert_eq!(coding[0].font.family, "Fira Code");

    let pairings = svc.pairings("Roboto").await;
    assert!(!pairings.is_empty());
    assert!(pairings.iter().all(|p| p.secondary_font != "Roboto"));
}

#[tokio::test]
async fn rejected_key_falls_back_to_system_fonts() {
    let (hits, cfg) = setup().await;
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let svc = service(&cfg, Some("wrong-key"), dir.path());

    let families = svc.families("popularity").await;
    assert!(families.iter().all(|f| f.fallback));
    assert!(families.iter().any(|f| f.family == "Courier New"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!dir.path().join(CACHE_FILE).exists());
}

#[tokio::test]
async fn missing_key_never_calls_the_provider() {
    let (hits, cfg) = setup().await;
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let svc = service(&cfg, None, dir.path());

    assert!(!svc.has_api_key());
    assert!(svc.families("popularity").await.iter().all(|f| f.fallback));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
