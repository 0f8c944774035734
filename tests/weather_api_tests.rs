mod common;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use codemaster::Config;
use codemaster::service::WeatherService;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

const KEY: &str = "test-weather-key";

#[derive(Clone, Default)]
struct Hits {
    current: Arc<AtomicUsize>,
    forecast: Arc<AtomicUsize>,
    geo: Arc<AtomicUsize>,
    air: Arc<AtomicUsize>,
}

fn authorized(q: &HashMap<String, String>) -> Result<(), StatusCode> {
    match q.get("appid").map(String::as_str) {
        Some(KEY) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn current(
    State(hits): State<Hits>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    hits.current.fetch_add(1, Ordering::SeqCst);
    authorized(&q)?;
    assert_eq!(q.get("units").map(String::as_str), Some("metric"));
    Ok(Json(json!({
        "name": q.get("q").cloned().unwrap_or_default(),
        "sys": { "country": "DE" },
        "main": { "temp": 21.46, "feels_like": 20.04, "humidity": 40, "pressure": 1012 },
        "weather": [{ "main": "Clear", "description": "clear sky", "icon": "01d" }],
        "wind": { "speed": 3.6, "deg": 250 },
        "visibility": 10000
    })))
}

fn entry(dt_txt: &str, temp: f64, humidity: f64, main: &str) -> Value {
    json!({
        "dt_txt": dt_txt,
        "main": { "temp": temp, "feels_like": temp, "humidity": humidity, "pressure": 1010 },
        "weather": [{ "main": main, "description": main.to_lowercase(), "icon": "10d" }]
    })
}

async fn forecast(
    State(hits): State<Hits>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    hits.forecast.fetch_add(1, Ordering::SeqCst);
    authorized(&q)?;
    assert_eq!(q.get("cnt").map(String::as_str), Some("16"));
    Ok(Json(json!({
        "city": { "name": "Berlin" },
        "list": [
            entry("2024-05-01 09:00:00", 10.0, 60.0, "Clouds"),
            entry("2024-05-01 12:00:00", 14.0, 50.0, "Rain"),
            entry("2024-05-01 15:00:00", 12.0, 70.0, "Rain"),
            entry("2024-05-02 12:00:00", 20.0, 30.0, "Clear"),
            entry("2024-05-03 12:00:00", 18.0, 35.0, "Clear"),
        ]
    })))
}

async fn geocode(
    State(hits): State<Hits>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    hits.geo.fetch_add(1, Ordering::SeqCst);
    authorized(&q)?;
    let limit: usize = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(5);
    let places = match q.get("q").map(String::as_str) {
        Some("Springfield") => vec![
            json!({ "name": "Springfield", "country": "US", "state": "Illinois", "lat": 39.8, "lon": -89.64 }),
            json!({ "name": "Springfield", "country": "US", "state": "Missouri", "lat": 37.21, "lon": -93.29 }),
        ],
        Some("Berlin") => vec![json!({ "name": "Berlin", "country": "DE", "lat": 52.52, "lon": 13.405 })],
        _ => Vec::new(),
    };
    Ok(Json(Value::Array(places.into_iter().take(limit).collect())))
}

async fn air_pollution(
    State(hits): State<Hits>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    hits.air.fetch_add(1, Ordering::SeqCst);
    authorized(&q)?;
    assert_eq!(q.get("lat").map(String::as_str), Some("52.52"));
    assert_eq!(q.get("lon").map(String::as_str), Some("13.405"));
    Ok(Json(json!({
        "coord": { "lat": 52.52, "lon": 13.405 },
        "list": [{
            "main": { "aqi": 2 },
            "components": { "pm2_5": 7.5, "no2": 12.1 },
            "dt": 1714550400
        }]
    })))
}

async fn setup() -> (Hits, Config) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/data/2.5/weather", get(current))
        .route("/data/2.5/forecast", get(forecast))
        .route("/data/2.5/air_pollution", get(air_pollution))
        .route("/geo/1.0/direct", get(geocode))
        .with_state(hits.clone());
    let addr = common::serve(app).await;

    let mut cfg = Config::default();
    cfg.weather_location = "Berlin".to_string();
    cfg.api_endpoints.weather = common::base_url(addr, "/data/2.5");
    cfg.api_endpoints.geo = common::base_url(addr, "/geo/1.0");
    (hits, cfg)
}

fn service(cfg: &Config, key: Option<&str>) -> WeatherService {
    WeatherService::new(reqwest::Client::new(), cfg, key.map(str::to_string))
        .with_retry_policy(common::fast_retry())
}

#[tokio::test]
async fn valid_key_yields_provider_forecast() {
    let (hits, cfg) = setup().await;
    let svc = service(&cfg, Some(KEY));

    let forecast = svc.forecast(None, 2).await;
    assert!(!forecast.fallback);
    assert_eq!(forecast.location, "Berlin");
    assert_eq!(forecast.forecasts.len(), 2);

    let day = &forecast.forecasts[0];
    assert_eq!(day.date, "2024-05-01");
    assert_eq!(day.min_temp, 10.0);
    assert_eq!(day.max_temp, 14.0);
    assert_eq!(day.avg_temp, 12.0);
    assert_eq!(day.avg_humidity, 60.0);
    assert_eq!(day.condition, "Rain");
    assert_eq!(forecast.forecasts[1].condition, "Clear");
    assert_eq!(hits.forecast.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn current_weather_is_transformed() {
    let (_hits, cfg) = setup().await;
    let svc = service(&cfg, Some(KEY));

    let weather = svc.current(Some("Hamburg")).await;
    assert!(!weather.fallback);
    assert_eq!(weather.location, "Hamburg");
    assert_eq!(weather.country, "DE");
    assert_eq!(weather.temperature, 21.5);
    assert_eq!(weather.condition, "Clear");
    assert_eq!(weather.visibility, 10.0);
}

#[tokio::test]
async fn missing_key_falls_back_without_calling_the_provider() {
    let (hits, cfg) = setup().await;
    let svc = service(&cfg, None);
    assert!(!svc.has_api_key());

    let weather = svc.current(None).await;
    assert!(weather.fallback);
    assert_eq!(weather.location, "Berlin");
    assert_eq!(weather.temperature, 20.0);

    let forecast = svc.forecast(None, 9).await;
    assert!(forecast.fallback);
    assert_eq!(forecast.forecasts.len(), 5);

    let air = svc.air_quality(None).await;
    assert!(air.fallback);
    assert_eq!(air.aqi, 3);

    let found = svc.search_locations("Springfield").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Springfield");
    assert_eq!(found[0].lat, None);

    assert_eq!(hits.current.load(Ordering::SeqCst), 0);
    assert_eq!(hits.forecast.load(Ordering::SeqCst), 0);
    assert_eq!(hits.geo.load(Ordering::SeqCst), 0);
    assert_eq!(hits.air.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn location_search_lists_geocoded_matches() {
    let (hits, cfg) = setup().await;
    let svc = service(&cfg, Some(KEY));

    let found = svc.search_locations("Springfield").await;
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].state, "Illinois");
    assert_eq!(found[1].state, "Missouri");
    assert_eq!(found[1].lat, Some(37.21));

    let berlin = svc.search_locations("Berlin").await;
    assert_eq!(berlin[0].state, "");
    assert_eq!(berlin[0].country, "DE");
    assert!(svc.search_locations("Atlantis").await.is_empty());
    assert_eq!(hits.geo.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn air_quality_geocodes_then_queries_pollution() {
    let (hits, cfg) = setup().await;
    let svc = service(&cfg, Some(KEY));

    let air = svc.air_quality(None).await;
    assert!(!air.fallback);
    assert_eq!(air.aqi, 2);
    assert_eq!(air.description, "Fair");
    assert_eq!(air.components.get("pm2_5"), Some(&7.5));
    assert_eq!(hits.geo.load(Ordering::SeqCst), 1);
    assert_eq!(hits.air.load(Ordering::SeqCst), 1);

    // Unknown places never reach the pollution endpoint.
    let unknown = svc.air_quality(Some("Atlantis")).await;
    assert!(unknown.fallback);
    assert_eq!(unknown.aqi, 3);
    assert_eq!(hits.air.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_key_falls_back() {
    let (hits, cfg) = setup().await;
    let svc = service(&cfg, Some("wrong-key"));

    let weather = svc.current(None).await;
    assert!(weather.fallback);
    assert_eq!(weather.description, "Weather data unavailable");
    // Authentication failures are not retried.
    assert_eq!(hits.current.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_weather_skips_the_provider() {
    let (hits, cfg) = setup().await;
    let (_dir, engine) = common::temp_engine().await;
    let svc = service(&cfg, Some(KEY)).with_cache(engine.clone());

    let first = svc.current(Some("Berlin")).await;
    let second = svc.current(Some("berlin")).await;
    assert!(!second.fallback);
    assert_eq!(first.location, second.location);
    assert_eq!(first.temperature, second.temperature);
    assert_eq!(hits.current.load(Ordering::SeqCst), 1);

    svc.forecast(Some("Berlin"), 2).await;
    svc.forecast(Some("Berlin"), 2).await;
    assert_eq!(hits.forecast.load(Ordering::SeqCst), 1);
    engine.close().await;
}
