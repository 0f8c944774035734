use crate::api::default_retry_policy;
use crate::api::weather_api::{OwmCurrent, OwmForecast, WeatherEndpoints};
use crate::api::with_retry;
use crate::config::{ApiEndpoints, Config};
use crate::db::SqlEngine;
use crate::error::{CodeMasterError, Result};
use crate::types::weather::{
    AirQuality, CurrentWeather, DailyForecast, Forecast, LocationMatch, aqi_label,
};
use backon::ExponentialBuilder;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub const CACHE_TTL_MINUTES: i64 = 30;
pub const DEFAULT_FORECAST_DAYS: u32 = 5;
/// The provider reports every 3 hours.
const ENTRIES_PER_DAY: u32 = 8;

/// Weather lookups with a 30-minute SQLite cache and offline fallbacks.
/// Lookups never fail: without a key, or when the provider errors, a
/// record flagged `fallback` is returned instead.
pub struct WeatherService {
    client: reqwest::Client,
    endpoints: ApiEndpoints,
    api_key: Option<String>,
    default_location: String,
    cache: Option<SqlEngine>,
    retry_policy: ExponentialBuilder,
}

impl WeatherService {
    pub fn new(client: reqwest::Client, cfg: &Config, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoints: cfg.api_endpoints.clone(),
            api_key,
            default_location: cfg.weather_location.clone(),
            cache: None,
            retry_policy: default_retry_policy(),
        }
    }

    pub fn with_cache(mut self, engine: SqlEngine) -> Self {
        self.cache = Some(engine);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: ExponentialBuilder) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    pub async fn current(&self, location: Option<&str>) -> CurrentWeather {
        let location = location.unwrap_or(&self.default_location);
        let cache_key = format!("current_{}", location.to_lowercase());
        if let Some(hit) = self.cached::<CurrentWeather>(&cache_key).await {
            debug!(location, "returning cached weather");
            return hit;
        }
        let Some(key) = self.api_key.as_deref() else {
            return fallback_current(location);
        };

        let fetched = with_retry("weather", self.retry_policy, || async {
            WeatherEndpoints::current(&self.client, &self.endpoints.weather, key, location).await
        })
        .await;
        match fetched {
            Ok(payload) => {
                let weather = transform_current(payload);
                self.store(&cache_key, &weather).await;
                weather
            }
            Err(e) => {
                warn!(location, error = %e, "weather request failed; using fallback");
                fallback_current(location)
            }
        }
    }

    pub async fn forecast(&self, location: Option<&str>, days: u32) -> Forecast {
        let location = location.unwrap_or(&self.default_location);
        let days = days.clamp(1, 5);
        let cache_key = format!("forecast_{}_{}", location.to_lowercase(), days);
        if let Some(hit) = self.cached::<Forecast>(&cache_key).await {
            debug!(location, days, "returning cached forecast");
            return hit;
        }
        let today = Utc::now().date_naive();
        let Some(key) = self.api_key.as_deref() else {
            return fallback_forecast(location, days, today);
        };

        let fetched = with_retry("forecast", self.retry_policy, || async {
            WeatherEndpoints::forecast(
                &self.client,
                &self.endpoints.weather,
                key,
                location,
                days * ENTRIES_PER_DAY,
            )
            .await
        })
        .await;
        match fetched {
            Ok(payload) => {
                let forecast = transform_forecast(payload, days as usize);
                self.store(&cache_key, &forecast).await;
                forecast
            }
            Err(e) => {
                warn!(location, error = %e, "forecast request failed; using fallback");
                fallback_forecast(location, days, today)
            }
        }
    }

    pub async fn search_locations(&self, query: &str) -> Vec<LocationMatch> {
        let echo = || {
            vec![LocationMatch {
                name: query.to_string(),
                country: String::new(),
                state: String::new(),
                lat: None,
                lon: None,
            }]
        };
        let Some(key) = self.api_key.as_deref() else {
            return echo();
        };
        match WeatherEndpoints::geocode(&self.client, &self.endpoints.geo, key, query, 5).await {
            Ok(found) => found
                .into_iter()
                .map(|loc| LocationMatch {
                    name: loc.name,
                    country: loc.country,
                    state: loc.state.unwrap_or_default(),
                    lat: Some(loc.lat),
                    lon: Some(loc.lon),
                })
                .collect(),
            Err(e) => {
                warn!(query, error = %e, "location search failed");
                echo()
            }
        }
    }

    pub async fn air_quality(&self, location: Option<&str>) -> AirQuality {
        let location = location.unwrap_or(&self.default_location);
        let Some(key) = self.api_key.as_deref() else {
            return fallback_air_quality();
        };
        match self.fetch_air_quality(key, location).await {
            Ok(aq) => aq,
            Err(e) => {
                warn!(location, error = %e, "air quality request failed; using fallback");
                fallback_air_quality()
            }
        }
    }

    async fn fetch_air_quality(&self, key: &str, location: &str) -> Result<AirQuality> {
        let geo =
            WeatherEndpoints::geocode(&self.client, &self.endpoints.geo, key, location, 1).await?;
        let place = geo
            .first()
            .ok_or_else(|| CodeMasterError::LocationNotFound(location.to_string()))?;
        let payload = WeatherEndpoints::air_pollution(
            &self.client,
            &self.endpoints.weather,
            key,
            place.lat,
            place.lon,
        )
        .await?;
        let entry = payload.list.into_iter().next().ok_or_else(|| {
            CodeMasterError::InvalidResponse("empty air pollution list".to_string())
        })?;
        Ok(AirQuality {
            aqi: entry.main.aqi,
            description: aqi_label(entry.main.aqi).to_string(),
            components: entry.components,
            last_updated: Utc::now(),
            fallback: false,
        })
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let engine = self.cache.as_ref()?;
        match engine
            .cache_get(key, ChronoDuration::minutes(CACHE_TTL_MINUTES))
            .await
        {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .inspect_err(|e| warn!(key, error = %e, "discarding unreadable cache entry"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "weather cache lookup failed");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        let Some(engine) = self.cache.as_ref() else {
            return;
        };
        let stored = match serde_json::to_string(value) {
            Ok(raw) => engine.cache_put(key, &raw).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = stored {
            warn!(key, error = %e, "failed to cache weather data");
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn transform_current(api: OwmCurrent) -> CurrentWeather {
    let condition = api.weather.into_iter().next().unwrap_or_default();
    CurrentWeather {
        location: if api.name.is_empty() {
            "Unknown".to_string()
        } else {
            api.name
        },
        country: api.sys.country,
        temperature: round1(api.main.temp),
        feels_like: round1(api.main.feels_like),
        humidity: api.main.humidity,
        pressure: api.main.pressure,
        condition: if condition.main.is_empty() {
            "Unknown".to_string()
        } else {
            condition.main
        },
        description: condition.description,
        icon: condition.icon,
        wind_speed: api.wind.speed,
        wind_direction: api.wind.deg,
        visibility: api.visibility / 1000.0,
        uv_index: api.uvi,
        last_updated: Utc::now(),
        fallback: false,
    }
}

#[derive(Default)]
struct DayAccumulator {
    temperatures: Vec<f64>,
    humidity: Vec<f64>,
    conditions: Vec<String>,
    descriptions: Vec<String>,
}

/// Collapse 3-hourly entries into per-day summaries, keeping the first
/// `days` dates.
pub fn transform_forecast(api: OwmForecast, days: usize) -> Forecast {
    let mut by_day: BTreeMap<String, DayAccumulator> = BTreeMap::new();
    for entry in api.list {
        let date = entry
            .dt_txt
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        let acc = by_day.entry(date).or_default();
        acc.temperatures.push(entry.main.temp);
        acc.humidity.push(entry.main.humidity);
        if let Some(cond) = entry.weather.into_iter().next() {
            acc.conditions.push(cond.main);
            acc.descriptions.push(cond.description);
        }
    }

    let forecasts = by_day
        .into_iter()
        .take(days)
        .filter(|(_, acc)| !acc.temperatures.is_empty())
        .map(|(date, acc)| {
            let n = acc.temperatures.len() as f64;
            let min = acc.temperatures.iter().copied().fold(f64::INFINITY, f64::min);
            let max = acc
                .temperatures
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            DailyForecast {
                date,
                min_temp: round1(min),
                max_temp: round1(max),
                avg_temp: round1(acc.temperatures.iter().sum::<f64>() / n),
                condition: most_frequent(&acc.conditions),
                avg_humidity: round1(acc.humidity.iter().sum::<f64>() / n),
                description: most_frequent(&acc.descriptions),
            }
        })
        .collect();

    Forecast {
        location: if api.city.name.is_empty() {
            "Unknown".to_string()
        } else {
            api.city.name
        },
        forecasts,
        last_updated: Utc::now(),
        fallback: false,
    }
}

/// Most common value; ties go to the earliest occurrence.
fn most_frequent(values: &[String]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for v in values {
        let c = counts[v.as_str()];
        if best.is_none_or(|(_, bc)| c > bc) {
            best = Some((v.as_str(), c));
        }
    }
    best.map(|(v, _)| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn fallback_current(location: &str) -> CurrentWeather {
    CurrentWeather {
        location: location.to_string(),
        country: String::new(),
        temperature: 20.0,
        feels_like: 20.0,
        humidity: 50.0,
        pressure: 1013.0,
        condition: "Unknown".to_string(),
        description: "Weather data unavailable".to_string(),
        icon: "01d".to_string(),
        wind_speed: 0.0,
        wind_direction: 0.0,
        visibility: 10.0,
        uv_index: 0.0,
        last_updated: Utc::now(),
        fallback: true,
    }
}

pub fn fallback_forecast(location: &str, days: u32, start: NaiveDate) -> Forecast {
    let forecasts = start
        .iter_days()
        .take(days as usize)
        .map(|date| DailyForecast {
            date: date.format("%Y-%m-%d").to_string(),
            min_temp: 15.0,
            max_temp: 25.0,
            avg_temp: 20.0,
            condition: "Unknown".to_string(),
            avg_humidity: 50.0,
            description: "Weather data unavailable".to_string(),
        })
        .collect();
    Forecast {
        location: location.to_string(),
        forecasts,
        last_updated: Utc::now(),
        fallback: true,
    }
}

fn fallback_air_quality() -> AirQuality {
    AirQuality {
        aqi: 3,
        description: aqi_label(3).to_string(),
        components: HashMap::new(),
        last_updated: Utc::now(),
        fallback: true,
    }
}

/// Weather-driven suggestions for the coding session. `hour` is local
/// time, 0..=23.
pub fn recommendations(weather: &CurrentWeather, hour: u32) -> Vec<String> {
    let mut out = Vec::new();
    let condition = weather.condition.to_lowercase();

    if weather.temperature < 10.0 {
        out.push("Cold outside: a good time for hot coffee and a long focused session.".into());
        out.push("Consider tackling performance work while the mind is sharp.".into());
    } else if weather.temperature > 30.0 {
        out.push("Hot weather: stay hydrated and keep sessions short.".into());
    } else {
        out.push("Comfortable weather for productive, focused work.".into());
    }

    if condition.contains("rain") {
        out.push("Rainy day: catch up on documentation and refactoring.".into());
        out.push("Check that your backups and sync jobs are healthy.".into());
    } else if condition.contains("snow") {
        out.push("Snowy weather: try an algorithm challenge.".into());
    } else if condition.contains("clear") || condition.contains("sun") {
        out.push("Sunny day: good for pair programming.".into());
        out.push("Bright weather suits UI and UX work.".into());
    }

    if weather.humidity > 80.0 {
        out.push("High humidity: keep your equipment cool.".into());
    } else if weather.humidity < 30.0 {
        out.push("Low humidity: watch out for static around your electronics.".into());
    }

    match hour {
        6..=10 => out.push("Morning: best time for hard problems and architecture.".into()),
        14..=17 => out.push("Afternoon: a good slot for testing and debugging.".into()),
        18..=22 => out.push("Evening: experiment with creative side projects.".into()),
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::weather_api::{OwmCondition, OwmForecastEntry, OwmMain};

    fn entry(dt: &str, temp: f64, humidity: f64, cond: &str) -> OwmForecastEntry {
        OwmForecastEntry {
            dt_txt: dt.to_string(),
            main: OwmMain {
                temp,
                humidity,
                ..Default::default()
            },
            weather: vec![OwmCondition {
                main: cond.to_string(),
                description: format!("{} today", cond.to_lowercase()),
                icon: String::new(),
            }],
        }
    }

    #[test]
    fn forecast_groups_entries_per_day() {
        let api = OwmForecast {
            city: crate::api::weather_api::OwmCity {
                name: "Oslo".into(),
            },
            list: vec![
                entry("2024-05-01 09:00:00", 10.04, 60.0, "Rain"),
                entry("2024-05-01 12:00:00", 14.0, 70.0, "Clouds"),
                entry("2024-05-01 15:00:00", 12.0, 80.0, "Rain"),
                entry("2024-05-02 09:00:00", 8.0, 40.0, "Clear"),
                entry("2024-05-03 09:00:00", 9.0, 40.0, "Clear"),
            ],
        };
        let fc = transform_forecast(api, 2);
        assert_eq!(fc.location, "Oslo");
        assert_eq!(fc.forecasts.len(), 2);

        let first = &fc.forecasts[0];
        assert_eq!(first.date, "2024-05-01");
        assert_eq!(first.min_temp, 10.0);
        assert_eq!(first.max_temp, 14.0);
        assert_eq!(first.avg_temp, 12.0);
        assert_eq!(first.avg_humidity, 70.0);
        assert_eq!(first.condition, "Rain");
        assert_eq!(fc.forecasts[1].date, "2024-05-02");
    }

    #[test]
    fn current_converts_units_and_rounds() {
        let api: OwmCurrent = serde_json::from_value(serde_json::json!({
            "name": "Paris",
            "sys": {"country": "FR"},
            "main": {"temp": 21.456, "feels_like": 20.04, "humidity": 55, "pressure": 1012},
            "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}],
            "wind": {"speed": 3.1, "deg": 270},
            "visibility": 10000
        }))
        .unwrap();
        let w = transform_current(api);
        assert_eq!(w.temperature, 21.5);
        assert_eq!(w.feels_like, 20.0);
        assert_eq!(w.visibility, 10.0);
        assert_eq!(w.condition, "Clear");
        assert!(!w.fallback);
    }

    #[test]
    fn fallback_forecast_starts_today() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let fc = fallback_forecast("Nowhere", 3, start);
        let dates: Vec<_> = fc.forecasts.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, ["2024-12-30", "2024-12-31", "2025-01-01"]);
        assert!(fc.fallback);
    }

    #[test]
    fn recommendations_follow_conditions() {
        let mut w = fallback_current("Bergen");
        w.temperature = 5.0;
        w.condition = "Rain".into();
        w.humidity = 90.0;
        let recs = recommendations(&w, 8);
        assert!(recs.iter().any(|r| r.starts_with("Cold outside")));
        assert!(recs.iter().any(|r| r.starts_with("Rainy day")));
        assert!(recs.iter().any(|r| r.starts_with("High humidity")));
        assert!(recs.iter().any(|r| r.starts_with("Morning")));

        w.temperature = 35.0;
        w.condition = "Clear".into();
        w.humidity = 50.0;
        let recs = recommendations(&w, 3);
        assert!(recs.iter().any(|r| r.starts_with("Hot weather")));
        assert!(recs.iter().any(|r| r.starts_with("Sunny day")));
        assert!(!recs.iter().any(|r| r.starts_with("Morning")));
    }

    #[test]
    fn most_frequent_prefers_first_on_tie() {
        let vals = vec!["b".to_string(), "a".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(most_frequent(&vals), "b");
        assert_eq!(most_frequent(&[]), "Unknown");
    }
}
