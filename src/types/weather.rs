use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub location: String,
    pub country: String,
    /// Celsius, rounded to 0.1.
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub wind_speed: f64,
    pub wind_direction: f64,
    /// Kilometres.
    pub visibility: f64,
    pub uv_index: f64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub min_temp: f64,
    pub max_temp: f64,
    pub avg_temp: f64,
    pub condition: String,
    pub avg_humidity: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: String,
    pub forecasts: Vec<DailyForecast>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMatch {
    pub name: String,
    pub country: String,
    pub state: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// 1 (Good) ..= 5 (Very Poor).
    pub aqi: u8,
    pub description: String,
    pub components: HashMap<String, f64>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub fallback: bool,
}

pub const AQI_LEVELS: [&str; 5] = ["Good", "Fair", "Moderate", "Poor", "Very Poor"];

pub fn aqi_label(aqi: u8) -> &'static str {
    match aqi {
        1..=5 => AQI_LEVELS[usize::from(aqi) - 1],
        _ => "Unknown",
    }
}
