use crate::api::read_json;
use crate::config::endpoint;
use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;
use url::Url;

/// `GET /weather` payload (metric units). Fields the provider may omit
/// default to zero/empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmCurrent {
    pub name: String,
    pub sys: OwmSys,
    pub main: OwmMain,
    pub weather: Vec<OwmCondition>,
    pub wind: OwmWind,
    /// Metres.
    pub visibility: f64,
    pub uvi: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmSys {
    pub country: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmCondition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmWind {
    pub speed: f64,
    pub deg: f64,
}

/// `GET /forecast` payload: 3-hourly entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmForecast {
    pub city: OwmCity,
    pub list: Vec<OwmForecastEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmCity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmForecastEntry {
    /// `YYYY-MM-DD HH:MM:SS`.
    pub dt_txt: String,
    pub main: OwmMain,
    pub weather: Vec<OwmCondition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwmGeoLocation {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmAirPollution {
    pub list: Vec<OwmAirEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmAirEntry {
    pub main: OwmAqi,
    #[serde(default)]
    pub components: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmAqi {
    pub aqi: u8,
}

/// Stateless OpenWeatherMap endpoints.
pub struct WeatherEndpoints;

impl WeatherEndpoints {
    pub async fn current(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        location: &str,
    ) -> Result<OwmCurrent> {
        let resp = client
            .get(endpoint(base, "weather")?)
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;
        let payload = read_json(resp).await?;
        info!(location, "current weather fetched");
        Ok(payload)
    }

    pub async fn forecast(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        location: &str,
        entries: u32,
    ) -> Result<OwmForecast> {
        let cnt = entries.to_string();
        let resp = client
            .get(endpoint(base, "forecast")?)
            .query(&[
                ("q", location),
                ("appid", api_key),
                ("units", "metric"),
                ("cnt", cnt.as_str()),
            ])
            .send()
            .await?;
        let payload = read_json(resp).await?;
        info!(location, entries, "forecast fetched");
        Ok(payload)
    }

    pub async fn geocode(
        client: &reqwest::Client,
        geo_base: &Url,
        api_key: &str,
        query: &str,
        limit: u8,
    ) -> Result<Vec<OwmGeoLocation>> {
        let limit = limit.to_string();
        let resp = client
            .get(endpoint(geo_base, "direct")?)
            .query(&[("q", query), ("limit", limit.as_str()), ("appid", api_key)])
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn air_pollution(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        lat: f64,
        lon: f64,
    ) -> Result<OwmAirPollution> {
        let (lat, lon) = (lat.to_string(), lon.to_string());
        let resp = client
            .get(endpoint(base, "air_pollution")?)
            .query(&[("lat", lat.as_str()), ("lon", lon.as_str()), ("appid", api_key)])
            .send()
            .await?;
        read_json(resp).await
    }
}
