//! Weather command handlers

use crate::cli::output::{field, heading, notice, print_json, print_table};
use crate::cli::{AppContext, WeatherCommands};
use crate::error::Result;
use crate::service::weather::{WeatherService, recommendations};
use chrono::{Local, Timelike};
use colored::Colorize;
use serde_json::json;
use tabled::Tabled;
use tracing::warn;

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Condition")]
    condition: String,
}

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Lat")]
    lat: String,
    #[tabled(rename = "Lon")]
    lon: String,
}

fn fallback_notice() {
    notice("Showing placeholder data: set WEATHER_API_KEY for live weather.");
}

pub async fn handle(ctx: &AppContext, cmd: WeatherCommands) -> Result<()> {
    // The cache is optional; an unusable database only costs provider calls.
    let engine = match ctx.engine().await {
        Ok(engine) => Some(engine),
        Err(e) => {
            warn!(error = %e, "weather cache unavailable; continuing without it");
            None
        }
    };
    let mut service = WeatherService::new(ctx.http()?, ctx.config(), ctx.keys.weather.clone());
    if let Some(engine) = &engine {
        service = service.with_cache(engine.clone());
    }

    let outcome = match cmd {
        WeatherCommands::Current { location } => {
            let weather = service.current(location.as_deref()).await;
            let tips = recommendations(&weather, Local::now().hour());
            if ctx.json {
                print_json(&json!({ "weather": weather, "recommendations": tips }))
            } else {
                let place = if weather.country.is_empty() {
                    weather.location.clone()
                } else {
                    format!("{}, {}", weather.location, weather.country)
                };
                heading(&place);
                field("Condition", format!("{} ({})", weather.condition, weather.description));
                field(
                    "Temperature",
                    format!("{} °C, feels like {} °C", weather.temperature, weather.feels_like),
                );
                field("Humidity", format!("{}%", weather.humidity));
                field("Pressure", format!("{} hPa", weather.pressure));
                field(
                    "Wind",
                    format!("{} m/s at {}°", weather.wind_speed, weather.wind_direction),
                );
                field("Visibility", format!("{} km", weather.visibility));
                println!("\n{}", "Coding recommendations".bold());
                for tip in &tips {
                    println!("  • {tip}");
                }
                if weather.fallback {
                    println!();
                    fallback_notice();
                }
                Ok(())
            }
        }
        WeatherCommands::Forecast { location, days } => {
            let forecast = service.forecast(location.as_deref(), days).await;
            if ctx.json {
                print_json(&forecast)
            } else {
                heading(&format!("{} forecast for {}", days.clamp(1, 5), forecast.location));
                print_table(
                    forecast
                        .forecasts
                        .iter()
                        .map(|d| ForecastRow {
                            date: d.date.clone(),
                            min: format!("{} °C", d.min_temp),
                            max: format!("{} °C", d.max_temp),
                            avg: format!("{} °C", d.avg_temp),
                            humidity: format!("{}%", d.avg_humidity),
                            condition: d.condition.clone(),
                        })
                        .collect(),
                );
                if forecast.fallback {
                    fallback_notice();
                }
                Ok(())
            }
        }
        WeatherCommands::Search { query } => {
            let found = service.search_locations(&query).await;
            if ctx.json {
                print_json(&found)
            } else {
                let coord = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".into());
                print_table(
                    found
                        .into_iter()
                        .map(|l| LocationRow {
                            name: l.name,
                            state: l.state,
                            country: l.country,
                            lat: coord(l.lat),
                            lon: coord(l.lon),
                        })
                        .collect(),
                );
                if !service.has_api_key() {
                    fallback_notice();
                }
                Ok(())
            }
        }
        WeatherCommands::Air { location } => {
            let air = service.air_quality(location.as_deref()).await;
            if ctx.json {
                print_json(&air)
            } else {
                heading(&format!(
                    "Air quality in {}",
                    location.as_deref().unwrap_or(service.default_location())
                ));
                field("AQI", format!("{} ({})", air.aqi, air.description));
                let mut components: Vec<_> = air.components.iter().collect();
                components.sort_by(|a, b| a.0.cmp(b.0));
                for (name, value) in components {
                    field(name, format!("{value} µg/m³"));
                }
                if air.fallback {
                    fallback_notice();
                }
                Ok(())
            }
        }
    };
    if let Some(engine) = engine {
        engine.close().await;
    }
    outcome
}
