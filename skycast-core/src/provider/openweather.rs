use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

use crate::{
    config::{DEFAULT_BASE_URL, DEFAULT_LANG},
    error::WeatherError,
    model::{
        Condition, Coordinates, ForecastEntry, ForecastSeries, LocationQuery, MainReadings,
        WeatherSnapshot,
    },
};

use super::WeatherProvider;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const UNITS: &str = "metric";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    lang: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| WeatherError::transport("Failed to build HTTP client", e))?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    pub async fn current_by_name(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.current(&LocationQuery::City(city.to_string())).await
    }

    pub async fn forecast_by_name(&self, city: &str) -> Result<ForecastSeries, WeatherError> {
        self.forecast(&LocationQuery::City(city.to_string())).await
    }

    pub async fn current_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.current(&LocationQuery::Coords(coords)).await
    }

    pub async fn forecast_by_coords(
        &self,
        coords: Coordinates,
    ) -> Result<ForecastSeries, WeatherError> {
        self.forecast(&LocationQuery::Coords(coords)).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &LocationQuery,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));

        let mut params: Vec<(&str, String)> = match query {
            LocationQuery::City(name) => vec![("q", name.clone())],
            LocationQuery::Coords(c) => vec![("lat", c.lat.to_string()), ("lon", c.lon.to_string())],
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", UNITS.to_string()));
        params.push(("lang", self.lang.clone()));

        debug!(endpoint, ?query, "requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| WeatherError::transport(&format!("Failed to send OpenWeather {endpoint} request"), e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::transport(&format!("Failed to read OpenWeather {endpoint} body"), e))?;

        if status == StatusCode::NOT_FOUND {
            debug!(endpoint, body = %truncate_body(&body), "OpenWeather could not resolve location");
            return Err(WeatherError::NotFound);
        }

        if !status.is_success() {
            debug!(endpoint, %status, body = %truncate_body(&body), "OpenWeather request failed");
            return Err(WeatherError::Http { status: status.as_u16() });
        }

        serde_json::from_str(&body)
            .map_err(|e| WeatherError::transport(&format!("Failed to parse OpenWeather {endpoint} JSON"), e))
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    visibility: u32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    #[serde(default)]
    dt_txt: String,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

impl From<OwWeather> for Condition {
    fn from(w: OwWeather) -> Self {
        Condition { main: w.main, description: w.description, icon: w.icon }
    }
}

impl From<OwMain> for MainReadings {
    fn from(m: OwMain) -> Self {
        MainReadings {
            temp: m.temp,
            humidity: m.humidity,
            pressure: m.pressure,
            feels_like: m.feels_like,
        }
    }
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(r: OwCurrentResponse) -> Self {
        let condition = r.weather.into_iter().next().map(Condition::from).unwrap_or_default();

        WeatherSnapshot {
            city: r.name,
            temperature: r.main.temp,
            feels_like: r.main.feels_like,
            humidity: r.main.humidity,
            pressure: r.main.pressure,
            wind_speed: r.wind.speed,
            condition,
            visibility: r.visibility,
        }
    }
}

impl From<OwForecastEntry> for ForecastEntry {
    fn from(e: OwForecastEntry) -> Self {
        ForecastEntry {
            dt: e.dt,
            dt_txt: e.dt_txt,
            main: e.main.into(),
            conditions: e.weather.into_iter().map(Condition::from).collect(),
            wind_speed: e.wind.speed,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
        let parsed: OwCurrentResponse = self.get("weather", query).await?;
        Ok(parsed.into())
    }

    async fn forecast(&self, query: &LocationQuery) -> Result<ForecastSeries, WeatherError> {
        let parsed: OwForecastResponse = self.get("forecast", query).await?;
        Ok(parsed.list.into_iter().map(ForecastEntry::from).collect())
    }
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
