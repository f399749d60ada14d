use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// What a request is asking weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Normalized city name, see [`crate::format::format_city_name`].
    City(String),
    Coords(Coordinates),
}

/// One entry of the provider's `weather[]` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition group, e.g. "Clear", "Clouds", "Rain".
    pub main: String,
    /// Localized human description.
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn icon_url(&self) -> String {
        format!("{ICON_BASE_URL}/{}@2x.png", self.icon)
    }
}

/// Current conditions for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    /// Degrees Celsius.
    pub temperature: f64,
    pub feels_like: f64,
    /// Percent.
    pub humidity: u8,
    /// hPa.
    pub pressure: u32,
    /// m/s.
    pub wind_speed: f64,
    pub condition: Condition,
    /// Meters.
    pub visibility: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub feels_like: f64,
}

/// One 3-hour forecast record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Unix seconds.
    pub dt: i64,
    /// Provider formatted time, "YYYY-MM-DD HH:MM:SS".
    pub dt_txt: String,
    pub main: MainReadings,
    pub conditions: Vec<Condition>,
    pub wind_speed: f64,
}

impl ForecastEntry {
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }
}

/// Chronological forecast entries as returned by the provider.
pub type ForecastSeries = Vec<ForecastEntry>;
