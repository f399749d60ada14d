//! Core library for the `skycast` weather client.
//!
//! This crate defines:
//! - Configuration and the persisted user preferences
//! - The OpenWeather client and the provider abstraction
//! - Forecast aggregation for the dashboard views
//! - The fetch controller and its observable state
//!
//! It is used by `skycast-cli`, but carries no terminal or UI code itself.

pub mod config;
pub mod controller;
pub mod error;
pub mod forecast;
pub mod format;
pub mod location;
pub mod model;
pub mod provider;
pub mod store;
pub mod surfaces;

pub use config::Config;
pub use controller::{AppState, FetchPhase, WeatherController};
pub use error::{FetchError, LocationError, WeatherError};
pub use format::{TemperatureUnit, format_city_name, format_temp};
pub use location::{FixedLocation, LocationProvider};
pub use model::{Condition, Coordinates, ForecastEntry, ForecastSeries, LocationQuery, WeatherSnapshot};
pub use provider::{OpenWeatherProvider, WeatherProvider, provider_from_config};
pub use store::{Prefs, PrefsStore};
pub use surfaces::{ExternalSurfaces, NoopSurfaces, SurfaceUpdate};
