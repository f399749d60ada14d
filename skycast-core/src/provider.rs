use anyhow::anyhow;
use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::WeatherError,
    model::{ForecastSeries, LocationQuery, WeatherSnapshot},
};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Source of current conditions and 3-hour forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError>;

    async fn forecast(&self, query: &LocationQuery) -> Result<ForecastSeries, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenWeatherProvider> {
    provider_with_key(config.api_key(), config)
}

fn provider_with_key(
    api_key: Option<String>,
    config: &Config,
) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = api_key.ok_or_else(|| {
        anyhow!(
            "No API key configured.\n\
             Hint: run `skycast configure` or set SKYCAST_API_KEY."
        )
    })?;

    Ok(OpenWeatherProvider::new(api_key)?
        .with_base_url(config.base_url())
        .with_lang(config.lang()))
}
