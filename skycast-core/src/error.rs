use thiserror::Error;

/// Failure of a single request to the weather provider.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The provider could not resolve the requested location.
    #[error("location not found")]
    NotFound,

    /// Any other non-success HTTP status.
    #[error("weather provider returned HTTP {status}")]
    Http { status: u16 },

    /// Network, timeout or decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl WeatherError {
    pub(crate) fn transport(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport(format!("{context}: {err}"))
    }
}

/// Failure to obtain a device location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location provider unavailable: {0}")]
    Unavailable(String),
    #[error("no location fix available")]
    NoFix,
}

/// Terminal outcome of a failed fetch cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Location(#[from] LocationError),
}

impl FetchError {
    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Weather(WeatherError::NotFound) => {
                "City not found or the name is misspelled".to_string()
            }
            FetchError::Weather(WeatherError::Http { status }) => {
                format!("Weather service error: {status}")
            }
            FetchError::Weather(WeatherError::Transport(_)) => {
                "Could not reach the weather service".to_string()
            }
            FetchError::Location(LocationError::PermissionDenied) => {
                "Location permission has not been granted".to_string()
            }
            FetchError::Location(LocationError::Unavailable(reason)) => {
                format!("Could not access location: {reason}")
            }
            FetchError::Location(LocationError::NoFix) => {
                "Could not determine your location. Is location enabled?".to_string()
            }
        }
    }
}
