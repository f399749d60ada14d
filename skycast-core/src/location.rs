use async_trait::async_trait;

use crate::{error::LocationError, model::Coordinates};

/// Device location capability, supplied by the front end.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Best-effort current position.
    async fn current_location(&self) -> Result<Coordinates, LocationError>;
}

/// Location known up front, e.g. from the command line or the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        self.0.ok_or(LocationError::NoFix)
    }
}
