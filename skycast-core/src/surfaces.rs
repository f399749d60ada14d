use async_trait::async_trait;

use crate::format::{TemperatureUnit, capitalize_first, format_temp};

/// Summary pushed to widgets and notifications after a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceUpdate {
    pub city: String,
    pub temperature: f64,
    pub condition: String,
}

impl SurfaceUpdate {
    /// Notification title and body.
    pub fn notification(&self, unit: TemperatureUnit) -> (String, String) {
        let body = format!(
            "{} - {}",
            format_temp(self.temperature, unit),
            capitalize_first(&self.condition)
        );
        (self.city.clone(), body)
    }
}

/// Widgets, notifications and anything else mirroring the last result.
///
/// Failures are reported to the caller but never undo the fetch.
#[async_trait]
pub trait ExternalSurfaces: Send + Sync {
    async fn refresh(&self, update: &SurfaceUpdate) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSurfaces;

#[async_trait]
impl ExternalSurfaces for NoopSurfaces {
    async fn refresh(&self, _update: &SurfaceUpdate) -> anyhow::Result<()> {
        Ok(())
    }
}
