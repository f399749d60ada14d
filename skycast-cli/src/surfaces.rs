use anyhow::Context;
use async_trait::async_trait;
use std::{fs, path::PathBuf};
use tracing::debug;

use skycast_core::{ExternalSurfaces, PrefsStore, SurfaceUpdate, TemperatureUnit};

use crate::render::widget_text;

/// Widget summary file plus a notification line on stderr.
pub struct TerminalSurfaces {
    store: PrefsStore,
    widget_path: PathBuf,
    unit: TemperatureUnit,
}

impl TerminalSurfaces {
    pub fn new(store: PrefsStore, widget_path: PathBuf, unit: TemperatureUnit) -> Self {
        Self { store, widget_path, unit }
    }

    fn write_widget(&self) -> anyhow::Result<()> {
        let summary = self.store.prefs().last_summary();

        if let Some(parent) = self.widget_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create widget directory: {}", parent.display()))?;
        }

        fs::write(&self.widget_path, widget_text(summary.as_ref()))
            .with_context(|| format!("Failed to write widget file: {}", self.widget_path.display()))?;

        debug!(path = %self.widget_path.display(), "widget updated");
        Ok(())
    }
}

#[async_trait]
impl ExternalSurfaces for TerminalSurfaces {
    async fn refresh(&self, update: &SurfaceUpdate) -> anyhow::Result<()> {
        let (title, body) = update.notification(self.unit);
        eprintln!("[{title}] {body}");

        self.write_widget()
    }
}
