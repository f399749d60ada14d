//! Durable user state: last fetched result, auto-location toggle and the
//! search history.
//!
//! Every operation is a read-modify-write of one JSON file. There is no
//! locking; two writers racing on the same file lose updates (last write
//! wins).

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub const HISTORY_LIMIT: usize = 10;

const LEGACY_DELIMITER: char = ',';

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub auto_location: bool,
    #[serde(default)]
    pub last_city: Option<String>,
    #[serde(default)]
    pub last_temp: Option<f64>,
    #[serde(default)]
    pub last_condition: Option<String>,
    #[serde(default, deserialize_with = "deserialize_history")]
    pub search_history: Vec<String>,
}

/// Last successfully fetched result, as shown on the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct LastSummary {
    pub city: String,
    pub temperature: f64,
    pub condition: String,
}

impl Prefs {
    pub fn last_summary(&self) -> Option<LastSummary> {
        let city = self.last_city.clone().filter(|c| !c.is_empty())?;
        Some(LastSummary {
            city,
            temperature: self.last_temp.unwrap_or_default(),
            condition: self.last_condition.clone().unwrap_or_default(),
        })
    }
}

/// Accepts the JSON array form and the older comma-joined string. The first
/// occurrence of a city wins and the list is capped at [`HISTORY_LIMIT`].
fn deserialize_history<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        List(Vec<String>),
        Delimited(String),
    }

    let raw = match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::List(items)) => items,
        Some(Repr::Delimited(joined)) => {
            joined.split(LEGACY_DELIMITER).map(str::to_string).collect()
        }
        None => Vec::new(),
    };

    let mut history: Vec<String> = Vec::with_capacity(HISTORY_LIMIT);
    for city in raw.into_iter().map(|s| s.trim().to_string()) {
        if !city.is_empty() && !history.contains(&city) {
            history.push(city);
        }
    }
    history.truncate(HISTORY_LIMIT);
    Ok(history)
}

/// Apply the history rules: move-to-front, de-duplicate, cap at [`HISTORY_LIMIT`].
pub fn push_front(history: &mut Vec<String>, city: &str) {
    let city = city.trim();
    if city.is_empty() {
        return;
    }
    history.retain(|c| c != city);
    history.insert(0, city.to_string());
    history.truncate(HISTORY_LIMIT);
}

#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform data dir.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::Config::prefs_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current prefs. Missing or unreadable files yield defaults.
    pub fn prefs(&self) -> Prefs {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Prefs::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read prefs, using defaults");
                return Prefs::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt prefs file, using defaults");
                Prefs::default()
            }
        }
    }

    fn save(&self, prefs: &Prefs) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create prefs directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(prefs).context("Failed to serialize prefs")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write prefs file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), "prefs saved");
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut Prefs) -> T) -> Result<T> {
        let mut prefs = self.prefs();
        let out = f(&mut prefs);
        self.save(&prefs)?;
        Ok(out)
    }

    /// Remember a successful fetch and move `city` to the front of the history.
    pub fn record_fetch(&self, city: &str, temp: f64, condition: &str) -> Result<Vec<String>> {
        self.update(|p| {
            p.last_city = Some(city.to_string());
            p.last_temp = Some(temp);
            p.last_condition = Some(condition.to_string());
            push_front(&mut p.search_history, city);
            p.search_history.clone()
        })
    }

    pub fn push_history(&self, city: &str) -> Result<Vec<String>> {
        self.update(|p| {
            push_front(&mut p.search_history, city);
            p.search_history.clone()
        })
    }

    /// Drop every occurrence of `city`. Last-fetch fields are left alone.
    pub fn remove_history(&self, city: &str) -> Result<Vec<String>> {
        let city = city.trim();
        self.update(|p| {
            p.search_history.retain(|c| c != city);
            p.search_history.clone()
        })
    }

    pub fn clear_history(&self) -> Result<()> {
        self.update(|p| p.search_history.clear())
    }

    pub fn load_history(&self) -> Vec<String> {
        self.prefs().search_history
    }

    pub fn set_auto_location(&self, enabled: bool) -> Result<()> {
        self.update(|p| p.auto_location = enabled)
    }

    pub fn auto_location(&self) -> bool {
        self.prefs().auto_location
    }

    pub fn last_city(&self) -> Option<String> {
        self.prefs().last_city.filter(|c| !c.trim().is_empty())
    }
}
