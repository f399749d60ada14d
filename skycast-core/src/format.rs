//! Display helpers shared by the dashboard and the external surfaces.

use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn toggle(self) -> Self {
        match self {
            TemperatureUnit::Celsius => TemperatureUnit::Fahrenheit,
            TemperatureUnit::Fahrenheit => TemperatureUnit::Celsius,
        }
    }
}

/// Format a Celsius reading in the requested unit, truncated toward zero.
pub fn format_temp(temp_c: f64, unit: TemperatureUnit) -> String {
    match unit {
        TemperatureUnit::Celsius => format!("{}°C", temp_c.trunc() as i64),
        TemperatureUnit::Fahrenheit => format!("{}°F", (temp_c * 9.0 / 5.0 + 32.0).trunc() as i64),
    }
}

/// ASCII-fold a user-typed city name so the provider can resolve it.
///
/// Strips combining diacritics after canonical decomposition. `đ`/`Đ` have no
/// decomposition and are mapped explicitly.
pub fn format_city_name(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
