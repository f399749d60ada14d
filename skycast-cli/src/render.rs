use chrono::{DateTime, Local};
use crossterm::style::{Color, Stylize};
use std::fmt::Write;

use skycast_core::{
    AppState, ForecastEntry, TemperatureUnit, WeatherSnapshot,
    forecast::{daily_digest, next_hours},
    format::{capitalize_first, format_temp},
    store::LastSummary,
};

/// Dashboard palette, keyed by the provider's condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Clear,
    Clouds,
    Rain,
    Thunderstorm,
    Snow,
    Mist,
    Default,
}

impl Theme {
    pub fn for_condition(main: Option<&str>) -> Self {
        match main {
            Some("Clear") => Theme::Clear,
            Some("Clouds") => Theme::Clouds,
            Some("Rain" | "Drizzle") => Theme::Rain,
            Some("Thunderstorm") => Theme::Thunderstorm,
            Some("Snow") => Theme::Snow,
            Some("Mist" | "Smoke" | "Haze" | "Fog") => Theme::Mist,
            _ => Theme::Default,
        }
    }

    /// Primary and secondary colors.
    fn colors(self) -> (Color, Color) {
        let rgb = |hex: u32| Color::Rgb { r: (hex >> 16) as u8, g: (hex >> 8) as u8, b: hex as u8 };
        match self {
            Theme::Clear => (rgb(0x4A90E2), rgb(0x50E3C2)),
            Theme::Clouds => (rgb(0x757F9A), rgb(0xD7DDE8)),
            Theme::Rain => (rgb(0x414345), rgb(0x9E9E9E)),
            Theme::Thunderstorm => (rgb(0x2C5364), rgb(0x203A43)),
            Theme::Snow => (rgb(0xB3E5FC), rgb(0xE1F5FE)),
            Theme::Mist => (rgb(0x606C88), rgb(0x3F4C6B)),
            Theme::Default => (rgb(0x81D4FA), rgb(0x01579B)),
        }
    }
}

pub fn dashboard(state: &AppState, unit: TemperatureUnit) -> String {
    let mut out = String::new();

    if let Some(error) = &state.error {
        let _ = writeln!(out, "{}", error.as_str().with(Color::Red).bold());
    }

    let Some(weather) = &state.weather else {
        if state.error.is_none() {
            let _ = writeln!(out, "No weather loaded yet. Try `skycast show <city>`.");
        }
        return out;
    };

    let theme = Theme::for_condition(Some(weather.condition.main.as_str()));
    let (primary, secondary) = theme.colors();

    current_card(&mut out, weather, unit, primary, secondary);

    if let Some(forecast) = &state.forecast {
        next_hours_strip(&mut out, forecast, unit, primary);
        daily_list(&mut out, forecast, unit, primary);
    }

    if !state.history.is_empty() {
        let _ = writeln!(out, "\n{}", "Recent searches".with(primary).bold());
        let _ = writeln!(out, "  {}", state.history.join(" · "));
    }

    out
}

fn current_card(
    out: &mut String,
    weather: &WeatherSnapshot,
    unit: TemperatureUnit,
    primary: Color,
    secondary: Color,
) {
    let _ = writeln!(out, "{}", weather.city.as_str().with(primary).bold());
    let _ = writeln!(
        out,
        "  {}  {}",
        format_temp(weather.temperature, unit).with(secondary).bold(),
        capitalize_first(&weather.condition.description)
    );
    let _ = writeln!(out, "  Feels like  {}", format_temp(weather.feels_like, unit));
    let _ = writeln!(out, "  Humidity    {}%", weather.humidity);
    let _ = writeln!(out, "  Wind        {} m/s", weather.wind_speed);
    let _ = writeln!(out, "  Pressure    {} hPa", weather.pressure);
    let _ = writeln!(out, "  Visibility  {:.1} km", f64::from(weather.visibility) / 1000.0);
}

fn next_hours_strip(out: &mut String, forecast: &[ForecastEntry], unit: TemperatureUnit, primary: Color) {
    let _ = writeln!(out, "\n{}", "Next 24 hours".with(primary).bold());

    let cells: Vec<String> = next_hours(forecast)
        .iter()
        .map(|e| format!("{} {}", hour_label(e), format_temp(e.main.temp, unit)))
        .collect();
    let _ = writeln!(out, "  {}", cells.join("  "));
}

fn daily_list(out: &mut String, forecast: &[ForecastEntry], unit: TemperatureUnit, primary: Color) {
    let digest = daily_digest(forecast);
    if digest.is_empty() {
        return;
    }

    let _ = writeln!(out, "\n{}", "Coming days".with(primary).bold());
    for entry in &digest {
        let description = entry.primary_condition().map(|c| c.description.as_str()).unwrap_or_default();
        let _ = writeln!(
            out,
            "  {:<10} {:>6}  {:<18} {:>3}%  {:>4.1} m/s  {} hPa",
            weekday_label(entry),
            format_temp(entry.main.temp, unit),
            capitalize_first(description),
            entry.main.humidity,
            entry.wind_speed,
            entry.main.pressure
        );
    }
}

fn local_time(entry: &ForecastEntry) -> Option<DateTime<Local>> {
    DateTime::from_timestamp(entry.dt, 0).map(|t| t.with_timezone(&Local))
}

fn hour_label(entry: &ForecastEntry) -> String {
    match local_time(entry) {
        Some(t) => t.format("%H:%M").to_string(),
        None => entry.dt_txt.get(11..16).unwrap_or("--:--").to_string(),
    }
}

fn weekday_label(entry: &ForecastEntry) -> String {
    local_time(entry).map(|t| t.format("%A").to_string()).unwrap_or_default()
}

/// Compact summary mirrored to the widget file.
pub fn widget_text(summary: Option<&LastSummary>) -> String {
    match summary {
        None => "No data yet\nRun skycast to fetch the weather\n".to_string(),
        Some(s) => {
            let mut out = format!("{}\n{}\n", s.city, format_temp(s.temperature, TemperatureUnit::Celsius));
            if !s.condition.is_empty() {
                out.push_str(&capitalize_first(&s.condition));
                out.push('\n');
            }
            out
        }
    }
}
