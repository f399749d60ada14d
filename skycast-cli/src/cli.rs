use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Password, PasswordDisplayMode, Text};
use std::sync::Arc;

use skycast_core::{
    Config, Coordinates, FetchError, FetchPhase, FixedLocation, PrefsStore,
    TemperatureUnit, WeatherController, provider_from_config,
};

use crate::{render, surfaces::TerminalSurfaces};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather dashboard for the terminal")]
pub struct Cli {
    /// Show temperatures in °F instead of °C.
    #[arg(long, global = true)]
    pub fahrenheit: bool,

    /// Defaults to `start` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and display locale.
    Configure,

    /// Search weather for a city.
    Show {
        /// City name; diacritics are stripped before the request.
        #[arg(required = true, num_args = 1..)]
        city: Vec<String>,
    },

    /// Weather for the current location; also turns auto-location on.
    Here {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Re-fetch the last city.
    Refresh,

    /// Same as launching the app: current location if auto-location is on,
    /// otherwise the last city.
    Start {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Inspect or edit the search history.
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Turn auto-location on or off.
    AutoLocation {
        #[arg(value_enum)]
        state: Toggle,

        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    List,
    Remove {
        #[arg(required = true, num_args = 1..)]
        city: Vec<String>,
    },
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

/// Stand-in for the device location; falls back to `default_location` in the config.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct LocationArgs {
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(self, config: &Config) -> FixedLocation {
        let explicit = self.lat.zip(self.lon).map(|(lat, lon)| Coordinates { lat, lon });
        FixedLocation(explicit.or(config.default_location))
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let unit =
            if self.fahrenheit { TemperatureUnit::Fahrenheit } else { TemperatureUnit::Celsius };
        let command = self.command.unwrap_or(Command::Start { location: LocationArgs::default() });

        match command {
            Command::Configure => configure(),
            Command::History { action } => history(action.unwrap_or(HistoryAction::List)),
            Command::Show { city } => {
                let controller = build_controller(LocationArgs::default(), unit)?;
                let city = city.join(" ");
                present(&controller, controller.search(&city), unit).await
            }
            Command::Here { location } | Command::AutoLocation { state: Toggle::On, location } => {
                let controller = build_controller(location, unit)?;
                present(&controller, controller.enable_auto_location(), unit).await
            }
            Command::Refresh => {
                let controller = build_controller(LocationArgs::default(), unit)?;
                present(&controller, controller.refresh(), unit).await
            }
            Command::Start { location } => {
                let controller = build_controller(location, unit)?;
                present(&controller, controller.start(), unit).await
            }
            Command::AutoLocation { state: Toggle::Off, .. } => {
                PrefsStore::open_default()?.set_auto_location(false)?;
                println!("Auto-location disabled");
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }
    config.set_api_key(api_key);

    let lang = Text::new("Description locale:")
        .with_default(config.lang())
        .prompt()
        .context("Failed to read locale")?;
    config.lang = Some(lang.trim().to_string());

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn history(action: HistoryAction) -> anyhow::Result<()> {
    let store = PrefsStore::open_default()?;

    match action {
        HistoryAction::List => {
            let history = store.load_history();
            if history.is_empty() {
                println!("No searches yet");
            }
            for (i, city) in history.iter().enumerate() {
                println!("{:>2}. {city}", i + 1);
            }
        }
        HistoryAction::Remove { city } => {
            let remaining = store.remove_history(&city.join(" "))?;
            println!("{} cities in history", remaining.len());
        }
        HistoryAction::Clear => {
            store.clear_history()?;
            println!("History cleared");
        }
    }

    Ok(())
}

fn build_controller(location: LocationArgs, unit: TemperatureUnit) -> anyhow::Result<WeatherController> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    let store = PrefsStore::open_default()?;
    let widget_path = Config::data_dir()?.join("widget.txt");
    let surfaces = TerminalSurfaces::new(store.clone(), widget_path, unit);

    Ok(WeatherController::new(
        Arc::new(provider),
        Arc::new(location.resolve(&config)),
        Arc::new(surfaces),
        store,
    ))
}

/// Run one controller operation and print the resulting dashboard.
async fn present(
    controller: &WeatherController,
    operation: impl Future<Output = Result<(), FetchError>>,
    unit: TemperatureUnit,
) -> anyhow::Result<()> {
    if let Err(err) = operation.await {
        return Err(anyhow!(err.user_message()));
    }

    let state = controller.state();
    if state.phase == FetchPhase::Idle {
        println!("Nothing to show yet. Try `skycast show <city>` or `skycast auto-location on`.");
        return Ok(());
    }

    print!("{}", render::dashboard(&state, unit));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn show_joins_multi_word_city() {
        let cli = Cli::parse_from(["skycast", "show", "Ha", "Noi"]);
        match cli.command {
            Some(Command::Show { city }) => assert_eq!(city.join(" "), "Ha Noi"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn here_accepts_negative_coordinates() {
        let cli = Cli::parse_from(["skycast", "here", "--lat", "-33.87", "--lon", "151.21"]);
        let Some(Command::Here { location }) = cli.command else {
            panic!("expected here command");
        };
        let fixed = location.resolve(&Config::default());
        assert_eq!(fixed.0, Some(Coordinates { lat: -33.87, lon: 151.21 }));
    }

    #[test]
    fn location_falls_back_to_config() {
        let config = Config {
            default_location: Some(Coordinates { lat: 21.03, lon: 105.85 }),
            ..Config::default()
        };
        let fixed = LocationArgs::default().resolve(&config);
        assert_eq!(fixed.0, config.default_location);
    }

    #[test]
    fn here_and_auto_location_on_share_location_args() {
        let here = Cli::parse_from(["skycast", "here", "--lat", "21.03", "--lon", "105.85"]);
        let on = Cli::parse_from(["skycast", "auto-location", "on", "--lat", "21.03", "--lon", "105.85"]);

        let location_of = |cli: Cli| match cli.command {
            Some(Command::Here { location } | Command::AutoLocation { state: Toggle::On, location }) => {
                location.resolve(&Config::default())
            }
            other => panic!("unexpected command: {other:?}"),
        };

        assert_eq!(location_of(here).0, location_of(on).0);
    }

    #[test]
    fn auto_location_off_parses() {
        let cli = Cli::parse_from(["skycast", "auto-location", "off"]);
        assert!(matches!(cli.command, Some(Command::AutoLocation { state: Toggle::Off, .. })));
    }

    #[test]
    fn missing_subcommand_means_start() {
        let cli = Cli::parse_from(["skycast", "--fahrenheit"]);
        assert!(cli.fahrenheit);
        assert!(cli.command.is_none());
    }
}
