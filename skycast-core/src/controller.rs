//! Fetch orchestration and the observable dashboard state.
//!
//! A fetch cycle goes `Idle -> Loading -> {Success, Failed}`. The current
//! conditions and the forecast are requested concurrently and published
//! together; if either request fails, neither is published.
//!
//! Cycles are not cancelled by newer ones. Overlapping cycles publish in
//! completion order.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    error::{FetchError, WeatherError},
    format::format_city_name,
    location::LocationProvider,
    model::{ForecastSeries, LocationQuery, WeatherSnapshot},
    provider::WeatherProvider,
    store::PrefsStore,
    surfaces::{ExternalSurfaces, SurfaceUpdate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub phase: FetchPhase,
    pub loading: bool,
    pub error: Option<String>,
    pub weather: Option<WeatherSnapshot>,
    pub forecast: Option<ForecastSeries>,
    pub history: Vec<String>,
}

/// Clears `loading` when a cycle ends, however it ends.
struct LoadingGuard<'a>(&'a watch::Sender<AppState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

pub struct WeatherController {
    provider: Arc<dyn WeatherProvider>,
    location: Arc<dyn LocationProvider>,
    surfaces: Arc<dyn ExternalSurfaces>,
    store: PrefsStore,
    state: watch::Sender<AppState>,
}

impl WeatherController {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        location: Arc<dyn LocationProvider>,
        surfaces: Arc<dyn ExternalSurfaces>,
        store: PrefsStore,
    ) -> Self {
        let initial = AppState { history: store.load_history(), ..AppState::default() };
        let (state, _) = watch::channel(initial);

        Self { provider, location, surfaces, store, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn store(&self) -> &PrefsStore {
        &self.store
    }

    /// Fetch by a user-typed city name. Blank input is ignored.
    pub async fn fetch_by_name(&self, city: &str) -> Result<(), FetchError> {
        let city = format_city_name(city);
        if city.is_empty() {
            debug!("ignoring blank city name");
            return Ok(());
        }

        let _loading = self.enter_loading();
        self.complete_cycle(LocationQuery::City(city)).await
    }

    /// Manual search: turns auto-location off, then fetches by name.
    pub async fn search(&self, city: &str) -> Result<(), FetchError> {
        if let Err(e) = self.store.set_auto_location(false) {
            warn!(error = %e, "failed to disable auto-location");
        }
        self.fetch_by_name(city).await
    }

    /// Fetch for the device location.
    ///
    /// Without a fix no cycle starts: the error is published and whatever is
    /// already on screen stays.
    pub async fn fetch_by_location(&self) -> Result<(), FetchError> {
        let coords = match self.location.current_location().await {
            Ok(coords) => coords,
            Err(e) => return Err(self.fail(e.into())),
        };

        debug!(lat = coords.lat, lon = coords.lon, "location fix obtained");
        let _loading = self.enter_loading();
        self.complete_cycle(LocationQuery::Coords(coords)).await
    }

    /// Turn auto-location on and fetch for the device location.
    pub async fn enable_auto_location(&self) -> Result<(), FetchError> {
        if let Err(e) = self.store.set_auto_location(true) {
            warn!(error = %e, "failed to enable auto-location");
        }
        self.fetch_by_location().await
    }

    /// Re-fetch the last successfully fetched city, if any.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        match self.store.last_city() {
            Some(city) => self.fetch_by_name(&city).await,
            None => {
                debug!("nothing to refresh, no last city");
                Ok(())
            }
        }
    }

    /// Launch behavior: device location when auto-location is on, otherwise
    /// the last city.
    pub async fn start(&self) -> Result<(), FetchError> {
        self.load_history();

        if self.store.auto_location() {
            return self.fetch_by_location().await;
        }
        self.refresh().await
    }

    pub fn load_history(&self) -> Vec<String> {
        let history = self.store.load_history();
        self.publish_history(history.clone());
        history
    }

    pub fn remove_history(&self, city: &str) -> anyhow::Result<()> {
        let history = self.store.remove_history(city)?;
        self.publish_history(history);
        Ok(())
    }

    pub fn clear_history(&self) -> anyhow::Result<()> {
        self.store.clear_history()?;
        self.publish_history(Vec::new());
        Ok(())
    }

    pub fn set_auto_location(&self, enabled: bool) -> anyhow::Result<()> {
        self.store.set_auto_location(enabled)
    }

    pub fn auto_location(&self) -> bool {
        self.store.auto_location()
    }

    fn enter_loading(&self) -> LoadingGuard<'_> {
        self.state.send_modify(|s| {
            s.phase = FetchPhase::Loading;
            s.loading = true;
            s.error = None;
            s.weather = None;
            s.forecast = None;
        });
        LoadingGuard(&self.state)
    }

    async fn complete_cycle(&self, query: LocationQuery) -> Result<(), FetchError> {
        let fetched = tokio::try_join!(self.provider.current(&query), self.provider.forecast(&query));

        match fetched {
            Ok((weather, forecast)) => {
                self.publish_success(weather, forecast).await;
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    async fn publish_success(&self, weather: WeatherSnapshot, forecast: ForecastSeries) {
        info!(city = %weather.city, entries = forecast.len(), "weather fetched");

        let update = SurfaceUpdate {
            city: weather.city.clone(),
            temperature: weather.temperature,
            condition: weather.condition.description.clone(),
        };

        self.state.send_modify(|s| {
            s.phase = FetchPhase::Success;
            s.loading = false;
            s.error = None;
            s.weather = Some(weather);
            s.forecast = Some(forecast);
        });

        let history = match self.store.record_fetch(&update.city, update.temperature, &update.condition) {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "failed to persist fetch result");
                self.store.load_history()
            }
        };
        self.publish_history(history);

        if let Err(e) = self.surfaces.refresh(&update).await {
            warn!(error = %e, "external surface refresh failed");
        }
    }

    fn fail(&self, err: FetchError) -> FetchError {
        match &err {
            FetchError::Weather(WeatherError::Transport(detail)) => {
                error!(%detail, "weather fetch failed");
            }
            other => warn!(error = %other, "weather fetch failed"),
        }

        let message = err.user_message();
        self.state.send_modify(|s| {
            s.phase = FetchPhase::Failed;
            s.loading = false;
            s.error = Some(message);
        });
        err
    }

    fn publish_history(&self, history: Vec<String>) {
        self.state.send_if_modified(|s| {
            if s.history == history {
                return false;
            }
            s.history = history;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::LocationError,
        location::FixedLocation,
        model::{Condition, Coordinates, ForecastEntry, MainReadings},
        surfaces::NoopSurfaces,
    };
    use async_trait::async_trait;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tempfile::TempDir;

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Ok,
        NotFound,
        Http(u16),
        Transport,
    }

    impl Outcome {
        fn into_result<T>(self, value: T) -> Result<T, WeatherError> {
            match self {
                Outcome::Ok => Ok(value),
                Outcome::NotFound => Err(WeatherError::NotFound),
                Outcome::Http(status) => Err(WeatherError::Http { status }),
                Outcome::Transport => Err(WeatherError::Transport("connection reset".into())),
            }
        }
    }

    #[derive(Debug)]
    struct FakeProvider {
        current: Outcome,
        forecast: Outcome,
        calls: AtomicUsize,
        queries: Mutex<Vec<LocationQuery>>,
    }

    impl FakeProvider {
        fn new(current: Outcome, forecast: Outcome) -> Arc<Self> {
            Arc::new(Self {
                current,
                forecast,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn city_of(query: &LocationQuery) -> String {
            match query {
                LocationQuery::City(name) => name.clone(),
                LocationQuery::Coords(_) => "Ho Chi Minh City".into(),
            }
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current(&self, query: &LocationQuery) -> Result<WeatherSnapshot, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            self.current.into_result(WeatherSnapshot {
                city: Self::city_of(query),
                temperature: 31.2,
                feels_like: 35.0,
                humidity: 74,
                pressure: 1007,
                wind_speed: 2.5,
                condition: Condition {
                    main: "Clouds".into(),
                    description: "mây thưa".into(),
                    icon: "02d".into(),
                },
                visibility: 10_000,
            })
        }

        async fn forecast(&self, _query: &LocationQuery) -> Result<ForecastSeries, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.forecast.into_result(vec![ForecastEntry {
                dt: 1_773_000_000,
                dt_txt: "2026-03-08 21:00:00".into(),
                main: MainReadings::default(),
                conditions: Vec::new(),
                wind_speed: 1.0,
            }])
        }
    }

    struct FailingSurfaces;

    #[async_trait]
    impl ExternalSurfaces for FailingSurfaces {
        async fn refresh(&self, _update: &SurfaceUpdate) -> anyhow::Result<()> {
            anyhow::bail!("widget host is gone")
        }
    }

    #[derive(Default)]
    struct RecordingSurfaces(Mutex<Vec<SurfaceUpdate>>);

    #[async_trait]
    impl ExternalSurfaces for RecordingSurfaces {
        async fn refresh(&self, update: &SurfaceUpdate) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(update.clone());
            Ok(())
        }
    }

    fn controller_with(
        provider: Arc<FakeProvider>,
        location: FixedLocation,
        surfaces: Arc<dyn ExternalSurfaces>,
    ) -> (TempDir, WeatherController) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PrefsStore::new(dir.path().join("prefs.json"));
        let controller = WeatherController::new(provider, Arc::new(location), surfaces, store);
        (dir, controller)
    }

    fn controller(provider: Arc<FakeProvider>) -> (TempDir, WeatherController) {
        controller_with(provider, FixedLocation(None), Arc::new(NoopSurfaces))
    }

    #[tokio::test]
    async fn success_publishes_weather_and_forecast_together() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider);

        controller.fetch_by_name("Hà Nội").await.unwrap();

        let state = controller.state();
        assert_eq!(state.phase, FetchPhase::Success);
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.weather.as_ref().map(|w| w.city.as_str()), Some("Ha Noi"));
        assert_eq!(state.forecast.as_ref().map(Vec::len), Some(1));
        assert_eq!(state.history, vec!["Ha Noi"]);
    }

    #[tokio::test]
    async fn success_persists_last_result() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider);

        controller.fetch_by_name("Hue").await.unwrap();

        let summary = controller.store().prefs().last_summary().expect("summary");
        assert_eq!(summary.city, "Hue");
        assert_eq!(summary.condition, "mây thưa");
    }

    #[tokio::test]
    async fn not_found_leaves_weather_and_forecast_unset() {
        let provider = FakeProvider::new(Outcome::NotFound, Outcome::Ok);
        let (_dir, controller) = controller(provider);

        let err = controller.fetch_by_name("Atlantis").await.unwrap_err();
        assert!(matches!(err, FetchError::Weather(WeatherError::NotFound)));

        let state = controller.state();
        assert_eq!(state.phase, FetchPhase::Failed);
        assert!(!state.loading);
        assert!(state.weather.is_none());
        assert!(state.forecast.is_none());
        assert!(state.error.as_deref().unwrap_or_default().contains("not found"));
        assert!(controller.store().load_history().is_empty());
    }

    #[tokio::test]
    async fn forecast_failure_discards_successful_current_conditions() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Http(500));
        let (_dir, controller) = controller(provider);

        controller.fetch_by_name("Hanoi").await.unwrap_err();

        let state = controller.state();
        assert!(state.weather.is_none());
        assert_eq!(state.error.as_deref(), Some("Weather service error: 500"));
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced_to_the_user() {
        let provider = FakeProvider::new(Outcome::Transport, Outcome::Ok);
        let (_dir, controller) = controller(provider);

        controller.fetch_by_name("Hanoi").await.unwrap_err();

        let state = controller.state();
        assert_eq!(state.phase, FetchPhase::Failed);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn new_cycle_clears_previous_result() {
        let ok = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(ok);
        controller.fetch_by_name("Hanoi").await.unwrap();

        let rx = controller.subscribe();
        {
            let _loading = controller.enter_loading();

            let state = rx.borrow().clone();
            assert_eq!(state.phase, FetchPhase::Loading);
            assert!(state.loading);
            assert!(state.weather.is_none());
            assert!(state.forecast.is_none());
        }
        assert!(!rx.borrow().loading);
    }

    #[tokio::test]
    async fn location_failure_sends_no_requests() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) =
            controller_with(provider.clone(), FixedLocation(None), Arc::new(NoopSurfaces));

        let err = controller.fetch_by_location().await.unwrap_err();

        assert!(matches!(err, FetchError::Location(LocationError::NoFix)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let state = controller.state();
        assert_eq!(state.phase, FetchPhase::Failed);
        assert!(!state.loading);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn location_failure_keeps_the_current_dashboard() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) =
            controller_with(provider.clone(), FixedLocation(None), Arc::new(NoopSurfaces));
        controller.fetch_by_name("Hanoi").await.unwrap();

        controller.fetch_by_location().await.unwrap_err();

        let state = controller.state();
        assert_eq!(state.phase, FetchPhase::Failed);
        assert!(!state.loading);
        assert!(state.error.is_some());
        assert_eq!(state.weather.as_ref().map(|w| w.city.as_str()), Some("Hanoi"));
        assert!(state.forecast.is_some());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enabling_auto_location_persists_and_fetches_by_coordinates() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let here = Coordinates { lat: 16.05, lon: 108.2 };
        let (_dir, controller) =
            controller_with(provider.clone(), FixedLocation(Some(here)), Arc::new(NoopSurfaces));

        controller.enable_auto_location().await.unwrap();

        assert!(controller.auto_location());
        let queries = provider.queries.lock().unwrap().clone();
        assert_eq!(queries, vec![LocationQuery::Coords(here)]);
    }

    #[tokio::test]
    async fn auto_location_stays_on_when_the_fix_is_missing() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider);

        controller.enable_auto_location().await.unwrap_err();

        assert!(controller.auto_location());
    }

    #[tokio::test]
    async fn location_fix_fetches_by_coordinates() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let here = Coordinates { lat: 10.82, lon: 106.63 };
        let (_dir, controller) =
            controller_with(provider.clone(), FixedLocation(Some(here)), Arc::new(NoopSurfaces));

        controller.fetch_by_location().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let queries = provider.queries.lock().unwrap().clone();
        assert_eq!(queries, vec![LocationQuery::Coords(here)]);
        assert_eq!(controller.state().history, vec!["Ho Chi Minh City"]);
    }

    #[tokio::test]
    async fn surface_failure_does_not_fail_the_fetch() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) =
            controller_with(provider, FixedLocation(None), Arc::new(FailingSurfaces));

        controller.fetch_by_name("Hanoi").await.unwrap();

        assert_eq!(controller.state().phase, FetchPhase::Success);
        assert_eq!(controller.store().last_city().as_deref(), Some("Hanoi"));
    }

    #[tokio::test]
    async fn surfaces_receive_city_temperature_and_description() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let surfaces = Arc::new(RecordingSurfaces::default());
        let (_dir, controller) = controller_with(provider, FixedLocation(None), surfaces.clone());

        controller.fetch_by_name("Hanoi").await.unwrap();

        let updates = surfaces.0.lock().unwrap().clone();
        assert_eq!(
            updates,
            vec![SurfaceUpdate { city: "Hanoi".into(), temperature: 31.2, condition: "mây thưa".into() }]
        );
    }

    #[tokio::test]
    async fn refresh_without_last_city_is_a_noop() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider.clone());

        controller.refresh().await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.state().phase, FetchPhase::Idle);
    }

    #[tokio::test]
    async fn refresh_refetches_last_city() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider.clone());
        controller.store().record_fetch("Da Lat", 18.0, "sương mù").unwrap();

        controller.refresh().await.unwrap();

        let queries = provider.queries.lock().unwrap().clone();
        assert_eq!(queries, vec![LocationQuery::City("Da Lat".into())]);
    }

    #[tokio::test]
    async fn start_prefers_location_when_auto_location_is_on() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let here = Coordinates { lat: 21.03, lon: 105.85 };
        let (_dir, controller) =
            controller_with(provider.clone(), FixedLocation(Some(here)), Arc::new(NoopSurfaces));
        controller.store().record_fetch("Hue", 25.0, "mưa").unwrap();
        controller.set_auto_location(true).unwrap();

        controller.start().await.unwrap();

        let queries = provider.queries.lock().unwrap().clone();
        assert_eq!(queries, vec![LocationQuery::Coords(here)]);
    }

    #[tokio::test]
    async fn search_turns_auto_location_off() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider);
        controller.set_auto_location(true).unwrap();

        controller.search("Hanoi").await.unwrap();

        assert!(!controller.auto_location());
    }

    #[tokio::test]
    async fn blank_search_sends_no_requests() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider.clone());

        controller.fetch_by_name("   ").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn history_edits_are_published() {
        let provider = FakeProvider::new(Outcome::Ok, Outcome::Ok);
        let (_dir, controller) = controller(provider);
        controller.fetch_by_name("Hanoi").await.unwrap();
        controller.fetch_by_name("Hue").await.unwrap();

        controller.remove_history("Hanoi").unwrap();
        assert_eq!(controller.state().history, vec!["Hue"]);

        controller.clear_history().unwrap();
        assert!(controller.state().history.is_empty());
        assert!(controller.load_history().is_empty());
    }
}
