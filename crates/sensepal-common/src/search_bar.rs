/// Search-as-you-type with a quiet period.
///
/// Every keystroke cancels whatever lookup is still scheduled (or already
/// running) and schedules a new one once input has been quiet for the debounce
/// interval. An empty input clears the suggestions on the spot. State changes
/// are published on a `watch` channel so a UI can re-render from snapshots.
use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PlacesError;
use crate::map::Camera;
use crate::model::{Prediction, SearchResult};
use crate::places::PlacesProvider;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which provider call backs the suggestions list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionMode {
    /// Autocomplete predictions; picking one needs a follow-up lookup.
    #[default]
    Autocomplete,
    /// Free-text lookup; suggestions are already resolved places.
    Geocode,
}

/// A picked search result and where the map should move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Selection {
    pub result: SearchResult,
    pub camera: Camera,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchState {
    pub query: String,
    pub predictions: Vec<Prediction>,
    pub results: Vec<SearchResult>,
    /// A picked prediction is being resolved.
    pub loading: bool,
    pub selection: Option<Selection>,
}

pub struct SearchBar<P: ?Sized> {
    provider: Arc<P>,
    mode: SuggestionMode,
    quiet_period: Duration,
    state: Arc<watch::Sender<SearchState>>,
    pending: Option<JoinHandle<()>>,
}

impl<P: PlacesProvider + ?Sized> SearchBar<P> {
    pub fn new(provider: Arc<P>, mode: SuggestionMode, quiet_period: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            provider,
            mode,
            quiet_period,
            state: Arc::new(state),
            pending: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Handle the input field's new value.
    pub fn input(&mut self, text: &str) {
        self.cancel_pending();

        let query = text.to_string();
        if query.trim().is_empty() {
            self.state.send_modify(|s| {
                s.query = query;
                s.predictions.clear();
                s.results.clear();
                s.loading = false;
                s.selection = None;
            });
            return;
        }

        // Typing supersedes any earlier pick or lookup in progress.
        self.state.send_modify(|s| {
            s.query = query.clone();
            s.loading = false;
            s.selection = None;
        });

        let provider = Arc::clone(&self.provider);
        let state = Arc::clone(&self.state);
        let mode = self.mode;
        let quiet_period = self.quiet_period;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            debug!(query = %query, ?mode, "debounced search firing");
            match mode {
                SuggestionMode::Autocomplete => match provider.autocomplete(&query).await {
                    Ok(predictions) => state.send_if_modified(|s| {
                        let current = s.query == query;
                        if current {
                            s.predictions = predictions;
                        }
                        current
                    }),
                    Err(e) => {
                        warn!(error = %e, query = %query, "autocomplete failed");
                        false
                    }
                },
                SuggestionMode::Geocode => match provider.find_place(&query).await {
                    Ok(results) => state.send_if_modified(|s| {
                        let current = s.query == query;
                        if current {
                            s.results = results;
                        }
                        current
                    }),
                    Err(e) => {
                        warn!(error = %e, query = %query, "place lookup failed");
                        false
                    }
                },
            };
        }));
    }

    /// Resolve a picked prediction and select the best match.
    ///
    /// Returns `Ok(None)` when the lookup finds nothing; the input is left as is.
    pub async fn select_prediction(
        &mut self,
        prediction: &Prediction,
    ) -> Result<Option<Selection>, PlacesError> {
        if prediction.description.is_empty() {
            return Ok(None);
        }
        self.cancel_pending();
        resolve(self.provider.as_ref(), &self.state, &prediction.description).await
    }

    /// Start resolving a picked prediction and return at once.
    ///
    /// `loading` is published before the lookup starts. The outcome lands on the
    /// watch channel; a later keystroke or pick cancels the lookup.
    pub fn begin_select(&mut self, prediction: &Prediction) {
        if prediction.description.is_empty() {
            return;
        }
        self.cancel_pending();
        self.state.send_modify(|s| s.loading = true);

        let provider = Arc::clone(&self.provider);
        let state = Arc::clone(&self.state);
        let description = prediction.description.clone();
        self.pending = Some(tokio::spawn(async move {
            match resolve(provider.as_ref(), &state, &description).await {
                Ok(Some(selection)) => {
                    info!(place_id = %selection.result.id, "search result selected")
                }
                Ok(None) => info!(description = %description, "no place matched selection"),
                Err(e) => warn!(error = %e, description = %description, "place lookup failed"),
            }
        }));
    }

    /// Select a resolved result: recenter on it and clear the input.
    pub fn select_result(&mut self, result: SearchResult) -> Selection {
        self.cancel_pending();
        publish_selection(&self.state, result)
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

async fn resolve<P: PlacesProvider + ?Sized>(
    provider: &P,
    state: &watch::Sender<SearchState>,
    description: &str,
) -> Result<Option<Selection>, PlacesError> {
    state.send_modify(|s| s.loading = true);
    let outcome = provider.find_place(description).await;
    state.send_modify(|s| s.loading = false);

    let Some(result) = outcome?.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(publish_selection(state, result)))
}

fn publish_selection(state: &watch::Sender<SearchState>, result: SearchResult) -> Selection {
    let selection = Selection {
        camera: Camera::focus(result.location),
        result,
    };
    state.send_modify(|s| {
        s.query.clear();
        s.predictions.clear();
        s.results.clear();
        s.loading = false;
        s.selection = Some(selection.clone());
    });
    selection
}

impl<P: ?Sized> Drop for SearchBar<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::SELECTED_ZOOM;
    use crate::model::Coordinate;
    use crate::testing::{prediction, search_result, FakeProvider};

    async fn pause(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn bar(provider: FakeProvider) -> (Arc<FakeProvider>, SearchBar<FakeProvider>) {
        let provider = Arc::new(provider);
        let bar = SearchBar::new(
            Arc::clone(&provider),
            SuggestionMode::Autocomplete,
            DEFAULT_DEBOUNCE,
        );
        (provider, bar)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_keystrokes_fire_one_query() {
        let (provider, mut bar) = bar(
            FakeProvider::default().with_predictions("abc", vec![prediction("p1", "abc museum")]),
        );

        bar.input("a");
        pause(100).await;
        bar.input("ab");
        pause(100).await;
        bar.input("abc");
        pause(400).await;

        assert_eq!(provider.autocomplete_calls(), vec!["abc"]);
        let state = bar.state();
        assert_eq!(state.query, "abc");
        assert_eq!(state.predictions, vec![prediction("p1", "abc museum")]);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_before_quiet_period() {
        let (provider, mut bar) = bar(FakeProvider::default());
        bar.input("quiet");
        pause(299).await;
        assert!(provider.autocomplete_calls().is_empty());
        pause(2).await;
        assert_eq!(provider.autocomplete_calls(), vec!["quiet"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_clears_immediately() {
        let (provider, mut bar) = bar(
            FakeProvider::default().with_predictions("park", vec![prediction("p", "park")]),
        );
        bar.input("park");
        pause(400).await;
        assert_eq!(bar.state().predictions.len(), 1);

        bar.input("");
        assert!(bar.state().predictions.is_empty());
        pause(1_000).await;
        assert_eq!(provider.autocomplete_calls(), vec!["park"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_cancels_scheduled_query() {
        let (provider, mut bar) = bar(FakeProvider::default());
        bar.input("li");
        pause(50).await;
        bar.input("   ");
        pause(1_000).await;
        assert!(provider.autocomplete_calls().is_empty());
        assert!(bar.state().predictions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_cancels_in_flight_lookup() {
        let (provider, mut bar) = bar(
            FakeProvider::default()
                .with_autocomplete_delay(Duration::from_secs(1))
                .with_predictions("a", vec![prediction("stale", "a")])
                .with_predictions("ab", vec![prediction("fresh", "ab")]),
        );
        bar.input("a");
        pause(400).await;
        bar.input("ab");
        pause(2_000).await;

        assert_eq!(provider.autocomplete_calls(), vec!["a", "ab"]);
        assert_eq!(bar.state().predictions, vec![prediction("fresh", "ab")]);
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_prediction_recenters_and_clears() {
        let (provider, mut bar) = bar(
            FakeProvider::default()
                .with_predictions("aqua", vec![prediction("p1", "Aquarium of the Bay")])
                .with_results("Aquarium of the Bay", vec![search_result("r1", 37.8087, -122.4098)]),
        );
        let mut updates = bar.subscribe();

        bar.input("aqua");
        pause(400).await;
        let picked = bar.state().predictions[0].clone();

        let selection = bar
            .select_prediction(&picked)
            .await
            .unwrap()
            .expect("a match");
        assert_eq!(selection.camera.center, Coordinate::new(37.8087, -122.4098));
        assert_eq!(selection.camera.zoom, SELECTED_ZOOM);
        assert_eq!(provider.find_calls(), vec!["Aquarium of the Bay"]);

        assert!(updates.has_changed().unwrap());
        let state = updates.borrow_and_update().clone();
        assert_eq!(state.query, "");
        assert!(state.predictions.is_empty());
        assert!(!state.loading);
        assert_eq!(state.selection, Some(selection));
    }

    #[tokio::test(start_paused = true)]
    async fn selection_without_match_keeps_input() {
        let (_, mut bar) = bar(FakeProvider::default());
        bar.input("nowhere");
        let selection = bar
            .select_prediction(&prediction("x", "nowhere"))
            .await
            .unwrap();
        assert!(selection.is_none());
        let state = bar.state();
        assert_eq!(state.query, "nowhere");
        assert!(state.selection.is_none());
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn geocode_mode_stores_results() {
        let provider = Arc::new(
            FakeProvider::default().with_results("library", vec![search_result("lib", 1.0, 2.0)]),
        );
        let mut bar = SearchBar::new(
            Arc::clone(&provider),
            SuggestionMode::Geocode,
            DEFAULT_DEBOUNCE,
        );
        bar.input("library");
        pause(400).await;

        assert!(provider.autocomplete_calls().is_empty());
        assert_eq!(bar.state().results, vec![search_result("lib", 1.0, 2.0)]);

        let selection = bar.select_result(bar.state().results[0].clone());
        assert_eq!(selection.camera.center, Coordinate::new(1.0, 2.0));
        assert!(bar.state().results.is_empty());
        assert_eq!(bar.state().query, "");
    }

    #[tokio::test(start_paused = true)]
    async fn typing_after_selection_drops_it() {
        let (_, mut bar) = bar(FakeProvider::default());
        bar.select_result(search_result("r1", 1.0, 2.0));
        assert!(bar.state().selection.is_some());

        bar.input("l");
        let state = bar.state();
        assert_eq!(state.query, "l");
        assert!(state.selection.is_none());

        bar.select_result(search_result("r2", 3.0, 4.0));
        bar.input("");
        assert!(bar.state().selection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn background_select_publishes_loading_first() {
        let (provider, mut bar) = bar(
            FakeProvider::default()
                .with_find_delay(Duration::from_secs(1))
                .with_results("Main Library", vec![search_result("lib", 37.779, -122.416)]),
        );
        let mut updates = bar.subscribe();

        bar.begin_select(&prediction("p1", "Main Library"));
        assert!(updates.has_changed().unwrap());
        let state = updates.borrow_and_update().clone();
        assert!(state.loading);
        assert!(state.selection.is_none());

        pause(1_500).await;
        let state = bar.state();
        assert!(!state.loading);
        assert_eq!(state.selection.map(|s| s.result.id), Some("lib".to_string()));
        assert_eq!(provider.find_calls(), vec!["Main Library"]);
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_cancels_background_select() {
        let (_, mut bar) = bar(
            FakeProvider::default()
                .with_find_delay(Duration::from_secs(1))
                .with_results("Main Library", vec![search_result("lib", 37.779, -122.416)]),
        );
        bar.begin_select(&prediction("p1", "Main Library"));
        pause(100).await;
        bar.input("m");
        assert!(!bar.state().loading);

        pause(2_000).await;
        let state = bar.state();
        assert!(state.selection.is_none());
        assert_eq!(state.query, "m");
    }
}
