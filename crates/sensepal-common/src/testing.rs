//! In-memory `PlacesProvider` for unit tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::discovery::DiscoveryQuery;
use crate::error::PlacesError;
use crate::model::{Coordinate, Place, Prediction, SearchResult};
use crate::places::{PlacesFuture, PlacesProvider};

pub fn place(id: &str, rating: Option<f64>) -> Place {
    Place {
        id: id.to_string(),
        name: format!("Place {id}"),
        location: Coordinate::new(37.77, -122.42),
        types: vec!["point_of_interest".to_string()],
        rating,
        vicinity: Some(format!("{id} Main St")),
        open_now: None,
        website: None,
    }
}

pub fn prediction(place_id: &str, description: &str) -> Prediction {
    Prediction {
        place_id: place_id.to_string(),
        description: description.to_string(),
        main_text: description.to_string(),
        secondary_text: String::new(),
    }
}

pub fn search_result(id: &str, lat: f64, lng: f64) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        name: format!("Result {id}"),
        location: Coordinate::new(lat, lng),
        formatted_address: format!("{id} Ave"),
    }
}

/// Nearby searches are answered by keyword; an unknown keyword fails.
/// Autocomplete and find-place answer from their maps and record every call.
#[derive(Default)]
pub struct FakeProvider {
    nearby: HashMap<String, Result<Vec<Place>, String>>,
    nearby_delays: HashMap<String, Duration>,
    nearby_calls: AtomicUsize,
    predictions: HashMap<String, Vec<Prediction>>,
    autocomplete_delay: Option<Duration>,
    autocomplete_calls: Mutex<Vec<String>>,
    results: HashMap<String, Vec<SearchResult>>,
    find_delay: Option<Duration>,
    find_calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn with_nearby(mut self, keyword: &str, outcome: Result<Vec<Place>, PlacesError>) -> Self {
        self.nearby
            .insert(keyword.to_string(), outcome.map_err(|e| e.to_string()));
        self
    }

    pub fn with_nearby_delay(mut self, keyword: &str, delay: Duration) -> Self {
        self.nearby_delays.insert(keyword.to_string(), delay);
        self
    }

    pub fn with_predictions(mut self, input: &str, predictions: Vec<Prediction>) -> Self {
        self.predictions.insert(input.to_string(), predictions);
        self
    }

    pub fn with_autocomplete_delay(mut self, delay: Duration) -> Self {
        self.autocomplete_delay = Some(delay);
        self
    }

    pub fn with_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn with_find_delay(mut self, delay: Duration) -> Self {
        self.find_delay = Some(delay);
        self
    }

    pub fn nearby_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
    }

    pub fn autocomplete_calls(&self) -> Vec<String> {
        self.autocomplete_calls.lock().unwrap().clone()
    }

    pub fn find_calls(&self) -> Vec<String> {
        self.find_calls.lock().unwrap().clone()
    }
}

impl PlacesProvider for FakeProvider {
    fn nearby_search<'a>(
        &'a self,
        _center: Coordinate,
        query: &'a DiscoveryQuery,
    ) -> PlacesFuture<'a, Vec<Place>> {
        Box::pin(async move {
            self.nearby_calls.fetch_add(1, Ordering::SeqCst);
            let keyword = query.keyword.clone().unwrap_or_default();
            if let Some(delay) = self.nearby_delays.get(&keyword) {
                tokio::time::sleep(*delay).await;
            }
            match self.nearby.get(&keyword) {
                Some(Ok(places)) => Ok(places.clone()),
                Some(Err(message)) => Err(PlacesError::Status {
                    status: "UNKNOWN_ERROR".to_string(),
                    message: message.clone(),
                }),
                None => Err(PlacesError::Status {
                    status: "INVALID_REQUEST".to_string(),
                    message: format!("no canned response for {keyword:?}"),
                }),
            }
        })
    }

    fn autocomplete<'a>(&'a self, input: &'a str) -> PlacesFuture<'a, Vec<Prediction>> {
        Box::pin(async move {
            self.autocomplete_calls.lock().unwrap().push(input.to_string());
            if let Some(delay) = self.autocomplete_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.predictions.get(input).cloned().unwrap_or_default())
        })
    }

    fn find_place<'a>(&'a self, query: &'a str) -> PlacesFuture<'a, Vec<SearchResult>> {
        Box::pin(async move {
            self.find_calls.lock().unwrap().push(query.to_string());
            if let Some(delay) = self.find_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        })
    }
}
