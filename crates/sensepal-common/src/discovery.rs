/// Sensory-friendly place discovery.
///
/// Fans out several nearby searches around a center point, waits for all of them,
/// and folds the results into one list: unique by place id, best rated first.
/// A sub-search that fails or times out contributes nothing; discovery itself
/// never fails.
use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PlacesError;
use crate::model::{Coordinate, Place};
use crate::places::PlacesProvider;

pub const DEFAULT_RADIUS_M: u32 = 5000;

const SENSORY_KEYWORDS: &str = "sensory friendly OR quiet space OR autism friendly";
const CALM_KEYWORDS: &str = "quiet OR peaceful OR calm";
const CALM_PLACE_TYPES: [&str; 5] = ["library", "museum", "park", "aquarium", "art_gallery"];
const SUPPORT_KEYWORDS: &str =
    "occupational therapy OR community center OR sensory gym OR children therapy";

/// One nearby-search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DiscoveryQuery {
    pub keyword: Option<String>,
    pub place_types: Vec<String>,
    pub radius_m: u32,
}

impl DiscoveryQuery {
    pub fn keyword(keyword: &str, radius_m: u32) -> Self {
        Self {
            keyword: Some(keyword.to_string()),
            place_types: Vec::new(),
            radius_m,
        }
    }
}

/// The three standard sub-searches: sensory keywords, calm venues by type,
/// and therapy/community centers.
pub fn default_queries(radius_m: u32) -> Vec<DiscoveryQuery> {
    vec![
        DiscoveryQuery::keyword(SENSORY_KEYWORDS, radius_m),
        DiscoveryQuery {
            keyword: Some(CALM_KEYWORDS.to_string()),
            place_types: CALM_PLACE_TYPES.iter().map(|t| t.to_string()).collect(),
            radius_m,
        },
        DiscoveryQuery::keyword(SUPPORT_KEYWORDS, radius_m),
    ]
}

pub struct Discovery<P> {
    provider: P,
    queries: Vec<DiscoveryQuery>,
    sub_search_timeout: Option<Duration>,
}

impl<P: PlacesProvider> Discovery<P> {
    pub fn new(provider: P, radius_m: u32) -> Self {
        Self {
            provider,
            queries: default_queries(radius_m),
            sub_search_timeout: None,
        }
    }

    pub fn with_queries(mut self, queries: Vec<DiscoveryQuery>) -> Self {
        self.queries = queries;
        self
    }

    /// Bound every sub-search; one that runs over contributes zero results.
    pub fn with_sub_search_timeout(mut self, timeout: Duration) -> Self {
        self.sub_search_timeout = Some(timeout);
        self
    }

    pub fn queries(&self) -> &[DiscoveryQuery] {
        &self.queries
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run every sub-search concurrently around `center` and merge the results.
    pub async fn discover(&self, center: Coordinate) -> Vec<Place> {
        let branches = self
            .queries
            .iter()
            .enumerate()
            .map(|(index, query)| self.sub_search(index, center, query));
        let lists = join_all(branches).await;

        let mut places = merge_unique(lists);
        sort_by_rating(&mut places);
        info!(
            lat = center.lat,
            lng = center.lng,
            count = places.len(),
            "discovered places"
        );
        places
    }

    async fn sub_search(&self, index: usize, center: Coordinate, query: &DiscoveryQuery) -> Vec<Place> {
        let search = self.provider.nearby_search(center, query);
        let result = match self.sub_search_timeout {
            Some(limit) => tokio::time::timeout(limit, search)
                .await
                .unwrap_or(Err(PlacesError::Timeout)),
            None => search.await,
        };
        match result {
            Ok(places) => places,
            Err(e) => {
                warn!(index, error = %e, keyword = ?query.keyword, "sub-search failed, treating as empty");
                Vec::new()
            }
        }
    }
}

/// Flatten result lists keeping one entry per place id.
///
/// A repeated id keeps the position of its first occurrence and the data of its
/// last one.
pub fn merge_unique(lists: Vec<Vec<Place>>) -> Vec<Place> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Place> = Vec::new();
    for place in lists.into_iter().flatten() {
        match positions.get(&place.id) {
            Some(&pos) => merged[pos] = place,
            None => {
                positions.insert(place.id.clone(), merged.len());
                merged.push(place);
            }
        }
    }
    merged
}

/// Highest rating first; unrated places after every rated one.
pub fn sort_by_rating(places: &mut [Place]) {
    places.sort_by(|a, b| match (a.sortable_rating(), b.sortable_rating()) {
        (Some(ra), Some(rb)) => rb.total_cmp(&ra),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::{place, FakeProvider};

    fn ids(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.id.as_str()).collect()
    }

    fn assert_invariants(places: &[Place]) {
        let unique: HashSet<&str> = places.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(unique.len(), places.len(), "duplicate ids in {:?}", ids(places));

        let first_unrated = places
            .iter()
            .position(|p| p.sortable_rating().is_none())
            .unwrap_or(places.len());
        assert!(
            places[first_unrated..].iter().all(|p| p.sortable_rating().is_none()),
            "rated place after an unrated one"
        );
        for pair in places[..first_unrated].windows(2) {
            assert!(pair[0].rating >= pair[1].rating, "ratings not descending");
        }
    }

    #[test]
    fn default_queries_cover_three_searches() {
        let queries = default_queries(DEFAULT_RADIUS_M);
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|q| q.radius_m == 5000));
        assert_eq!(queries[0].keyword.as_deref(), Some(SENSORY_KEYWORDS));
        assert_eq!(
            queries[1].place_types,
            vec!["library", "museum", "park", "aquarium", "art_gallery"]
        );
        assert!(queries[2].keyword.as_deref().unwrap().contains("sensory gym"));
    }

    #[test]
    fn merge_keeps_one_entry_per_id() {
        let merged = merge_unique(vec![
            vec![place("a", Some(4.0)), place("b", None)],
            vec![place("b", Some(3.0)), place("c", Some(5.0))],
            vec![place("a", Some(4.5))],
        ]);
        assert_eq!(ids(&merged), vec!["a", "b", "c"]);
        // last occurrence wins the data
        assert_eq!(merged[0].rating, Some(4.5));
        assert_eq!(merged[1].rating, Some(3.0));
    }

    #[test]
    fn merge_of_empty_lists_is_empty() {
        assert!(merge_unique(vec![vec![], vec![], vec![]]).is_empty());
    }

    #[test]
    fn sort_puts_unrated_last() {
        let mut places = vec![
            place("none1", None),
            place("low", Some(2.0)),
            place("nan", Some(f64::NAN)),
            place("high", Some(4.8)),
            place("none2", None),
            place("mid", Some(3.9)),
        ];
        sort_by_rating(&mut places);
        assert_eq!(&ids(&places)[..3], &["high", "mid", "low"]);
        assert_invariants(&places);
    }

    #[tokio::test]
    async fn discover_merges_and_sorts_all_sub_searches() {
        let provider = FakeProvider::default()
            .with_nearby(SENSORY_KEYWORDS, Ok(vec![place("a", Some(3.0)), place("b", None)]))
            .with_nearby(CALM_KEYWORDS, Ok(vec![place("c", Some(4.9)), place("a", Some(3.0))]))
            .with_nearby(SUPPORT_KEYWORDS, Ok(vec![place("d", Some(4.1))]));
        let discovery = Discovery::new(provider, DEFAULT_RADIUS_M);

        let places = discovery.discover(Coordinate::new(37.0, -122.0)).await;
        assert_eq!(ids(&places), vec!["c", "d", "a", "b"]);
        assert_invariants(&places);
        assert_eq!(discovery.provider().nearby_calls(), 3);
    }

    #[tokio::test]
    async fn failed_sub_search_contributes_nothing() {
        let provider = FakeProvider::default()
            .with_nearby(
                SENSORY_KEYWORDS,
                Err(PlacesError::Status {
                    status: "OVER_QUERY_LIMIT".to_string(),
                    message: String::new(),
                }),
            )
            .with_nearby(CALM_KEYWORDS, Ok(vec![place("c", Some(4.0))]))
            .with_nearby(SUPPORT_KEYWORDS, Err(PlacesError::MissingApiKey));
        let discovery = Discovery::new(provider, DEFAULT_RADIUS_M);

        let places = discovery.discover(Coordinate::new(0.0, 0.0)).await;
        assert_eq!(ids(&places), vec!["c"]);
    }

    #[tokio::test]
    async fn all_sub_searches_failing_yields_empty_list() {
        let discovery = Discovery::new(FakeProvider::default(), DEFAULT_RADIUS_M);
        assert!(discovery.discover(Coordinate::new(0.0, 0.0)).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sub_search_times_out_without_blocking_others() {
        let provider = FakeProvider::default()
            .with_nearby(SENSORY_KEYWORDS, Ok(vec![place("slow", Some(5.0))]))
            .with_nearby(CALM_KEYWORDS, Ok(vec![place("fast", Some(1.0))]))
            .with_nearby_delay(SENSORY_KEYWORDS, Duration::from_secs(30));
        let discovery = Discovery::new(provider, DEFAULT_RADIUS_M)
            .with_sub_search_timeout(Duration::from_secs(5));

        let places = discovery.discover(Coordinate::new(0.0, 0.0)).await;
        assert_eq!(ids(&places), vec!["fast"]);
    }
}
