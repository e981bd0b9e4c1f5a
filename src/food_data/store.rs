//! Memoized, retryable loading of the food reference data.
//!
//! A [`FoodStore`] owns one dataset. The first `load` starts a fetch; callers
//! arriving while it is in flight await the same shared future instead of
//! starting another one. The pending handle is dropped as soon as the fetch
//! completes, so after a failure the next call fetches again.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{info, warn};

use super::data_loader::{load_food_data_csv, load_food_data_json, parse_food_data_json};
use super::index::FoodData;
use super::record::{NutrientVector, Portion, DEFAULT_CATEGORY};
use crate::error::StoreError;

/// Produces a freshly parsed dataset. Implemented by [`FoodDataSource`]; tests
/// and embedders can supply their own.
pub trait FoodDataFetcher: Send + Sync + 'static {
    /// Human-readable origin used in errors and logs.
    fn origin(&self) -> String;

    fn fetch(&self) -> BoxFuture<'static, Result<FoodData, StoreError>>;
}

/// Where the reference data lives.
#[derive(Debug, Clone, PartialEq)]
pub enum FoodDataSource {
    JsonFile(PathBuf),
    CsvFile {
        foods: PathBuf,
        nutrients: Option<PathBuf>,
    },
    /// JSON served over HTTP(S).
    Url(String),
}

impl FoodDataSource {
    /// Picks the source kind from the location: URLs by scheme, CSV by
    /// extension, JSON otherwise.
    pub fn from_location(location: &str, nutrients_csv: Option<PathBuf>) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            return FoodDataSource::Url(location.to_string());
        }
        let path = PathBuf::from(location);
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv || nutrients_csv.is_some() {
            FoodDataSource::CsvFile {
                foods: path,
                nutrients: nutrients_csv,
            }
        } else {
            FoodDataSource::JsonFile(path)
        }
    }
}

async fn fetch_url(url: &str) -> anyhow::Result<FoodData> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("Could not fetch {}, received {}", url, status));
    }
    let text = response.text().await?;
    parse_food_data_json(&text)
}

impl FoodDataFetcher for FoodDataSource {
    fn origin(&self) -> String {
        match self {
            FoodDataSource::JsonFile(path) => path.display().to_string(),
            FoodDataSource::CsvFile { foods, .. } => foods.display().to_string(),
            FoodDataSource::Url(url) => url.clone(),
        }
    }

    fn fetch(&self) -> BoxFuture<'static, Result<FoodData, StoreError>> {
        let source = self.clone();
        let origin = self.origin();
        async move {
            let result = match &source {
                FoodDataSource::JsonFile(path) => load_food_data_json(path).await,
                FoodDataSource::CsvFile { foods, nutrients } => {
                    load_food_data_csv(foods, nutrients.as_deref()).await
                }
                FoodDataSource::Url(url) => fetch_url(url).await,
            };
            result.map_err(|e| StoreError::unavailable(origin, format!("{:#}", e)))
        }
        .boxed()
    }
}

type LoadResult = Result<Arc<FoodData>, StoreError>;
type PendingLoad = Shared<BoxFuture<'static, LoadResult>>;

struct StoreState {
    data: RwLock<Option<Arc<FoodData>>>,
    pending: Mutex<Option<PendingLoad>>,
}

impl StoreState {
    fn snapshot(&self) -> Option<Arc<FoodData>> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Food reference store with an explicit load contract.
pub struct FoodStore {
    fetcher: Arc<dyn FoodDataFetcher>,
    load_timeout: Option<Duration>,
    state: Arc<StoreState>,
}

impl FoodStore {
    pub fn new(fetcher: impl FoodDataFetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            load_timeout: None,
            state: Arc::new(StoreState {
                data: RwLock::new(None),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Store that is already loaded with `data`.
    pub fn preloaded(fetcher: impl FoodDataFetcher, data: FoodData) -> Self {
        let store = Self::new(fetcher);
        *store.state.data.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(data));
        store
    }

    /// Bounds every fetch; a timed-out fetch fails with `DataUnavailable`.
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.state.snapshot().is_some()
    }

    /// The loaded dataset, if any.
    pub fn snapshot(&self) -> Option<Arc<FoodData>> {
        self.state.snapshot()
    }

    /// Loads the dataset once. Concurrent callers share the in-flight fetch;
    /// a failure leaves the store unloaded so a later call can retry.
    pub async fn load(&self) -> Result<Arc<FoodData>, StoreError> {
        if let Some(data) = self.state.snapshot() {
            return Ok(data);
        }

        let pending = {
            let mut slot = self
                .state
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // A load may have finished between the check above and the lock.
            if let Some(data) = self.state.snapshot() {
                return Ok(data);
            }
            slot.get_or_insert_with(|| self.start_load()).clone()
        };

        pending.await
    }

    /// Awaits the in-flight or completed load; no-op when already loaded.
    pub async fn ensure_loaded(&self) -> Result<(), StoreError> {
        self.load().await.map(|_| ())
    }

    fn start_load(&self) -> PendingLoad {
        let fetch = self.fetcher.fetch();
        let origin = self.fetcher.origin();
        let timeout = self.load_timeout;
        let state = Arc::clone(&self.state);

        info!(origin = %origin, "loading food data");
        async move {
            let fetched = match timeout {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::unavailable(
                        origin.clone(),
                        format!("timed out after {:?}", limit),
                    )),
                },
                None => fetch.await,
            };

            let result = fetched.map(Arc::new);
            {
                let mut slot = state.pending.lock().unwrap_or_else(PoisonError::into_inner);
                match &result {
                    Ok(data) => {
                        info!(origin = %origin, foods = data.len(), "food data loaded");
                        *state.data.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(data));
                    }
                    Err(e) => warn!(origin = %origin, error = %e, "food data load failed"),
                }
                *slot = None;
            }
            result
        }
        .boxed()
        .shared()
    }

    pub fn get_category(&self, name: &str) -> String {
        self.snapshot()
            .map(|d| d.category(name).to_string())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }

    pub fn get_nutrients(&self, name: &str) -> Option<NutrientVector> {
        self.snapshot().and_then(|d| d.nutrients(name).cloned())
    }

    pub fn get_portion(&self, name: &str) -> Option<Portion> {
        self.snapshot().and_then(|d| d.portion(name).cloned())
    }

    pub fn find_matches(&self, partial: &str, limit: usize) -> Vec<String> {
        self.snapshot()
            .map(|d| {
                d.find_matches(partial, limit)
                    .into_iter()
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food_data::record::{FoodRecord, NutrientAmount};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts fetches; fails the first `failures` of them.
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
        failures: usize,
        delay: Duration,
    }

    impl CountingFetcher {
        fn new(failures: usize, delay: Duration) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    failures,
                    delay,
                },
                calls,
            )
        }
    }

    impl FoodDataFetcher for CountingFetcher {
        fn origin(&self) -> String {
            "memory".to_string()
        }

        fn fetch(&self) -> BoxFuture<'static, Result<FoodData, StoreError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = call < self.failures;
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                if fail {
                    return Err(StoreError::unavailable("memory", "boom"));
                }
                Ok([FoodRecord::new("Salt", Some("Spices".into())).with_nutrient(
                    "Sodium",
                    NutrientAmount {
                        amount: 38758.0,
                        unit_name: "mg".into(),
                        category: "Minerals".into(),
                        drv: Some(2300.0),
                    },
                )]
                .into_iter()
                .collect())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let (fetcher, calls) = CountingFetcher::new(0, Duration::from_millis(20));
        let store = FoodStore::new(fetcher);

        let (a, b, c) = tokio::join!(store.load(), store.ensure_loaded(), store.load());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.ensure_loaded().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_shared_then_retryable() {
        let (fetcher, calls) = CountingFetcher::new(1, Duration::from_millis(10));
        let store = FoodStore::new(fetcher);

        let (a, b) = tokio::join!(store.load(), store.load());
        assert!(matches!(a, Err(StoreError::DataUnavailable { .. })));
        assert_eq!(a.unwrap_err(), b.unwrap_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!store.is_loaded());

        let data = store.load().await.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_timeout_reports_unavailable() {
        let (fetcher, _) = CountingFetcher::new(0, Duration::from_millis(200));
        let store = FoodStore::new(fetcher).with_load_timeout(Some(Duration::from_millis(10)));

        let err = store.load().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(!store.is_loaded());
    }

    #[tokio::test]
    async fn test_accessors_before_and_after_load() {
        let (fetcher, _) = CountingFetcher::new(0, Duration::ZERO);
        let store = FoodStore::new(fetcher);

        assert_eq!(store.get_category("salt"), "Other");
        assert!(store.get_nutrients("salt").is_none());
        assert!(store.find_matches("sa", 10).is_empty());

        store.ensure_loaded().await.unwrap();
        assert_eq!(store.get_category("SALT"), "Spices");
        assert_eq!(store.get_nutrients("salt").unwrap().amount("Sodium"), Some(38758.0));
        assert!(store.get_portion("salt").is_none());
        assert_eq!(store.find_matches("SA", 10), vec!["Salt".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_file_is_data_unavailable() {
        let store = FoodStore::new(FoodDataSource::JsonFile("no_such_fooddata.json".into()));
        let err = store.load().await.unwrap_err();
        let StoreError::DataUnavailable { origin, reason } = err;
        assert_eq!(origin, "no_such_fooddata.json");
        assert!(reason.contains("Failed to read food data JSON"));
    }

    #[test]
    fn test_source_from_location() {
        assert_eq!(
            FoodDataSource::from_location("https://example.org/fooddata.json", None),
            FoodDataSource::Url("https://example.org/fooddata.json".into())
        );
        assert_eq!(
            FoodDataSource::from_location("data/fooddata.CSV", None),
            FoodDataSource::CsvFile {
                foods: "data/fooddata.CSV".into(),
                nutrients: None
            }
        );
        assert_eq!(
            FoodDataSource::from_location("data/fooddata.json", None),
            FoodDataSource::JsonFile("data/fooddata.json".into())
        );
    }
}
