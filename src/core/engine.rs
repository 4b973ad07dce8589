use crate::core::estimator::SpendingEstimator;
use crate::core::normalizer;
use crate::core::remote;
use crate::core::resolver;
use crate::core::review_cache::ReviewCache;
use crate::core::window;
use crate::domain::model::{
    AggregationRequest, AggregationResult, PlaceSummary, RequestRoute, ResultSource, Review,
};
use crate::domain::ports::{ExpenseApi, PlacesApi, Storage};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

struct Collected {
    source: ResultSource,
    reviews: Vec<Review>,
    spending_estimate: Option<String>,
    place: Option<PlaceSummary>,
}

/// 評論彙整引擎：依請求選擇資料來源、篩選時間範圍並估算消費。
///
/// 任何階段失敗都轉成降級結果，不會把錯誤拋給呈現層。同一個地點的
/// 新請求不會取消舊請求，過期結果由呼叫端自行捨棄。
pub struct ReviewEngine<S: Storage, P: PlacesApi, X: ExpenseApi> {
    cache: Mutex<ReviewCache<S>>,
    places: P,
    expenses: Option<X>,
    estimator: SpendingEstimator,
}

impl<S: Storage, P: PlacesApi, X: ExpenseApi> ReviewEngine<S, P, X> {
    pub fn new(storage: S, places: P, expenses: Option<X>, estimator: SpendingEstimator) -> Self {
        Self {
            cache: Mutex::new(ReviewCache::new(storage)),
            places,
            expenses,
            estimator,
        }
    }

    pub async fn aggregate(&self, request: &AggregationRequest) -> AggregationResult {
        self.aggregate_at(request, Utc::now()).await
    }

    pub async fn aggregate_at(
        &self,
        request: &AggregationRequest,
        now: DateTime<Utc>,
    ) -> AggregationResult {
        match self.run(request, now).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Aggregation degraded ({:?}): {}",
                    e.category(),
                    e
                );
                AggregationResult::degraded(&e)
            }
        }
    }

    /// 只依地點 ID 取得評論並套用時間範圍
    pub async fn fetch_by_place_id(&self, place_id: &str, window_days: u32) -> AggregationResult {
        let request = AggregationRequest::for_place(place_id).with_window_days(window_days);
        self.aggregate(&request).await
    }

    async fn run(
        &self,
        request: &AggregationRequest,
        now: DateTime<Utc>,
    ) -> Result<AggregationResult> {
        request.validate()?;

        let collected = match request.route() {
            Some(RequestRoute::PlaceId(place_id)) => {
                self.collect_remote(place_id, request, ResultSource::Remote)
                    .await?
            }
            Some(RequestRoute::Name(name)) => {
                let place_id = resolver::resolve_by_name(&self.places, name)
                    .await
                    .ok_or_else(|| EngineError::not_found(format!("找不到餐廳「{}」", name)))?;
                self.collect_remote(&place_id, request, ResultSource::RemoteViaNameSearch)
                    .await?
            }
            Some(RequestRoute::LocalFile(path)) => self.collect_local(path).await?,
            None => {
                return Err(EngineError::InvalidRequest {
                    message: "no place identifier supplied".to_string(),
                })
            }
        };

        let selection = window::select_for_display(
            collected.reviews,
            request.window_days,
            request.display_limit,
            now,
        );

        Ok(AggregationResult {
            reviews: selection.reviews,
            spending_estimate: collected.spending_estimate,
            source: collected.source,
            status: selection.status,
            hidden_count: selection.hidden_count,
            place: collected.place,
        })
    }

    async fn collect_remote(
        &self,
        place_id: &str,
        request: &AggregationRequest,
        source: ResultSource,
    ) -> Result<Collected> {
        let fetched = remote::fetch_place_reviews(&self.places, place_id).await?;
        let mut reviews = fetched.reviews;
        let mut local_estimate: Option<String> = None;

        // 同時帶有本地快取時，新抓到的評論優先，再補上快取中的舊評論
        if let Some(path) = request.local_cache_path() {
            match self.cache.lock().await.load(path).await {
                Ok(records) => {
                    let cached = normalizer::normalize_all(&records);
                    tracing::debug!("Merging {} cached reviews from {}", cached.len(), path);
                    reviews = window::merge(reviews, cached);
                    let values: Vec<String> =
                        records.iter().filter_map(normalizer::extract_spend).collect();
                    local_estimate = Some(self.estimator.estimate_raw(&values));
                }
                Err(e) => tracing::warn!("Skipping local cache {}: {}", path, e),
            }
        }

        // Firestore 沒有可用的消費資料時沿用本地快取的估算
        let remote_estimate = match &self.expenses {
            Some(expenses) => match expenses.spend_values(place_id).await {
                Ok(values) => {
                    let estimate = self.estimator.estimate_if_any(&values);
                    if estimate.is_none() {
                        tracing::info!("💰 No usable spend values for {}", place_id);
                    }
                    estimate
                }
                Err(e) => {
                    tracing::warn!("💰 Spend lookup for {} failed: {}", place_id, e);
                    None
                }
            },
            None => None,
        };

        Ok(Collected {
            source,
            reviews,
            spending_estimate: remote_estimate.or(local_estimate),
            place: Some(fetched.details.summary()),
        })
    }

    async fn collect_local(&self, path: &str) -> Result<Collected> {
        let records = self.cache.lock().await.load(path).await?;
        let reviews = normalizer::normalize_all(&records);
        let spend_values: Vec<String> = records
            .iter()
            .filter_map(normalizer::extract_spend)
            .collect();
        tracing::debug!(
            "💰 {} of {} cached reviews carry a spend value",
            spend_values.len(),
            records.len()
        );

        Ok(Collected {
            source: ResultSource::Local,
            reviews,
            spending_estimate: Some(self.estimator.estimate_raw(&spend_values)),
            place: None,
        })
    }
}
