use crate::core::normalizer;
use crate::domain::model::{PlaceDetails, Review};
use crate::domain::ports::PlacesApi;
use crate::utils::error::{EngineError, Result};

/// 已正規化的遠端評論
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReviews {
    pub details: PlaceDetails,
    pub reviews: Vec<Review>,
}

/// 向 Places 服務取得地點的最新評論（依新到舊）。
///
/// 不做重試；時間範圍與降級結果由 `ReviewEngine` 統一處理
pub async fn fetch_place_reviews<P: PlacesApi + ?Sized>(
    api: &P,
    place_id: &str,
) -> Result<RemoteReviews> {
    if place_id.trim().is_empty() {
        return Err(EngineError::InvalidRequest {
            message: "place id is empty".to_string(),
        });
    }

    tracing::info!("📡 Fetching reviews for place {}", place_id);
    let details = api.place_details(place_id).await?;
    let reviews = normalizer::normalize_all(&details.reviews);
    tracing::info!(
        "📡 Received {} reviews for {}",
        reviews.len(),
        details.name.as_deref().unwrap_or(place_id)
    );

    Ok(RemoteReviews { details, reviews })
}
