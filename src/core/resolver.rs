use crate::domain::ports::PlacesApi;

/// 以名稱搜尋地點並回傳第一個候選的 ID。
///
/// 同名地點不做區分，直接採用搜尋結果的第一筆。任何錯誤或空結果都回傳
/// None，由呼叫端決定如何呈現「找不到」。
pub async fn resolve_by_name<P: PlacesApi + ?Sized>(api: &P, name: &str) -> Option<String> {
    let query = name.trim();
    if query.is_empty() {
        tracing::warn!("Place name is empty, nothing to search");
        return None;
    }

    tracing::info!("🔍 Searching place by name: {}", query);
    match api.find_place(query).await {
        Ok(Some(candidate)) if !candidate.place_id.trim().is_empty() => {
            tracing::info!(
                "✅ Resolved {} to {} ({})",
                query,
                candidate.name.as_deref().unwrap_or("?"),
                candidate.place_id
            );
            Some(candidate.place_id)
        }
        Ok(_) => {
            tracing::info!("❌ No place found for {}", query);
            None
        }
        Err(e) => {
            tracing::warn!("❌ Place search for {} failed: {}", query, e);
            None
        }
    }
}
