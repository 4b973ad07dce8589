use crate::domain::model::{PlaceCandidate, PlaceDetails};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// 遠端地點服務：詳細資料查詢與文字搜尋
#[async_trait]
pub trait PlacesApi: Send + Sync {
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails>;

    /// 回傳搜尋結果的第一個候選，沒有結果時為 None
    async fn find_place(&self, query: &str) -> Result<Option<PlaceCandidate>>;
}

/// 依地點查詢每則評論的原始消費字串
#[async_trait]
pub trait ExpenseApi: Send + Sync {
    async fn spend_values(&self, place_id: &str) -> Result<Vec<String>>;
}

pub trait ConfigProvider: Send + Sync {
    fn places_base_url(&self) -> &str;
    fn places_api_key(&self) -> Option<&str>;
    fn language(&self) -> &str;
    fn connect_timeout(&self) -> Duration;
    fn read_timeout(&self) -> Duration;
    fn firestore_base_url(&self) -> &str;
    fn firestore_project(&self) -> Option<&str>;
    fn firestore_collection(&self) -> &str;
}
