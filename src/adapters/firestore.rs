use crate::domain::ports::{ConfigProvider, ExpenseApi};
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const PAGE_SIZE: &str = "100";
const MAX_PAGES: usize = 20;
const SPEND_FIELD: &str = "spend";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl Document {
    /// Firestore 的欄位值包在型別標記裡，例如 {"stringValue": "..."}
    fn spend(&self) -> Option<String> {
        let value = self.fields.get(SPEND_FIELD)?;
        if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
            let trimmed = s.trim();
            return (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        match value.get("integerValue") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 從 Firestore 的 restaurants/{id}/reviews 子集合讀取消費欄位
pub struct FirestoreExpenseClient {
    client: Client,
    base_url: Url,
    project_id: String,
    collection: String,
}

impl FirestoreExpenseClient {
    pub fn new(
        base_url: &str,
        project_id: impl Into<String>,
        collection: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| EngineError::InvalidConfigValue {
            field: "expenses.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            project_id: project_id.into(),
            collection: collection.into(),
        })
    }

    /// 未設定 project 時回傳 None，代表不查詢消費資料
    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Option<Self>> {
        let Some(project) = config.firestore_project() else {
            return Ok(None);
        };
        Self::new(
            config.firestore_base_url(),
            project,
            config.firestore_collection(),
            config.connect_timeout(),
            config.read_timeout(),
        )
        .map(Some)
    }

    fn reviews_url(&self, place_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Config {
                message: format!("firestore base url cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend([
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                self.collection.as_str(),
                place_id,
                "reviews",
            ]);
        Ok(url)
    }

    async fn fetch_page(&self, url: &Url, page_token: Option<&str>) -> Result<ListDocumentsResponse> {
        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .query(&[("pageSize", PAGE_SIZE)]);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Firestore response status: {}", status);

        if status == StatusCode::NOT_FOUND {
            return Err(EngineError::not_found(format!("expense data at {}", url.path())));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Upstream {
                status: status.as_u16().to_string(),
                message: body.chars().take(300).collect(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(ListDocumentsResponse::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ExpenseApi for FirestoreExpenseClient {
    async fn spend_values(&self, place_id: &str) -> Result<Vec<String>> {
        let url = self.reviews_url(place_id)?;
        tracing::info!("💰 Fetching expense data for {}", place_id);

        let mut values = Vec::new();
        let mut total = 0usize;
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let response = self.fetch_page(&url, page_token.as_deref()).await?;
            total += response.documents.len();
            values.extend(response.documents.iter().filter_map(Document::spend));

            match response.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if page < MAX_PAGES => page_token = Some(token),
                Some(_) => {
                    tracing::warn!("Stopped after {} pages of expense data", MAX_PAGES);
                    break;
                }
                None => break,
            }
        }

        tracing::info!(
            "💰 {} reviews, {} without spend, {} usable values",
            total,
            total - values.len(),
            values.len()
        );
        Ok(values)
    }
}
