use crate::domain::model::{PlaceCandidate, PlaceDetails, RawRecord};
use crate::domain::ports::{ConfigProvider, PlacesApi};
use crate::utils::error::{EngineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DETAIL_FIELDS: &str = "name,rating,reviews,user_ratings_total";
const SEARCH_FIELDS: &str = "place_id,name";
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    name: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u64>,
    #[serde(default)]
    reviews: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<Candidate>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    place_id: Option<String>,
    name: Option<String>,
}

/// Google Places 的 details 與 findplacefromtext 端點
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl PlacesClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        language: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            language: language.into(),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.places_base_url(),
            config.places_api_key().map(str::to_string),
            config.language(),
            config.connect_timeout(),
            config.read_timeout(),
        )
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| EngineError::MissingConfig {
                field: "places.api_key".to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("Making API request to: {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Upstream {
                status: status.as_u16().to_string(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::parse(format!("unexpected {} response: {}", endpoint, e)))
    }
}

fn status_error(status: String, error_message: Option<String>, what: &str) -> EngineError {
    match status.as_str() {
        "NOT_FOUND" | "ZERO_RESULTS" => EngineError::not_found(what.to_string()),
        _ => EngineError::Upstream {
            status,
            message: error_message.unwrap_or_default(),
        },
    }
}

#[async_trait]
impl PlacesApi for PlacesClient {
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails> {
        let key = self.api_key()?;
        let response: DetailsResponse = self
            .get_json(
                "details/json",
                &[
                    ("place_id", place_id),
                    ("fields", DETAIL_FIELDS),
                    ("language", self.language.as_str()),
                    ("reviews_sort", "newest"),
                    ("key", key),
                ],
            )
            .await?;

        if response.status != "OK" {
            return Err(status_error(
                response.status,
                response.error_message,
                &format!("place {}", place_id),
            ));
        }
        let result = response
            .result
            .ok_or_else(|| EngineError::not_found(format!("place {}", place_id)))?;

        let total = result.reviews.len();
        let reviews: Vec<RawRecord> = result
            .reviews
            .into_iter()
            .filter_map(RawRecord::from_value)
            .collect();
        if reviews.len() < total {
            tracing::warn!("Dropped {} malformed reviews from API", total - reviews.len());
        }

        Ok(PlaceDetails {
            name: result.name,
            rating: result.rating,
            total_ratings: result.user_ratings_total,
            reviews,
        })
    }

    async fn find_place(&self, query: &str) -> Result<Option<PlaceCandidate>> {
        let key = self.api_key()?;
        let response: FindPlaceResponse = self
            .get_json(
                "findplacefromtext/json",
                &[
                    ("input", query),
                    ("inputtype", "textquery"),
                    ("fields", SEARCH_FIELDS),
                    ("language", self.language.as_str()),
                    ("key", key),
                ],
            )
            .await?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(None),
            _ => {
                return Err(status_error(
                    response.status,
                    response.error_message,
                    &format!("places matching {}", query),
                ))
            }
        }

        if response.candidates.len() > 1 {
            tracing::debug!(
                "{} candidates for {}, taking the first",
                response.candidates.len(),
                query
            );
        }

        Ok(response.candidates.into_iter().next().and_then(|c| {
            c.place_id.map(|place_id| PlaceCandidate {
                place_id,
                name: c.name,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorCategory;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, key: Option<&str>) -> PlacesClient {
        PlacesClient::new(
            server.base_url(),
            key.map(str::to_string),
            "zh-TW",
            Duration::from_secs(10),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_place_details_success() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/details/json")
                .query_param("place_id", "ChIJ1")
                .query_param("fields", DETAIL_FIELDS)
                .query_param("language", "zh-TW")
                .query_param("reviews_sort", "newest")
                .query_param("key", "secret");
            then.status(200).json_body(json!({
                "status": "OK",
                "result": {
                    "name": "海大燒臘",
                    "rating": 4.4,
                    "user_ratings_total": 87,
                    "reviews": [
                        {"author_name": "A", "rating": 5, "text": "讚", "time": 1717000000},
                        "garbage"
                    ]
                }
            }));
        });

        let details = client(&server, Some("secret"))
            .place_details("ChIJ1")
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(details.name.as_deref(), Some("海大燒臘"));
        assert_eq!(details.total_ratings, Some(87));
        assert_eq!(details.reviews.len(), 1);
    }

    #[tokio::test]
    async fn test_non_ok_status_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/details/json");
            then.status(200).json_body(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            }));
        });

        let err = client(&server, Some("bad"))
            .place_details("ChIJ1")
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.to_string().contains("REQUEST_DENIED"));
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/details/json");
            then.status(200).json_body(json!({"status": "NOT_FOUND"}));
        });

        let err = client(&server, Some("k"))
            .place_details("nope")
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn test_http_error_is_upstream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/details/json");
            then.status(503).body("unavailable");
        });

        let err = client(&server, Some("k"))
            .place_details("ChIJ1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Upstream { ref status, .. } if status == "503"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/details/json");
            then.status(200);
        });

        let err = client(&server, None).place_details("ChIJ1").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_find_place_takes_first_candidate() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/findplacefromtext/json")
                .query_param("input", "茹絲咖啡")
                .query_param("inputtype", "textquery")
                .query_param("fields", SEARCH_FIELDS);
            then.status(200).json_body(json!({
                "status": "OK",
                "candidates": [
                    {"place_id": "first", "name": "茹絲咖啡 總店"},
                    {"place_id": "second", "name": "茹絲咖啡 分店"}
                ]
            }));
        });

        let candidate = client(&server, Some("k"))
            .find_place("茹絲咖啡")
            .await
            .unwrap()
            .unwrap();

        api_mock.assert();
        assert_eq!(candidate.place_id, "first");
    }

    #[tokio::test]
    async fn test_find_place_zero_results() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/findplacefromtext/json");
            then.status(200)
                .json_body(json!({"status": "ZERO_RESULTS", "candidates": []}));
        });

        let candidate = client(&server, Some("k")).find_place("x").await.unwrap();
        assert!(candidate.is_none());
    }
}
