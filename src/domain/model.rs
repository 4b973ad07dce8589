use crate::utils::error::{EngineError, ErrorCategory, Result};
use crate::utils::validation::{validate_nonzero, validate_range, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 無法判斷評論時間時使用的標籤
pub const UNKNOWN_TIME_LABEL: &str = "unknown";

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_DISPLAY_LIMIT: usize = 10;
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// 尚未正規化的評論原始資料（本地快取或 API 回應中的單筆物件）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    pub data: HashMap<String, serde_json::Value>,
}

impl RawRecord {
    /// 只接受 JSON 物件，其他型別回傳 None
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(obj) => Some(Self {
                data: obj.into_iter().collect(),
            }),
            _ => None,
        }
    }

    /// 依序找出第一個存在且非 null 的欄位
    pub fn first_present(&self, keys: &[&str]) -> Option<&serde_json::Value> {
        keys.iter()
            .filter_map(|key| self.data.get(*key))
            .find(|value| !value.is_null())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: String,
    pub rating: f64,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub relative_time_label: Option<String>,
}

impl Review {
    /// 呈現層顯示用的時間：優先使用既有的相對時間標籤，其次由時間戳換算
    pub fn display_time(&self, now: DateTime<Utc>) -> String {
        if let Some(label) = &self.relative_time_label {
            return label.clone();
        }
        match self.timestamp {
            Some(ts) => relative_label(ts, now),
            None => UNKNOWN_TIME_LABEL.to_string(),
        }
    }
}

/// 將時間戳換算成「N 天前」之類的相對描述
pub fn relative_label(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_seconds().max(0);

    if diff < 60 {
        "剛剛".to_string()
    } else if diff < 3_600 {
        format!("{} 分鐘前", diff / 60)
    } else if diff < 86_400 {
        format!("{} 小時前", diff / 3_600)
    } else if diff < 604_800 {
        format!("{} 天前", diff / 86_400)
    } else if diff < 2_592_000 {
        format!("{} 週前", diff / 604_800)
    } else {
        format!("{} 個月前", diff / 2_592_000)
    }
}

/// 消費區間，建構時保證 min <= max
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRange {
    pub min: u32,
    pub max: u32,
    pub midpoint: f64,
}

impl ExpenseRange {
    pub fn new(a: u32, b: u32) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Self {
            min,
            max,
            midpoint: (f64::from(min) + f64::from(max)) / 2.0,
        }
    }

    pub fn single(value: u32) -> Self {
        Self::new(value, value)
    }

    pub fn is_range(&self) -> bool {
        self.min != self.max
    }
}

impl std::fmt::Display for ExpenseRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_range() {
            write!(f, "{}-{}", self.min, self.max)
        } else {
            write!(f, "{}", self.min)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub place_id: Option<String>,
    pub display_name: Option<String>,
    pub window_days: u32,
    pub local_cache_path: Option<String>,
    pub display_limit: usize,
}

impl Default for AggregationRequest {
    fn default() -> Self {
        Self {
            place_id: None,
            display_name: None,
            window_days: DEFAULT_WINDOW_DAYS,
            local_cache_path: None,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }
}

/// 請求實際要走的資料來源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestRoute<'a> {
    PlaceId(&'a str),
    Name(&'a str),
    LocalFile(&'a str),
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AggregationRequest {
    pub fn for_place(place_id: impl Into<String>) -> Self {
        Self {
            place_id: Some(place_id.into()),
            ..Self::default()
        }
    }

    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn for_local_file(path: impl Into<String>) -> Self {
        Self {
            local_cache_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_display_limit(mut self, limit: usize) -> Self {
        self.display_limit = limit;
        self
    }

    pub fn place_id(&self) -> Option<&str> {
        non_blank(&self.place_id)
    }

    pub fn display_name(&self) -> Option<&str> {
        non_blank(&self.display_name)
    }

    pub fn local_cache_path(&self) -> Option<&str> {
        non_blank(&self.local_cache_path)
    }

    /// placeId 優先，其次名稱搜尋，最後才是本地快取
    pub fn route(&self) -> Option<RequestRoute<'_>> {
        self.place_id()
            .map(RequestRoute::PlaceId)
            .or_else(|| self.display_name().map(RequestRoute::Name))
            .or_else(|| self.local_cache_path().map(RequestRoute::LocalFile))
    }
}

impl Validate for AggregationRequest {
    fn validate(&self) -> Result<()> {
        if self.route().is_none() {
            return Err(EngineError::InvalidRequest {
                message: "one of place_id, display_name or local_cache_path is required"
                    .to_string(),
            });
        }
        validate_range("window_days", self.window_days, 1, MAX_WINDOW_DAYS).map_err(|e| {
            EngineError::InvalidRequest {
                message: e.to_string(),
            }
        })?;
        validate_nonzero("display_limit", self.display_limit as u64).map_err(|e| {
            EngineError::InvalidRequest {
                message: e.to_string(),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultSource {
    Local,
    Remote,
    RemoteViaNameSearch,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationStatus {
    /// 時間範圍內有評論
    Complete,
    /// 時間範圍內沒有評論，改顯示最近幾則
    Widened { window_days: u32 },
    /// 該地點完全沒有評論
    Empty,
    Degraded {
        category: ErrorCategory,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub total_ratings: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    /// 新到舊排序
    pub reviews: Vec<Review>,
    pub spending_estimate: Option<String>,
    pub source: ResultSource,
    pub status: AggregationStatus,
    /// 超過顯示上限而未列出的評論數
    pub hidden_count: usize,
    pub place: Option<PlaceSummary>,
}

impl AggregationResult {
    pub fn degraded(error: &EngineError) -> Self {
        Self {
            reviews: Vec::new(),
            spending_estimate: None,
            source: ResultSource::None,
            status: AggregationStatus::Degraded {
                category: error.category(),
                reason: error.user_friendly_message(),
            },
            hidden_count: 0,
            place: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, AggregationStatus::Degraded { .. })
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.status {
            AggregationStatus::Degraded { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Places details 端點回傳的地點資料
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub total_ratings: Option<u64>,
    pub reviews: Vec<RawRecord>,
}

impl PlaceDetails {
    pub fn summary(&self) -> PlaceSummary {
        PlaceSummary {
            name: self.name.clone(),
            rating: self.rating,
            total_ratings: self.total_ratings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: Option<String>,
}
