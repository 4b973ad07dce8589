//! 將本地快取（中文欄位）與 Places API（英文欄位）兩種評論格式
//! 統一轉成 [`Review`]。

use crate::domain::model::{RawRecord, Review, UNKNOWN_TIME_LABEL};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;

const REVIEWER_KEYS: &[&str] = &["author_name", "評論者", "reviewer_name", "reviewer"];
const TEXT_KEYS: &[&str] = &["text", "評論", "評論內容", "comment"];
const RATING_KEYS: &[&str] = &["rating", "評論分數", "star_rating", "評分"];
const EPOCH_KEYS: &[&str] = &["time", "timestamp"];
const LOCAL_DATE_KEYS: &[&str] = &["留言日期", "comment_date"];
const LABEL_KEYS: &[&str] = &["relative_time_description", "留言時間"];
const SPEND_KEYS: &[&str] = &["平均每人消費", "spend", "price_level", "expense", "cost", "平均消費"];

const ANONYMOUS_REVIEWER: &str = "匿名";

/// 本地快取的日期字串以台灣時間記錄
const LOCAL_UTC_OFFSET_SECS: i32 = 8 * 3600;

pub fn normalize(raw: &RawRecord) -> Review {
    let reviewer = raw
        .first_present(REVIEWER_KEYS)
        .and_then(text_of)
        .unwrap_or_else(|| ANONYMOUS_REVIEWER.to_string());
    let text = raw
        .first_present(TEXT_KEYS)
        .and_then(text_of)
        .unwrap_or_default();
    let rating = raw
        .first_present(RATING_KEYS)
        .and_then(number_of)
        .map(clamp_rating)
        .unwrap_or(0.0);

    let label = raw.first_present(LABEL_KEYS).and_then(text_of);
    let timestamp = resolve_timestamp(raw);

    if timestamp.is_none() && label.is_none() {
        tracing::debug!("No usable time for review by {}, marking unknown", reviewer);
    }

    Review {
        reviewer,
        rating,
        text,
        timestamp,
        relative_time_label: match (timestamp, label) {
            (_, Some(label)) => Some(label),
            (Some(_), None) => None,
            (None, None) => Some(UNKNOWN_TIME_LABEL.to_string()),
        },
    }
}

pub fn normalize_all(records: &[RawRecord]) -> Vec<Review> {
    records.iter().map(normalize).collect()
}

/// 取出評論上的消費欄位（字串或整數），沒有則回傳 None
pub fn extract_spend(raw: &RawRecord) -> Option<String> {
    SPEND_KEYS
        .iter()
        .filter_map(|key| raw.data.get(*key))
        .find_map(text_of)
}

fn resolve_timestamp(raw: &RawRecord) -> Option<DateTime<Utc>> {
    if let Some(value) = raw.first_present(EPOCH_KEYS) {
        match epoch_of(value) {
            Some(ts) => return Some(ts),
            None => tracing::debug!("Ignoring malformed epoch timestamp: {}", value),
        }
    }

    if let Some(value) = raw.first_present(LOCAL_DATE_KEYS) {
        match value.as_str().and_then(parse_local_date) {
            Some(ts) => return Some(ts),
            None => tracing::debug!("Ignoring malformed local date: {}", value),
        }
    }

    None
}

fn epoch_of(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

/// 解析 `yyyy/mm/dd[ hh:mm[:ss]]`，時間部分無法解析時以當天零點計。
///
/// 收集器會把相對時間直接接在時間後面（`2024/05/20 18:00:00一週前`），
/// 所以只讀取時間開頭的部分
pub fn parse_local_date(raw: &str) -> Option<DateTime<Utc>> {
    let mut parts = raw.split_whitespace();
    let date = NaiveDate::parse_from_str(parts.next()?, "%Y/%m/%d").ok()?;
    let time = parts
        .next()
        .and_then(leading_time)
        .unwrap_or(NaiveTime::MIN);

    let offset = FixedOffset::east_opt(LOCAL_UTC_OFFSET_SECS)?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn leading_time(token: &str) -> Option<NaiveTime> {
    ["%H:%M:%S", "%H:%M"].iter().find_map(|format| {
        NaiveTime::parse_and_remainder(token, format)
            .ok()
            .map(|(time, _)| time)
    })
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn clamp_rating(rating: f64) -> f64 {
    if rating.is_finite() {
        rating.clamp(0.0, 5.0)
    } else {
        0.0
    }
}
