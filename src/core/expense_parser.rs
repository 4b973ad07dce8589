//! 消費字串解析。
//!
//! 依序嘗試：
//! 1. 分級代碼 `E:TWD_200_TO_400`
//! 2. 去除幣別與單位後的 `100-200` / `100~200`
//! 3. 單一整數
//!
//! 任何數字解析失敗都回傳 None，由呼叫端略過該筆資料。

use crate::domain::model::ExpenseRange;
use regex::Regex;
use std::sync::LazyLock;

static BUCKET_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+:[A-Za-z]{3}_(\d+)_TO_(\d+)$").expect("valid bucket regex")
});

static OPEN_ENDED_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]+:[A-Za-z]{3}_(?:(\d+)_OR_MORE|OVER_(\d+))$")
        .expect("valid open-ended regex")
});

static CURRENCY_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"nt\$|ntd|twd|\$|元|dollars?|每人|per person|左右|約").expect("valid currency regex")
});

/// 全形波浪號、破折號與「至／到」一律視為區間分隔
static ALT_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[～〜–—至到]").expect("valid separator regex"));

static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9\-~]").expect("valid cleanup regex"));

pub fn parse(raw: &str) -> Option<ExpenseRange> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = BUCKET_CODE.captures(raw) {
        let lo = caps[1].parse::<u32>().ok()?;
        let hi = caps[2].parse::<u32>().ok()?;
        return Some(ExpenseRange::new(lo, hi));
    }

    let cleaned = clean(raw);
    if cleaned.is_empty() {
        tracing::debug!("No digits left in spend value {:?}", raw);
        return None;
    }

    for separator in ['-', '~'] {
        if cleaned.contains(separator) {
            let parts: Vec<&str> = cleaned.split(separator).collect();
            if let [lo, hi] = parts.as_slice() {
                let lo = lo.parse::<u32>().ok()?;
                let hi = hi.parse::<u32>().ok()?;
                return Some(ExpenseRange::new(lo, hi));
            }
        }
    }

    match cleaned.parse::<u32>() {
        Ok(value) => Some(ExpenseRange::single(value)),
        Err(_) => {
            tracing::debug!("⚠️ Unable to parse spend value {:?}", raw);
            None
        }
    }
}

pub fn is_bucket_code(raw: &str) -> bool {
    let raw = raw.trim();
    BUCKET_CODE.is_match(raw) || OPEN_ENDED_CODE.is_match(raw)
}

/// `E:TWD_1601_OR_MORE` 或 `E:TWD_OVER_1000` 這類沒有上限的代碼，回傳下限
pub fn parse_open_ended(raw: &str) -> Option<u32> {
    let caps = OPEN_ENDED_CODE.captures(raw.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

fn clean(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let without_words = CURRENCY_WORDS.replace_all(&lowered, "");
    let unified = ALT_SEPARATORS.replace_all(&without_words, "~");
    NON_NUMERIC.replace_all(&unified, "").trim().to_string()
}
