use crate::core::expense_parser;
use crate::domain::model::ExpenseRange;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 沒有任何可用消費資料
pub const NO_DATA: &str = "暫無資料";
/// 有資料但無法轉成可讀區間
pub const UNKNOWN: &str = "未知";

pub const DEFAULT_CEILING: u32 = 10_000;
const ROUND_TO: f64 = 10.0;
const MIN_SPAN: i64 = 50;

/// 分級代碼佔比達此比例，且相異值不超過 MODE_MAX_CARDINALITY 時改用眾數
const MODE_BUCKET_SHARE: f64 = 0.8;
const MODE_MAX_CARDINALITY: usize = 3;

const MEDIAN_QUALIFIER: &str = "(中位數)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum EstimationStrategy {
    /// 中點排序後取四分位區間
    Quartile,
    /// 出現最多次的原始字串
    Mode,
    /// 依資料的分級代碼比例與基數自動選擇
    #[default]
    Auto,
}

impl EstimationStrategy {
    /// Auto 依輸入決定實際策略，其他策略原樣回傳
    pub fn resolve(self, raw_values: &[String]) -> Self {
        match self {
            Self::Auto => select_strategy(raw_values),
            other => other,
        }
    }
}

pub fn select_strategy(raw_values: &[String]) -> EstimationStrategy {
    if raw_values.is_empty() {
        return EstimationStrategy::Quartile;
    }

    let bucket_count = raw_values
        .iter()
        .filter(|v| expense_parser::is_bucket_code(v))
        .count();
    let share = bucket_count as f64 / raw_values.len() as f64;

    let mut distinct: Vec<&str> = raw_values.iter().map(|v| v.trim()).collect();
    distinct.sort_unstable();
    distinct.dedup();

    if share >= MODE_BUCKET_SHARE && distinct.len() <= MODE_MAX_CARDINALITY {
        EstimationStrategy::Mode
    } else {
        EstimationStrategy::Quartile
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendingEstimator {
    ceiling: u32,
    strategy: EstimationStrategy,
}

impl Default for SpendingEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING, EstimationStrategy::Auto)
    }
}

impl SpendingEstimator {
    pub fn new(ceiling: u32, strategy: EstimationStrategy) -> Self {
        Self { ceiling, strategy }
    }

    /// 四分位區間估算，格式為 `NT$<low>-<high>`
    pub fn estimate(&self, ranges: &[ExpenseRange]) -> String {
        let mut midpoints: Vec<f64> = ranges
            .iter()
            .filter(|r| r.min <= self.ceiling && r.max <= self.ceiling)
            .map(|r| r.midpoint)
            .collect();

        if midpoints.is_empty() {
            return NO_DATA.to_string();
        }
        if midpoints.len() < ranges.len() {
            tracing::debug!(
                "Dropped {} ranges above ceiling {}",
                ranges.len() - midpoints.len(),
                self.ceiling
            );
        }

        midpoints.sort_by(f64::total_cmp);
        let n = midpoints.len();
        let q1 = midpoints[(n / 4).min(n - 1)];
        let q3 = midpoints[(3 * n / 4).min(n - 1)];

        let low = round_to_ten(q1);
        let mut high = round_to_ten(q3);
        if high - low < MIN_SPAN {
            high = low + MIN_SPAN;
        }

        format!("NT${}-{}", low, high)
    }

    /// 眾數估算：取出現最多次的原始字串，同票時取先出現者
    pub fn estimate_mode(&self, raw_values: &[String]) -> String {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for value in raw_values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
            let count = counts.entry(value).or_insert(0);
            if *count == 0 {
                order.push(value);
            }
            *count += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for value in order {
            let count = counts[value];
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }

        match best {
            Some((value, _)) => readable_mode(value),
            None => NO_DATA.to_string(),
        }
    }

    /// 同 `estimate_raw`，但沒有任何可用資料時回傳 None，讓呼叫端改用其他來源
    pub fn estimate_if_any(&self, raw_values: &[String]) -> Option<String> {
        let estimate = self.estimate_raw(raw_values);
        (estimate != NO_DATA).then_some(estimate)
    }

    /// 從原始消費字串估算，依設定的策略處理；無法解析的字串直接略過
    pub fn estimate_raw(&self, raw_values: &[String]) -> String {
        if raw_values.is_empty() {
            return NO_DATA.to_string();
        }

        match self.strategy.resolve(raw_values) {
            EstimationStrategy::Mode => self.estimate_mode(raw_values),
            _ => {
                let ranges: Vec<ExpenseRange> = raw_values
                    .iter()
                    .filter_map(|v| expense_parser::parse(v))
                    .collect();
                tracing::debug!(
                    "💰 Parsed {}/{} spend values",
                    ranges.len(),
                    raw_values.len()
                );
                self.estimate(&ranges)
            }
        }
    }
}

fn round_to_ten(value: f64) -> i64 {
    ((value / ROUND_TO + 0.5).floor() * ROUND_TO) as i64
}

fn readable_mode(value: &str) -> String {
    if let Some(floor) = expense_parser::parse_open_ended(value) {
        return format!("NT${}以上 {}", floor, MEDIAN_QUALIFIER);
    }
    match expense_parser::parse(value) {
        Some(range) => format!("NT${} {}", range, MEDIAN_QUALIFIER),
        None => UNKNOWN.to_string(),
    }
}
