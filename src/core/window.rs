use crate::domain::model::{AggregationStatus, Review};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// 時間範圍內沒有評論時，改顯示的最近評論數
pub const FALLBACK_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Matches(Vec<Review>),
    /// 篩選後為空，不是錯誤
    NoMatches,
}

/// 以 (評論者, 時間戳) 去除重複，保留先出現的那筆
pub fn dedup(reviews: Vec<Review>) -> Vec<Review> {
    let mut seen: HashSet<(String, Option<i64>)> = HashSet::new();
    let before = reviews.len();
    let unique: Vec<Review> = reviews
        .into_iter()
        .filter(|r| seen.insert((r.reviewer.clone(), r.timestamp.map(|t| t.timestamp()))))
        .collect();

    if unique.len() < before {
        tracing::debug!("Removed {} duplicate reviews", before - unique.len());
    }
    unique
}

/// 合併多個來源，前面的來源優先
pub fn merge(primary: Vec<Review>, secondary: Vec<Review>) -> Vec<Review> {
    let mut all = primary;
    all.extend(secondary);
    dedup(all)
}

/// 新到舊排序；沒有時間戳的排在最後並維持原本順序
pub fn sort_newest_first(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// 只保留時間戳在 `now - window_days` 之後的評論；無法判斷時間的評論不計入
pub fn filter_and_dedup(
    reviews: Vec<Review>,
    window_days: u32,
    now: DateTime<Utc>,
) -> WindowOutcome {
    let cutoff = now - Duration::days(i64::from(window_days));
    tracing::debug!("Filtering reviews newer than {}", cutoff);

    let mut kept: Vec<Review> = dedup(reviews)
        .into_iter()
        .filter(|r| r.timestamp.is_some_and(|ts| ts >= cutoff))
        .collect();

    if kept.is_empty() {
        return WindowOutcome::NoMatches;
    }
    sort_newest_first(&mut kept);
    WindowOutcome::Matches(kept)
}

/// 不論時間，取最近的 n 則
pub fn most_recent(reviews: Vec<Review>, n: usize) -> Vec<Review> {
    let mut unique = dedup(reviews);
    sort_newest_first(&mut unique);
    unique.truncate(n);
    unique
}

/// 套用時間範圍、空結果時的放寬策略與顯示上限
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelection {
    pub reviews: Vec<Review>,
    pub status: AggregationStatus,
    pub hidden_count: usize,
}

pub fn select_for_display(
    reviews: Vec<Review>,
    window_days: u32,
    display_limit: usize,
    now: DateTime<Utc>,
) -> WindowSelection {
    if reviews.is_empty() {
        return WindowSelection {
            reviews,
            status: AggregationStatus::Empty,
            hidden_count: 0,
        };
    }

    match filter_and_dedup(reviews.clone(), window_days, now) {
        WindowOutcome::Matches(mut matches) => {
            let hidden_count = matches.len().saturating_sub(display_limit);
            matches.truncate(display_limit);
            tracing::info!(
                "Found {} reviews within {} days ({} hidden)",
                matches.len() + hidden_count,
                window_days,
                hidden_count
            );
            WindowSelection {
                reviews: matches,
                status: AggregationStatus::Complete,
                hidden_count,
            }
        }
        WindowOutcome::NoMatches => {
            let fallback = most_recent(reviews, FALLBACK_COUNT.min(display_limit));
            tracing::info!(
                "No reviews within {} days, showing {} most recent instead",
                window_days,
                fallback.len()
            );
            WindowSelection {
                reviews: fallback,
                status: AggregationStatus::Widened { window_days },
                hidden_count: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn review(reviewer: &str, days_ago: Option<i64>) -> Review {
        Review {
            reviewer: reviewer.to_string(),
            rating: 4.0,
            text: format!("{} says hi", reviewer),
            timestamp: days_ago.map(|d| now() - Duration::days(d)),
            relative_time_label: None,
        }
    }

    #[test]
    fn test_filter_excludes_old_and_sorts_newest_first() {
        let reviews = vec![
            review("old", Some(40)),
            review("mid", Some(5)),
            review("new", Some(1)),
            review("undated", None),
        ];

        match filter_and_dedup(reviews, 7, now()) {
            WindowOutcome::Matches(kept) => {
                let names: Vec<&str> = kept.iter().map(|r| r.reviewer.as_str()).collect();
                assert_eq!(names, vec!["new", "mid"]);
            }
            WindowOutcome::NoMatches => panic!("expected matches"),
        }
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let reviews = vec![review("edge", Some(7))];
        assert!(matches!(
            filter_and_dedup(reviews, 7, now()),
            WindowOutcome::Matches(_)
        ));
    }

    #[test]
    fn test_no_matches_is_not_failure() {
        let reviews = vec![review("a", Some(10)), review("b", None)];
        assert_eq!(filter_and_dedup(reviews, 1, now()), WindowOutcome::NoMatches);
    }

    #[test]
    fn test_dedup_first_encountered_wins() {
        let mut fresh = review("same", Some(2));
        fresh.text = "fresh".into();
        let mut cached = review("same", Some(2));
        cached.text = "cached".into();

        let merged = merge(vec![fresh], vec![cached, review("other", Some(2))]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "fresh");
    }

    #[test]
    fn test_dedup_never_returns_shared_key() {
        let reviews = vec![
            review("a", Some(1)),
            review("a", Some(1)),
            review("a", Some(2)),
            review("b", Some(1)),
            review("b", Some(1)),
        ];
        if let WindowOutcome::Matches(kept) = filter_and_dedup(reviews, 30, now()) {
            let keys: HashSet<(String, Option<i64>)> = kept
                .iter()
                .map(|r| (r.reviewer.clone(), r.timestamp.map(|t| t.timestamp())))
                .collect();
            assert_eq!(keys.len(), kept.len());
            assert_eq!(kept.len(), 3);
        } else {
            panic!("expected matches");
        }
    }

    #[test]
    fn test_select_widens_to_five_most_recent() {
        let reviews: Vec<Review> = (2..10).map(|d| review(&format!("r{}", d), Some(d))).collect();
        let selection = select_for_display(reviews, 1, 10, now());

        assert_eq!(selection.status, AggregationStatus::Widened { window_days: 1 });
        let names: Vec<&str> = selection.reviews.iter().map(|r| r.reviewer.as_str()).collect();
        assert_eq!(names, vec!["r2", "r3", "r4", "r5", "r6"]);
    }

    #[test]
    fn test_select_applies_display_limit() {
        let reviews: Vec<Review> = (0..15).map(|d| review(&format!("r{}", d), Some(d))).collect();
        let selection = select_for_display(reviews, 30, 10, now());

        assert_eq!(selection.status, AggregationStatus::Complete);
        assert_eq!(selection.reviews.len(), 10);
        assert_eq!(selection.hidden_count, 5);
        assert_eq!(selection.reviews[0].reviewer, "r0");
    }

    #[test]
    fn test_select_empty_input() {
        let selection = select_for_display(Vec::new(), 30, 10, now());
        assert_eq!(selection.status, AggregationStatus::Empty);
        assert!(selection.reviews.is_empty());
    }

    #[test]
    fn test_most_recent_puts_undated_last() {
        let reviews = vec![review("undated", None), review("old", Some(100))];
        let recent = most_recent(reviews, 5);
        assert_eq!(recent[0].reviewer, "old");
        assert_eq!(recent[1].reviewer, "undated");
    }
}
