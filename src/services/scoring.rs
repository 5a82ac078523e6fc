//! HOT 热度分：`(views + 5 * bookmarks - 1) / (age_hours + 2)^1.8`

use chrono::{DateTime, Utc};

pub const VIEW_WEIGHT: f64 = 1.0;
pub const BOOKMARK_WEIGHT: f64 = 5.0;
pub const AGE_OFFSET_HOURS: f64 = 2.0;
pub const GRAVITY: f64 = 1.8;

/// 纯函数；`age_hours` 为负时按 0 计算，因此结果不小于 `-1 / 2^1.8`
pub fn hot_score(view_count: i64, bookmark_count: i64, age_hours: i64) -> f64 {
    let points = view_count as f64 * VIEW_WEIGHT + bookmark_count as f64 * BOOKMARK_WEIGHT - 1.0;
    let age = age_hours.max(0) as f64;
    points / (age + AGE_OFFSET_HOURS).powf(GRAVITY)
}

/// 已经过的整小时数（向下取整，未来时间记为 0）
pub fn age_in_hours(published_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published_at).num_hours().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_reference_values() {
        assert_eq!(hot_score(1, 0, 0), 0.0);
        let expected = 100.0 / 2f64.powf(1.8);
        assert!((hot_score(101, 0, 0) - expected).abs() < 1e-12);
        assert!((hot_score(1, 20, 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_age_is_truncated_and_clamped() {
        let now = Utc::now();
        assert_eq!(age_in_hours(now - Duration::minutes(119), now), 1);
        assert_eq!(age_in_hours(now - Duration::hours(5), now), 5);
        assert_eq!(age_in_hours(now + Duration::hours(3), now), 0);
    }

    #[test]
    fn test_floor_for_empty_article() {
        let floor = -1.0 / 2f64.powf(1.8);
        assert!((hot_score(0, 0, 0) - floor).abs() < 1e-12);
        assert!((hot_score(0, 0, -10) - floor).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_score_is_deterministic(views in 0i64..1_000_000, marks in 0i64..10_000, age in -100i64..10_000) {
            prop_assert_eq!(hot_score(views, marks, age).to_bits(), hot_score(views, marks, age).to_bits());
        }

        #[test]
        fn prop_non_increasing_in_age(views in 1i64..1_000_000, marks in 0i64..10_000, age in 0i64..10_000) {
            prop_assert!(hot_score(views, marks, age + 1) <= hot_score(views, marks, age));
        }

        #[test]
        fn prop_increasing_in_points(views in 0i64..1_000_000, marks in 0i64..10_000, age in 0i64..10_000) {
            prop_assert!(hot_score(views + 1, marks, age) > hot_score(views, marks, age));
            prop_assert!(hot_score(views, marks + 1, age) > hot_score(views, marks, age));
        }
    }
}
