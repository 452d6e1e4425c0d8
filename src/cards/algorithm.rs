//! Spaced repetition review arithmetic
//!
//! A two-outcome variant of the SM-2 family: a remembered card grows its
//! interval by the ease factor and earns a small ease bonus, a forgotten
//! card resets to a one-day interval and loses ease down to a floor.
//!
//! There is deliberately no ceiling on the ease factor; repeated success
//! grows it without bound, matching the behavior the product shipped with.
//! The interval it produces does saturate, at [`MAX_INTERVAL_DAYS`], so
//! the computed due date always stays representable.

use chrono::{DateTime, Duration, Utc};

use super::models::ReviewOutcome;

/// Minimum ease factor allowed
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor assigned to freshly created cards
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Ceiling on the review interval (100 years). The ease factor grows
/// without bound, so a long success streak would otherwise push the due
/// date past the representable datetime range.
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Result of computing the next review
#[derive(Debug, Clone)]
pub struct Review {
    pub interval_days: i64,
    pub ease_factor: f64,
    pub due_at: DateTime<Utc>,
}

/// Compute the next interval, ease factor and due date for a card.
///
/// A remembered card multiplies its interval by the ease factor, floored
/// at one day so that a brand-new card (interval 0) still advances. A
/// forgotten card drops back to one day and loses 0.2 ease, never going
/// below [`MIN_EASE_FACTOR`].
pub fn next_review(
    interval_days: i64,
    ease_factor: f64,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
) -> Review {
    let (interval_days, ease_factor) = match outcome {
        ReviewOutcome::Remembered => {
            // The float-to-int cast saturates, the clamp bounds the result
            let grown = (interval_days as f64 * ease_factor).round() as i64;
            (grown.clamp(1, MAX_INTERVAL_DAYS), ease_factor + 0.1)
        }
        ReviewOutcome::Forgotten => (1, (ease_factor - 0.2).max(MIN_EASE_FACTOR)),
    };

    let due_at = now
        .checked_add_signed(Duration::days(interval_days))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Review {
        interval_days,
        ease_factor,
        due_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_card_remembered_advances_to_one_day() {
        let now = Utc::now();
        let result = next_review(0, 2.5, ReviewOutcome::Remembered, now);

        assert_eq!(result.interval_days, 1);
        assert!((result.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(result.due_at, now + Duration::days(1));
    }

    #[test]
    fn test_remembered_grows_interval() {
        let now = Utc::now();
        let result = next_review(10, 2.5, ReviewOutcome::Remembered, now);

        // 10 * 2.5 = 25
        assert_eq!(result.interval_days, 25);
        assert!((result.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_remembered_never_shrinks_interval() {
        let now = Utc::now();
        for interval in [0, 1, 3, 17, 365] {
            let result = next_review(interval, MIN_EASE_FACTOR, ReviewOutcome::Remembered, now);
            assert!(result.interval_days >= interval.max(1));
        }
    }

    #[test]
    fn test_forgotten_resets_interval() {
        let now = Utc::now();
        let result = next_review(30, 2.5, ReviewOutcome::Forgotten, now);

        assert_eq!(result.interval_days, 1);
        assert!((result.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(result.due_at, now + Duration::days(1));
    }

    #[test]
    fn test_ease_factor_floor_holds() {
        let now = Utc::now();
        let result = next_review(1, 1.3, ReviewOutcome::Forgotten, now);

        assert_eq!(result.interval_days, 1);
        assert!((result.ease_factor - MIN_EASE_FACTOR).abs() < 1e-9);

        // Repeated failures never push ease below the floor
        let again = next_review(1, result.ease_factor, ReviewOutcome::Forgotten, now);
        assert!(again.ease_factor >= MIN_EASE_FACTOR);
    }

    #[test]
    fn test_long_success_streak_saturates() {
        let now = Utc::now();
        let mut interval = 0;
        let mut ease = DEFAULT_EASE_FACTOR;

        for _ in 0..64 {
            let result = next_review(interval, ease, ReviewOutcome::Remembered, now);
            assert!(result.interval_days >= interval.max(1));
            assert!(result.interval_days <= MAX_INTERVAL_DAYS);
            assert!(result.due_at > now);
            interval = result.interval_days;
            ease = result.ease_factor;
        }

        assert_eq!(interval, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_due_date_saturates_near_range_end() {
        let result = next_review(
            MAX_INTERVAL_DAYS,
            DEFAULT_EASE_FACTOR,
            ReviewOutcome::Remembered,
            DateTime::<Utc>::MAX_UTC,
        );
        assert_eq!(result.due_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_interval_rounds_to_nearest_day() {
        let now = Utc::now();
        // 3 * 1.5 = 4.5, rounds to 5
        let result = next_review(3, 1.5, ReviewOutcome::Remembered, now);
        assert_eq!(result.interval_days, 5);
    }
}
