//! SM-2 family scheduler with fixed constants.
//!
//! - `Again`: interval resets to 1 day, ease drops by 0.2 (floor 1.3).
//! - `Good`: interval below 1 becomes 1; below 6 grows by 1.6; otherwise
//!   grows by the ease factor. Growth is rounded up to whole days.
//! - `Easy`: same growth as `Good`, ease rises by 0.15.
//!
//! Every rating sets `due_at = now + interval days`. Growth stops at
//! `MAX_INTERVAL_DAYS`.

use super::Rating;
use crate::model::note::{Note, Schedule, MIN_EASE_FACTOR};
use chrono::{DateTime, Duration, Utc};

pub const AGAIN_EASE_PENALTY: f64 = 0.2;
pub const EASY_EASE_BONUS: f64 = 0.15;
/// Intervals below this many days grow by `YOUNG_GROWTH_FACTOR`.
pub const YOUNG_INTERVAL_LIMIT_DAYS: f64 = 6.0;
pub const YOUNG_GROWTH_FACTOR: f64 = 1.6;
/// Upper bound on any interval (about a century).
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Computes the schedule that follows `current` after `rating` at `now`.
pub fn next_schedule(current: &Schedule, rating: Rating, now: DateTime<Utc>) -> Schedule {
    let ease = current.ease_factor.max(MIN_EASE_FACTOR);

    let (interval, ease_factor) = match rating {
        Rating::Again => (1.0, (ease - AGAIN_EASE_PENALTY).max(MIN_EASE_FACTOR)),
        Rating::Good => (grow_interval(current.interval, ease), ease),
        Rating::Easy => (grow_interval(current.interval, ease), ease + EASY_EASE_BONUS),
    };

    Schedule {
        due_at: due_after(now, interval),
        interval,
        ease_factor,
    }
}

/// Applies `rating` to the note in place and returns the new schedule.
pub fn apply_rating(note: &mut Note, rating: Rating, now: DateTime<Utc>) -> Schedule {
    note.schedule = next_schedule(&note.schedule, rating, now);
    note.schedule
}

/// Interval each rating would produce, in `Rating::ALL` order.
pub fn preview_intervals(current: &Schedule) -> [(Rating, f64); 3] {
    let now = current.due_at;
    Rating::ALL.map(|rating| (rating, next_schedule(current, rating, now).interval))
}

/// Whole days from `now` until `due_at`, rounded up; never negative.
pub fn days_until(due_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (due_at - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis as f64 / MILLIS_PER_DAY).ceil() as i64
}

/// Formats an interval in days as a compact label (`3d`, `2w`, `4mo`, `1y`).
pub fn format_interval(days: f64) -> String {
    let days = days.ceil().max(0.0) as i64;
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{days}d"),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

fn grow_interval(interval: f64, ease: f64) -> f64 {
    if interval < 1.0 {
        1.0
    } else if interval < YOUNG_INTERVAL_LIMIT_DAYS {
        (interval * YOUNG_GROWTH_FACTOR).ceil()
    } else {
        (interval * ease).ceil().min(MAX_INTERVAL_DAYS)
    }
}

fn due_after(now: DateTime<Utc>, interval_days: f64) -> DateTime<Utc> {
    let offset = Duration::milliseconds((interval_days * MILLIS_PER_DAY).round() as i64);
    now.checked_add_signed(offset).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
