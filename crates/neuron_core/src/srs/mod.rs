//! Spaced-repetition scheduling.
//!
//! # Responsibility
//! - Define the recall `Rating` users report after a review.
//! - Compute the next `Schedule` from the current one (pure, no I/O).

mod scheduler;

pub use scheduler::{
    apply_rating, days_until, format_interval, next_schedule, preview_intervals,
    AGAIN_EASE_PENALTY, EASY_EASE_BONUS, MAX_INTERVAL_DAYS, YOUNG_GROWTH_FACTOR,
    YOUNG_INTERVAL_LIMIT_DAYS,
};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Self-reported recall quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rating {
    /// Failed recall.
    Again,
    /// Correct recall.
    Good,
    /// Effortless recall.
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Again, Rating::Good, Rating::Easy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }

    /// Keypad value shown in prompts (`1=Again, 2=Good, 3=Easy`).
    pub fn key(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Good => 2,
            Self::Easy => 3,
        }
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRating(pub String);

impl Display for InvalidRating {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid rating `{}`; expected 1|2|3 or again|good|easy",
            self.0
        )
    }
}

impl Error for InvalidRating {}

impl TryFrom<u8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rating| rating.key() == value)
            .ok_or_else(|| InvalidRating(value.to_string()))
    }
}

impl FromStr for Rating {
    type Err = InvalidRating;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        if let Ok(key) = normalized.parse::<u8>() {
            return Self::try_from(key);
        }
        Self::ALL
            .into_iter()
            .find(|rating| rating.as_str() == normalized)
            .ok_or_else(|| InvalidRating(value.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Rating;

    #[test]
    fn parses_keys_and_names() {
        assert_eq!("1".parse::<Rating>().unwrap(), Rating::Again);
        assert_eq!(" Good ".parse::<Rating>().unwrap(), Rating::Good);
        assert_eq!("EASY".parse::<Rating>().unwrap(), Rating::Easy);
        assert_eq!(Rating::try_from(2).unwrap(), Rating::Good);
    }

    #[test]
    fn rejects_anything_else() {
        for input in ["0", "4", "", "hard", "-1"] {
            assert!(input.parse::<Rating>().is_err(), "{input} should fail");
        }
    }
}
