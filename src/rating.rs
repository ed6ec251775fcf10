use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// Payload for the data layer's "rate recipe" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub user_id: i64,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingState {
    pub average: f64,
    pub own_score: Option<u8>,
}

impl RatingState {
    pub fn new(average: f64) -> Self {
        Self {
            average: sanitize_average(average),
            own_score: None,
        }
    }

    pub fn request(user_id: i64, score: i64) -> Result<RatingRequest> {
        Ok(RatingRequest {
            user_id,
            score: validate_score(score)?,
        })
    }

    /// Records the server's answer to an accepted rating.
    pub fn record(&mut self, score: i64, average: f64) -> Result<()> {
        self.own_score = Some(validate_score(score)?);
        self.average = sanitize_average(average);
        Ok(())
    }
}

pub fn validate_score(score: i64) -> Result<u8> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score as u8)
    } else {
        Err(SessionError::InvalidRating(score))
    }
}

fn sanitize_average(average: f64) -> f64 {
    if average.is_finite() {
        average.clamp(0.0, MAX_SCORE as f64)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_outside_one_to_five_rejected() {
        assert_eq!(validate_score(0), Err(SessionError::InvalidRating(0)));
        assert_eq!(validate_score(6), Err(SessionError::InvalidRating(6)));
        assert_eq!(validate_score(1), Ok(1));
        assert_eq!(validate_score(5), Ok(5));
    }

    #[test]
    fn record_updates_average_and_own_score() {
        let mut state = RatingState::new(3.5);
        state.record(4, 3.75).unwrap();
        assert_eq!(state.own_score, Some(4));
        assert_eq!(state.average, 3.75);

        assert!(state.record(9, 1.0).is_err());
        assert_eq!(state.average, 3.75);
    }

    #[test]
    fn bogus_averages_are_sanitized() {
        assert_eq!(RatingState::new(f64::NAN).average, 0.0);
        assert_eq!(RatingState::new(7.0).average, 5.0);
    }

    #[test]
    fn request_payload() {
        let request = RatingState::request(12, 5).unwrap();
        assert_eq!(request, RatingRequest { user_id: 12, score: 5 });
        assert!(RatingState::request(12, -1).is_err());
    }
}
