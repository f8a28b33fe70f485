use crate::constants::{
    ELO_SCALE, MARGIN_EXPONENT, MARGIN_OFFSET, MULTIPLIER_BASE, MULTIPLIER_RATING_SLOPE,
};
use crate::error::{EloError, Result};

/// Probability of a team rated `rating_a` beating a team rated `rating_b`.
///
/// Logistic Elo model: 400 rating points of separation make the favorite a
/// 10:1 favorite. Returns a value strictly inside (0, 1) for finite ratings.
pub fn expected_outcome(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / ELO_SCALE))
}

/// Scaling applied to a rating change for the final margin.
///
/// Blowouts move ratings more than close games, but the effect shrinks when a
/// heavy favorite wins big, since that result was expected.
pub fn margin_multiplier(margin: u32, home_rating: f64, away_rating: f64) -> f64 {
    (margin as f64 + MARGIN_OFFSET).powf(MARGIN_EXPONENT)
        / (MULTIPLIER_BASE + MULTIPLIER_RATING_SLOPE * (home_rating - away_rating))
}

/// Rating changes produced by one completed game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatingDelta {
    pub home: f64,
    pub away: f64,
}

/// Calculate the rating change for both sides of a completed game.
///
/// # Arguments
/// * `home_rating` - Home team's rating before the game
/// * `away_rating` - Away team's rating before the game
/// * `home_points` - Home team's final score
/// * `away_points` - Away team's final score
/// * `k_factor` - Scale of the update
///
/// # Returns
/// The home and away deltas. `away` is always exactly `-home`, so every game
/// conserves the league's total rating.
pub fn rating_delta(
    home_rating: f64,
    away_rating: f64,
    home_points: u32,
    away_points: u32,
    k_factor: f64,
) -> Result<RatingDelta> {
    if home_points == away_points {
        return Err(EloError::TiedScore {
            points: home_points,
        });
    }

    let margin = home_points.abs_diff(away_points);
    let multiplier = margin_multiplier(margin, home_rating, away_rating);

    let expected_home_win = expected_outcome(home_rating, away_rating);
    let outcome = if home_points > away_points {
        1.0 - expected_home_win
    } else {
        -expected_home_win
    };

    let home = k_factor * multiplier * outcome;
    Ok(RatingDelta { home, away: -home })
}
