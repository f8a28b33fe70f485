use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;

use crate::constants::{SIMULATED_LOSER_POINTS, SIMULATED_WINNER_POINTS};
use crate::error::{EloError, Result};
use crate::rating::expected_outcome;

/// Completion state of a scheduled game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    /// Not played yet
    Incomplete,
    /// Real result
    Final,
    /// Completed by the simulator; scores only encode the winner
    Simulated,
}

/// One game on a season schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct Game {
    pub home_team: String,
    pub away_team: String,
    pub date: NaiveDateTime,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
    pub is_simulated: bool,
}

impl Game {
    /// A game that has not been played yet.
    pub fn scheduled(home_team: &str, away_team: &str, date: NaiveDateTime) -> Self {
        Game {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            date,
            home_points: None,
            away_points: None,
            is_simulated: false,
        }
    }

    /// A game with a real final score.
    pub fn played(
        home_team: &str,
        away_team: &str,
        date: NaiveDateTime,
        home_points: u32,
        away_points: u32,
    ) -> Self {
        Game {
            home_points: Some(home_points),
            away_points: Some(away_points),
            ..Game::scheduled(home_team, away_team, date)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.home_points.is_some() && self.away_points.is_some()
    }

    pub fn status(&self) -> GameStatus {
        match (self.is_complete(), self.is_simulated) {
            (false, _) => GameStatus::Incomplete,
            (true, false) => GameStatus::Final,
            (true, true) => GameStatus::Simulated,
        }
    }

    /// Final score as (home, away), if the game is complete.
    pub fn score(&self) -> Option<(u32, u32)> {
        self.home_points.zip(self.away_points)
    }

    /// Whether the home side won, if the game is complete.
    pub fn home_won(&self) -> Option<bool> {
        self.score().map(|(home, away)| home > away)
    }

    pub fn winner(&self) -> Option<&str> {
        self.home_won().map(|home_won| {
            if home_won {
                self.home_team.as_str()
            } else {
                self.away_team.as_str()
            }
        })
    }

    pub fn loser(&self) -> Option<&str> {
        self.home_won().map(|home_won| {
            if home_won {
                self.away_team.as_str()
            } else {
                self.home_team.as_str()
            }
        })
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Draw a result for this game from the two teams' ratings.
    ///
    /// Returns a new, completed game carrying placeholder scores. Simulating a
    /// game that already has scores is rejected.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        home_rating: f64,
        away_rating: f64,
        rng: &mut R,
    ) -> Result<Game> {
        if self.is_complete() {
            return Err(EloError::AlreadyComplete {
                home: self.home_team.clone(),
                away: self.away_team.clone(),
                date: self.date,
            });
        }

        let home_win_prob = expected_outcome(home_rating, away_rating);
        let (home_points, away_points) = if rng.gen::<f64>() < home_win_prob {
            (SIMULATED_WINNER_POINTS, SIMULATED_LOSER_POINTS)
        } else {
            (SIMULATED_LOSER_POINTS, SIMULATED_WINNER_POINTS)
        };

        Ok(Game {
            home_points: Some(home_points),
            away_points: Some(away_points),
            is_simulated: true,
            ..self.clone()
        })
    }

    /// Clear the results of every game played on or after `as_of`.
    ///
    /// Used to project a season as it stood on a past date.
    pub fn uncomplete_after(games: &mut [Game], as_of: NaiveDate) {
        for game in games.iter_mut().filter(|g| g.date.date() >= as_of) {
            game.home_points = None;
            game.away_points = None;
            game.is_simulated = false;
        }
    }
}
