//! NBA Elo core - team ratings and Monte Carlo season projections.
//!
//! Replays a season's results through an Elo-style rating model, completes
//! the unplayed schedule stochastically, and simulates the playoffs to estimate
//! each team's chances of making the playoffs, earning a top seed, and winning
//! the title. Python bindings are available behind the `python` feature.

pub mod conference;
pub mod config;
pub mod constants;
pub mod error;
pub mod game;
pub mod playoff;
pub mod projection;
pub mod rating;
pub mod season;
pub mod simulation;
pub mod team;

#[cfg(feature = "python")]
mod python;

pub use conference::{
    Conference, ConferenceClassifier, ConferenceSplit, ConferenceTable, ScheduleFrequencyClassifier,
};
pub use config::{ConfigError, SimulationConfig};
pub use constants::{DEFAULT_RATING, K_FACTOR, PLAYOFF_TEAMS};
pub use error::{EloError, Result};
pub use game::{Game, GameStatus};
pub use playoff::{series_win_probability, PlayoffRound, PlayoffSimulator, SeriesPolicy};
pub use projection::{
    project_as_of, project_as_of_seeded, project_as_of_with, rating_histories, season_year,
};
pub use rating::{expected_outcome, margin_multiplier, rating_delta, RatingDelta};
pub use season::{PointDifferential, Season, Standings, StandingsEntry};
pub use simulation::{rng_from_seed, ProbabilityRow, Simulator, Tally, TrialOutcome};
pub use team::{RatingHistory, Team};
