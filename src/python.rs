use chrono::{NaiveDate, NaiveDateTime};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::SimulationConfig;
use crate::constants::{DEFAULT_TRIALS, K_FACTOR};
use crate::error::EloError;
use crate::game::Game;
use crate::simulation::ProbabilityRow;

impl From<EloError> for PyErr {
    fn from(err: EloError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Schedule row as handed over by the web application:
/// (home, away, date, home points, away points).
type GameRow = (String, String, NaiveDateTime, Option<u32>, Option<u32>);

/// Win probability of a team rated `rating_a` against one rated `rating_b`.
#[pyfunction]
fn expected_outcome(rating_a: f64, rating_b: f64) -> f64 {
    crate::rating::expected_outcome(rating_a, rating_b)
}

/// Rating changes (home, away) for one completed game.
#[pyfunction]
#[pyo3(signature = (home_rating, away_rating, home_points, away_points, k_factor = K_FACTOR))]
fn rating_delta(
    home_rating: f64,
    away_rating: f64,
    home_points: u32,
    away_points: u32,
    k_factor: f64,
) -> PyResult<(f64, f64)> {
    let delta = crate::rating::rating_delta(home_rating, away_rating, home_points, away_points, k_factor)?;
    Ok((delta.home, delta.away))
}

/// Playoff, top seed and championship probabilities as of a date.
#[pyfunction]
#[pyo3(signature = (games, as_of, trials = DEFAULT_TRIALS, seed = None, parallel = false))]
fn project_as_of(
    py: Python<'_>,
    games: Vec<GameRow>,
    as_of: NaiveDate,
    trials: usize,
    seed: Option<u64>,
    parallel: bool,
) -> PyResult<Vec<ProbabilityRow>> {
    let games: Vec<Game> = games
        .into_iter()
        .map(|(home, away, date, home_points, away_points)| Game {
            home_points,
            away_points,
            ..Game::scheduled(&home, &away, date)
        })
        .collect();

    let config = SimulationConfig {
        trials,
        seed,
        parallel,
        ..SimulationConfig::default()
    };
    config
        .validate()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    let rows = py.allow_threads(|| crate::projection::project_as_of_seeded(&games, as_of, &config))?;
    Ok(rows)
}

/// Python module definition
#[pymodule]
fn nbaelo_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ProbabilityRow>()?;

    m.add_function(wrap_pyfunction!(expected_outcome, m)?)?;
    m.add_function(wrap_pyfunction!(rating_delta, m)?)?;
    m.add_function(wrap_pyfunction!(project_as_of, m)?)?;

    m.add("K_FACTOR", K_FACTOR)?;
    m.add("DEFAULT_RATING", crate::constants::DEFAULT_RATING)?;

    Ok(())
}
