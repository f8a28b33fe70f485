use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use tracing::info;

use crate::conference::{ConferenceClassifier, ScheduleFrequencyClassifier};
use crate::config::SimulationConfig;
use crate::error::{EloError, Result};
use crate::game::Game;
use crate::season::Season;
use crate::simulation::{rng_from_seed, ProbabilityRow, Simulator};
use crate::team::Team;

/// Season a date belongs to, named for the year it ends in.
///
/// Seasons run October through June; July to September is the offseason.
pub fn season_year(date: NaiveDate) -> Result<i32> {
    match date.month() {
        7..=9 => Err(EloError::OffSeason { date }),
        10..=12 => Ok(date.year() + 1),
        _ => Ok(date.year()),
    }
}

/// Build a roster from a schedule, tracking ratings from the day before the first game.
pub fn roster_for(
    games: &[Game],
    config: &SimulationConfig,
    classifier: &dyn ConferenceClassifier,
) -> Result<Vec<Team>> {
    let first_game = games
        .iter()
        .map(|g| g.date)
        .min()
        .ok_or(EloError::InvalidArgument {
            name: "games",
            reason: "schedule is empty".to_string(),
        })?;
    let tracking_start = first_game.date().and_time(chrono::NaiveTime::MIN) - Duration::days(1);

    Team::roster_from_schedule(games, tracking_start, config.start_rating, classifier)
}

/// Project season outcomes as they looked on `as_of`.
///
/// Results on or after `as_of` are treated as unplayed, so the projection
/// only uses what was known that morning. Conferences are inferred from the
/// schedule.
pub fn project_as_of<R: Rng + ?Sized>(
    games: &[Game],
    as_of: NaiveDate,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<Vec<ProbabilityRow>> {
    let classifier = ScheduleFrequencyClassifier::new(&config.anchor_team);
    project_as_of_with(games, as_of, config, &classifier, rng)
}

/// [`project_as_of`] with an explicit conference classifier.
pub fn project_as_of_with<R: Rng + ?Sized>(
    games: &[Game],
    as_of: NaiveDate,
    config: &SimulationConfig,
    classifier: &dyn ConferenceClassifier,
    rng: &mut R,
) -> Result<Vec<ProbabilityRow>> {
    let year = season_year(as_of)?;

    let mut games = games.to_vec();
    Game::uncomplete_after(&mut games, as_of);
    let teams = roster_for(&games, config, classifier)?;

    let mut simulator = Simulator::new(year, teams, games, config)?;
    let completed = if config.parallel {
        simulator.simulate_many_seasons_parallel(config.trials, Some(rng.gen()))?
    } else {
        simulator.simulate_many_seasons(config.trials, rng)?
    };

    info!(year, %as_of, completed, "projected season");
    simulator.probability_table(as_of)
}

/// [`project_as_of`] with a generator built from the configured seed.
pub fn project_as_of_seeded(
    games: &[Game],
    as_of: NaiveDate,
    config: &SimulationConfig,
) -> Result<Vec<ProbabilityRow>> {
    let mut rng = rng_from_seed(config.seed);
    project_as_of(games, as_of, config, &mut rng)
}

/// Replay every real result and return each team's day-by-day rating.
pub fn rating_histories(
    games: &[Game],
    config: &SimulationConfig,
    classifier: &dyn ConferenceClassifier,
) -> Result<BTreeMap<String, Vec<(NaiveDate, f64)>>> {
    let teams = roster_for(games, config, classifier)?;
    let year = games
        .iter()
        .map(|g| g.date.date())
        .min()
        .map(season_year)
        .transpose()?
        .unwrap_or_default();

    let mut season = Season::new(year, teams, games.to_vec())?.with_k_factor(config.k_factor);
    season.play_through_season(None)?;

    Ok(season
        .teams()
        .iter()
        .map(|(symbol, team)| (symbol.clone(), team.rating_history().collect()))
        .collect())
}
