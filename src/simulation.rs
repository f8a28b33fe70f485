use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::config::SimulationConfig;
use crate::conference::Conference;
use crate::constants::PLAYOFF_TEAMS;
use crate::error::{EloError, Result};
use crate::game::Game;
use crate::playoff::{PlayoffSimulator, SeriesPolicy};
use crate::season::Season;
use crate::team::Team;

/// Seeded generator, or one seeded from system entropy when `seed` is `None`.
pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// What one simulated season produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialOutcome {
    pub playoff_teams: Vec<String>,
    pub top_seeds: Vec<String>,
    pub champion: String,
}

/// Per-team counts over a number of trials.
///
/// Merging is associative and commutative, so tallies from parallel workers
/// can be combined in any order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub trials: usize,
    pub playoffs: BTreeMap<String, usize>,
    pub top_seeds: BTreeMap<String, usize>,
    pub championships: BTreeMap<String, usize>,
}

impl Tally {
    /// An empty tally listing every team with zero counts.
    pub fn for_teams<'a>(teams: impl IntoIterator<Item = &'a String>) -> Self {
        let zeros: BTreeMap<String, usize> = teams.into_iter().map(|t| (t.clone(), 0)).collect();
        Tally {
            trials: 0,
            playoffs: zeros.clone(),
            top_seeds: zeros.clone(),
            championships: zeros,
        }
    }

    pub fn record(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        for team in &outcome.playoff_teams {
            *self.playoffs.entry(team.clone()).or_insert(0) += 1;
        }
        for team in &outcome.top_seeds {
            *self.top_seeds.entry(team.clone()).or_insert(0) += 1;
        }
        *self.championships.entry(outcome.champion.clone()).or_insert(0) += 1;
    }

    pub fn merge(mut self, other: Tally) -> Tally {
        self.trials += other.trials;
        for (mine, theirs) in [
            (&mut self.playoffs, other.playoffs),
            (&mut self.top_seeds, other.top_seeds),
            (&mut self.championships, other.championships),
        ] {
            for (team, count) in theirs {
                *mine.entry(team).or_insert(0) += count;
            }
        }
        self
    }

    fn probabilities(&self, counts: &BTreeMap<String, usize>) -> Result<BTreeMap<String, f64>> {
        if self.trials == 0 {
            return Err(EloError::NoTrials);
        }
        Ok(counts
            .iter()
            .map(|(team, &count)| (team.clone(), count as f64 / self.trials as f64))
            .collect())
    }
}

/// Simulated probabilities for one team as of one date.
#[cfg_attr(feature = "python", pyo3::pyclass(get_all))]
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityRow {
    pub team: String,
    pub as_of: NaiveDate,
    pub playoff: f64,
    pub top_seed: f64,
    pub champion: f64,
}

/// Monte Carlo projection of a season's outcomes.
///
/// Real results are replayed once into a canonical season. Every trial
/// completes its own copy of that season and plays out the postseason, so
/// trials share nothing mutable.
pub struct Simulator {
    season: Season,
    policy: SeriesPolicy,
    tally: Tally,
    cancel: Option<Arc<AtomicBool>>,
}

impl Simulator {
    /// Replay `games` for the given roster.
    pub fn new(
        year: i32,
        teams: Vec<Team>,
        games: Vec<Game>,
        config: &SimulationConfig,
    ) -> Result<Self> {
        let mut season = Season::new(year, teams, games)?.with_k_factor(config.k_factor);
        season.play_through_season(None)?;

        let tally = Tally::for_teams(season.teams().keys());
        Ok(Simulator {
            season,
            policy: config.series_policy,
            tally,
            cancel: None,
        })
    }

    /// Stop launching trials once `flag` is set. Running trials still finish.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The season with real results applied and nothing simulated.
    pub fn season(&self) -> &Season {
        &self.season
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn trials(&self) -> usize {
        self.tally.trials
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Complete one copy of the season and play its postseason.
    fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrialOutcome> {
        let season = self.season.simulated(rng)?;
        let standings = season.current_standings();

        let mut playoff_teams = Vec::with_capacity(2 * PLAYOFF_TEAMS);
        let mut top_seeds = Vec::with_capacity(2);
        for conference in [Conference::West, Conference::East] {
            let qualified = standings.top(conference, PLAYOFF_TEAMS);
            playoff_teams.extend(qualified.iter().map(|e| e.team.clone()));
            top_seeds.extend(qualified.first().map(|e| e.team.clone()));
        }

        let champion = PlayoffSimulator::new(&standings, season.teams(), self.policy)
            .simulate_playoffs(rng)?
            .symbol
            .clone();

        Ok(TrialOutcome {
            playoff_teams,
            top_seeds,
            champion,
        })
    }

    /// Run up to `trials` trials on one thread, drawing from `rng`.
    ///
    /// Returns how many trials completed before any cancellation.
    #[instrument(skip(self, rng), fields(year = self.season.year))]
    pub fn simulate_many_seasons<R: Rng + ?Sized>(
        &mut self,
        trials: usize,
        rng: &mut R,
    ) -> Result<usize> {
        let mut tally = Tally::for_teams(self.season.teams().keys());

        for _ in 0..trials {
            if self.cancelled() {
                debug!(completed = tally.trials, "cancelled");
                break;
            }
            tally.record(&self.run_trial(rng)?);
        }

        let completed = tally.trials;
        self.tally = std::mem::take(&mut self.tally).merge(tally);
        info!(completed, total = self.tally.trials, "simulated seasons");
        Ok(completed)
    }

    /// Run up to `trials` trials across the rayon thread pool.
    ///
    /// Trial `i` draws from its own generator seeded by the `i`th output of a
    /// master generator seeded with `seed`, so results do not depend on the
    /// number of threads.
    #[instrument(skip(self), fields(year = self.season.year))]
    pub fn simulate_many_seasons_parallel(
        &mut self,
        trials: usize,
        seed: Option<u64>,
    ) -> Result<usize> {
        let mut master = rng_from_seed(seed);
        let seeds: Vec<u64> = (0..trials).map(|_| master.gen::<u64>()).collect();
        let empty = || Tally::for_teams(self.season.teams().keys());

        let tally = seeds
            .par_iter()
            .map(|&trial_seed| {
                if self.cancelled() {
                    return Ok(None);
                }
                let mut rng = ChaCha8Rng::seed_from_u64(trial_seed);
                self.run_trial(&mut rng).map(Some)
            })
            .try_fold(empty, |mut tally, outcome: Result<Option<TrialOutcome>>| {
                if let Some(outcome) = outcome? {
                    tally.record(&outcome);
                }
                Ok::<Tally, EloError>(tally)
            })
            .try_reduce(empty, |a, b| Ok(a.merge(b)))?;

        let completed = tally.trials;
        self.tally = std::mem::take(&mut self.tally).merge(tally);
        info!(completed, total = self.tally.trials, "simulated seasons in parallel");
        Ok(completed)
    }

    /// Share of trials in which each team finished in its conference's top eight.
    pub fn playoff_probabilities(&self) -> Result<BTreeMap<String, f64>> {
        self.tally.probabilities(&self.tally.playoffs)
    }

    /// Share of trials in which each team was its conference's first seed.
    pub fn top_seed_probabilities(&self) -> Result<BTreeMap<String, f64>> {
        self.tally.probabilities(&self.tally.top_seeds)
    }

    /// Share of trials in which each team won the championship.
    pub fn championship_probabilities(&self) -> Result<BTreeMap<String, f64>> {
        self.tally.probabilities(&self.tally.championships)
    }

    /// One row per team with all three probabilities, labelled with `as_of`.
    pub fn probability_table(&self, as_of: NaiveDate) -> Result<Vec<ProbabilityRow>> {
        let playoff = self.playoff_probabilities()?;
        let top_seed = self.top_seed_probabilities()?;
        let champion = self.championship_probabilities()?;

        Ok(playoff
            .iter()
            .map(|(team, &playoff)| ProbabilityRow {
                team: team.clone(),
                as_of,
                playoff,
                top_seed: top_seed.get(team).copied().unwrap_or(0.0),
                champion: champion.get(team).copied().unwrap_or(0.0),
            })
            .collect())
    }
}
