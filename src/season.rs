use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use tracing::debug;

use crate::conference::Conference;
use crate::constants::K_FACTOR;
use crate::error::{EloError, Result};
use crate::game::{Game, GameStatus};
use crate::rating::rating_delta;
use crate::team::Team;

/// A team's place in its conference standings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandingsEntry {
    pub team: String,
    /// (wins, losses)
    pub record: (u32, u32),
}

/// Conference standings, best team first.
///
/// Teams are ranked by the `(wins, losses)` pair compared lexicographically,
/// descending, so among teams with equal wins the one with more losses ranks
/// higher. Team symbol (descending) breaks exact ties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Standings {
    pub west: Vec<StandingsEntry>,
    pub east: Vec<StandingsEntry>,
}

impl Standings {
    pub fn conference(&self, conference: Conference) -> &[StandingsEntry] {
        match conference {
            Conference::West => &self.west,
            Conference::East => &self.east,
        }
    }

    /// The first `n` teams of a conference, or fewer if it is smaller.
    pub fn top(&self, conference: Conference, n: usize) -> &[StandingsEntry] {
        let entries = self.conference(conference);
        &entries[..n.min(entries.len())]
    }

    fn sort(entries: &mut [StandingsEntry]) {
        entries.sort_by(|a, b| b.record.cmp(&a.record).then_with(|| b.team.cmp(&a.team)));
    }
}

/// Average margin and totals for one team's real results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointDifferential {
    pub points_scored: u32,
    pub points_allowed: u32,
    pub games_played: u32,
}

impl PointDifferential {
    /// Average points per game by which the team outscored opponents.
    pub fn per_game(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        (self.points_scored as f64 - self.points_allowed as f64) / self.games_played as f64
    }
}

/// One season's schedule and the teams playing it.
///
/// Ratings are path dependent, so games are kept in date order and rated at
/// most once. `rated_through` is the number of leading games the replay has
/// already passed.
#[derive(Clone, Debug)]
pub struct Season {
    pub year: i32,
    pub k_factor: f64,
    teams: BTreeMap<String, Team>,
    games: Vec<Game>,
    rated_through: usize,
}

impl Season {
    /// Create a season, ordering games by date.
    ///
    /// Team symbols must be unique and every game must reference teams in `teams`.
    pub fn new(year: i32, teams: Vec<Team>, mut games: Vec<Game>) -> Result<Self> {
        let mut roster = BTreeMap::new();
        for team in teams {
            if roster.contains_key(&team.symbol) {
                return Err(EloError::InvalidArgument {
                    name: "teams",
                    reason: format!("duplicate team {}", team.symbol),
                });
            }
            roster.insert(team.symbol.clone(), team);
        }
        let teams = roster;

        for game in &games {
            for symbol in [&game.home_team, &game.away_team] {
                if !teams.contains_key(symbol) {
                    return Err(EloError::UnknownTeam {
                        team: symbol.clone(),
                    });
                }
            }
        }

        games.sort_by_key(|g| g.date);

        Ok(Season {
            year,
            k_factor: K_FACTOR,
            teams,
            games,
            rated_through: 0,
        })
    }

    pub fn with_k_factor(mut self, k_factor: f64) -> Self {
        self.k_factor = k_factor;
        self
    }

    pub fn teams(&self) -> &BTreeMap<String, Team> {
        &self.teams
    }

    pub fn team(&self, symbol: &str) -> Result<&Team> {
        self.teams.get(symbol).ok_or_else(|| EloError::UnknownTeam {
            team: symbol.to_string(),
        })
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// Apply one completed game to both teams' ratings and records.
    fn rate_game(&mut self, idx: usize) -> Result<()> {
        let game = &self.games[idx];
        let Some((home_points, away_points)) = game.score() else {
            return Ok(());
        };

        let home_rating = self.team(&game.home_team)?.current_rating();
        let away_rating = self.team(&game.away_team)?.current_rating();
        let delta = rating_delta(home_rating, away_rating, home_points, away_points, self.k_factor)?;

        let (date, home, away) = (game.date, game.home_team.clone(), game.away_team.clone());
        let home_won = home_points > away_points;

        if let Some(team) = self.teams.get_mut(&home) {
            team.record_result(date, delta.home, home_won);
        }
        if let Some(team) = self.teams.get_mut(&away) {
            team.record_result(date, delta.away, !home_won);
        }
        Ok(())
    }

    /// Replay real results in date order.
    ///
    /// Incomplete games are skipped. Replay stops before the first game dated
    /// after `stop_date`; calling again with a later date continues from there.
    pub fn play_through_season(&mut self, stop_date: Option<NaiveDateTime>) -> Result<()> {
        let start = self.rated_through;

        while self.rated_through < self.games.len() {
            let idx = self.rated_through;
            if stop_date.is_some_and(|stop| self.games[idx].date > stop) {
                break;
            }
            self.rate_game(idx)?;
            self.rated_through += 1;
        }

        debug!(
            year = self.year,
            replayed = self.rated_through - start,
            pending = self.games.len() - self.rated_through,
            "replayed season results"
        );
        Ok(())
    }

    /// Complete every unplayed game by drawing against current ratings.
    ///
    /// Each simulated result is rated before the next game is drawn, so later
    /// draws see the ratings earlier draws produced.
    pub fn simulate_remaining<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        if let Some(game) = self.games[self.rated_through..]
            .iter()
            .find(|g| g.status() == GameStatus::Final)
        {
            return Err(EloError::OutOfOrder { date: game.date });
        }

        for idx in 0..self.games.len() {
            if self.games[idx].is_complete() {
                continue;
            }

            let game = &self.games[idx];
            let home_rating = self.team(&game.home_team)?.current_rating();
            let away_rating = self.team(&game.away_team)?.current_rating();

            self.games[idx] = game.simulate(home_rating, away_rating, rng)?;
            self.rate_game(idx)?;
        }

        self.rated_through = self.games.len();
        Ok(())
    }

    /// A completed copy of this season. `self` is left untouched.
    pub fn simulated<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Season> {
        let mut season = self.clone();
        season.simulate_remaining(rng)?;
        Ok(season)
    }

    pub fn is_season_complete(&self) -> bool {
        self.games.iter().all(Game::is_complete)
    }

    /// Standings from completed games, partitioned by conference.
    pub fn current_standings(&self) -> Standings {
        let mut records: BTreeMap<&str, (u32, u32)> =
            self.teams.keys().map(|symbol| (symbol.as_str(), (0, 0))).collect();

        for game in &self.games {
            let (Some(winner), Some(loser)) = (game.winner(), game.loser()) else {
                continue;
            };
            if let Some(record) = records.get_mut(winner) {
                record.0 += 1;
            }
            if let Some(record) = records.get_mut(loser) {
                record.1 += 1;
            }
        }

        let mut standings = Standings::default();
        for (symbol, record) in records {
            let entry = StandingsEntry {
                team: symbol.to_string(),
                record,
            };
            match self.teams[symbol].conference {
                Conference::West => standings.west.push(entry),
                Conference::East => standings.east.push(entry),
            }
        }

        Standings::sort(&mut standings.west);
        Standings::sort(&mut standings.east);
        standings
    }

    /// Scoring totals per team over real results; simulated games carry no scores worth counting.
    pub fn point_differentials(&self) -> BTreeMap<String, PointDifferential> {
        let mut teams: BTreeMap<String, PointDifferential> = self
            .teams
            .keys()
            .map(|symbol| (symbol.clone(), PointDifferential::default()))
            .collect();

        for game in self.games.iter().filter(|g| g.status() == GameStatus::Final) {
            let Some((home_points, away_points)) = game.score() else {
                continue;
            };
            for (symbol, scored, allowed) in [
                (&game.home_team, home_points, away_points),
                (&game.away_team, away_points, home_points),
            ] {
                if let Some(diff) = teams.get_mut(symbol) {
                    diff.points_scored += scored;
                    diff.points_allowed += allowed;
                    diff.games_played += 1;
                }
            }
        }
        teams
    }

    /// League-wide sum of recorded rating changes; zero up to float error.
    pub fn total_rating_change(&self) -> f64 {
        self.teams.values().map(Team::total_change).sum()
    }

    pub fn first_day(&self) -> Option<NaiveDateTime> {
        self.games.first().map(|g| g.date)
    }

    pub fn last_day(&self) -> Option<NaiveDateTime> {
        self.games.last().map(|g| g.date)
    }

    /// Date of the first unplayed game, or of the final game once all are played.
    pub fn current_season_date(&self) -> Option<NaiveDate> {
        self.games
            .iter()
            .find(|g| !g.is_complete())
            .or(self.games.last())
            .map(|g| g.date.date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 10, 24)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn night(days: i64) -> NaiveDateTime {
        start() + Duration::days(days) + Duration::hours(19)
    }

    fn roster() -> Vec<Team> {
        vec![
            Team::new("LAL", Conference::West, start()),
            Team::new("GSW", Conference::West, start()),
            Team::new("BOS", Conference::East, start()),
            Team::new("CLE", Conference::East, start()),
        ]
    }

    fn schedule() -> Vec<Game> {
        vec![
            // Deliberately out of date order
            Game::played("GSW", "LAL", night(3), 120, 101),
            Game::played("LAL", "BOS", night(1), 99, 104),
            Game::played("CLE", "GSW", night(2), 110, 108),
            Game::scheduled("BOS", "CLE", night(4)),
            Game::scheduled("LAL", "CLE", night(5)),
        ]
    }

    #[test]
    fn test_games_sorted_and_validated() {
        let season = Season::new(2017, roster(), schedule()).unwrap();
        let dates: Vec<_> = season.games().iter().map(|g| g.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);

        let mut games = schedule();
        games.push(Game::scheduled("LAL", "NYK", night(6)));
        let err = Season::new(2017, roster(), games).unwrap_err();
        assert_eq!(err, EloError::UnknownTeam { team: "NYK".to_string() });
    }

    #[test]
    fn test_duplicate_team_rejected() {
        let mut teams = roster();
        teams.push(Team::new("GSW", Conference::East, start()));
        let err = Season::new(2017, teams, schedule()).unwrap_err();
        assert!(matches!(err, EloError::InvalidArgument { name: "teams", .. }));
    }

    #[test]
    fn test_heavy_favorite_win_counts_as_win() {
        let teams = vec![
            Team::new("AAA", Conference::West, start()).with_start_rating(9000.0),
            Team::new("BBB", Conference::West, start()),
        ];
        let games = vec![Game::played("AAA", "BBB", night(1), 110, 100)];
        let mut season = Season::new(2017, teams, games).unwrap();
        season.play_through_season(None).unwrap();

        assert_eq!(season.team("AAA").unwrap().record(), (1, 0));
        assert_eq!(season.team("BBB").unwrap().record(), (0, 1));
        let standings = season.current_standings();
        assert_eq!(standings.west[0].team, "AAA");
        assert_eq!(standings.west[0].record, (1, 0));
    }

    #[test]
    fn test_records_follow_scores_with_large_k_factor() {
        let teams = vec![
            Team::new("AAA", Conference::West, start()),
            Team::new("BBB", Conference::West, start()),
        ];
        let games = (1..=6)
            .map(|day| Game::played("AAA", "BBB", night(day), 130, 100))
            .collect();
        let mut season = Season::new(2017, teams, games).unwrap().with_k_factor(5000.0);
        season.play_through_season(None).unwrap();

        assert_eq!(season.team("AAA").unwrap().record(), (6, 0));
        assert_eq!(season.team("BBB").unwrap().record(), (0, 6));
        for entry in &season.current_standings().west {
            assert_eq!(season.team(&entry.team).unwrap().record(), entry.record);
        }
    }

    #[test]
    fn test_play_through_season_rates_real_results() {
        let mut season = Season::new(2017, roster(), schedule()).unwrap();
        season.play_through_season(None).unwrap();

        assert_eq!(season.team("LAL").unwrap().record(), (0, 2));
        assert_eq!(season.team("GSW").unwrap().record(), (1, 1));
        assert_eq!(season.team("BOS").unwrap().record(), (1, 0));
        assert!(season.team("BOS").unwrap().current_rating() > 1500.0);
        assert!(season.total_rating_change().abs() < 1e-9);
        assert!(!season.is_season_complete());
    }

    #[test]
    fn test_replay_twice_does_not_double_count() {
        let mut once = Season::new(2017, roster(), schedule()).unwrap();
        once.play_through_season(None).unwrap();

        let mut twice = Season::new(2017, roster(), schedule()).unwrap();
        twice.play_through_season(None).unwrap();
        twice.play_through_season(None).unwrap();

        for (symbol, team) in once.teams() {
            assert_eq!(team.current_rating(), twice.team(symbol).unwrap().current_rating());
        }
    }

    #[test]
    fn test_stop_date_then_resume() {
        let mut partial = Season::new(2017, roster(), schedule()).unwrap();
        partial.play_through_season(Some(night(1))).unwrap();
        assert_eq!(partial.team("LAL").unwrap().record(), (0, 1));
        assert_eq!(partial.team("GSW").unwrap().record(), (0, 0));

        // Real results after the stop date must be replayed before simulating
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = partial.simulate_remaining(&mut rng).unwrap_err();
        assert_eq!(err, EloError::OutOfOrder { date: night(2) });

        partial.play_through_season(None).unwrap();
        let mut full = Season::new(2017, roster(), schedule()).unwrap();
        full.play_through_season(None).unwrap();
        for (symbol, team) in full.teams() {
            assert_eq!(team.current_rating(), partial.team(symbol).unwrap().current_rating());
        }
    }

    #[test]
    fn test_simulate_remaining_completes_season() {
        let mut season = Season::new(2017, roster(), schedule()).unwrap();
        season.play_through_season(None).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let simulated = season.simulated(&mut rng).unwrap();

        assert!(simulated.is_season_complete());
        assert!(!season.is_season_complete(), "source season must stay untouched");
        assert_eq!(
            simulated.games().iter().filter(|g| g.status() == GameStatus::Simulated).count(),
            2
        );

        // Simulated results are rated and recorded like real ones
        let games_played: u32 = simulated.teams().values().map(|t| t.wins + t.losses).sum();
        assert_eq!(games_played, 10);
        assert!(simulated.total_rating_change().abs() < 1e-9);
    }

    #[test]
    fn test_standings_order_by_wins_then_losses() {
        let games = vec![
            Game::played("LAL", "BOS", night(1), 100, 90),
            Game::played("GSW", "CLE", night(1), 100, 90),
            Game::played("GSW", "LAL", night(2), 100, 90),
            Game::played("BOS", "CLE", night(3), 100, 90),
            Game::played("LAL", "CLE", night(4), 100, 90),
        ];
        let season = Season::new(2017, roster(), games).unwrap();
        let standings = season.current_standings();

        // LAL 2-1 and GSW 2-0: equal wins, more losses ranks first
        assert_eq!(
            standings.west,
            vec![
                StandingsEntry { team: "LAL".to_string(), record: (2, 1) },
                StandingsEntry { team: "GSW".to_string(), record: (2, 0) },
            ]
        );
        assert_eq!(standings.east[0].team, "BOS");
        assert_eq!(standings.east[1].record, (0, 3));
        assert_eq!(standings.top(Conference::East, 8).len(), 2);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let mut a = Season::new(2017, roster(), schedule()).unwrap();
        let mut b = Season::new(2017, roster(), schedule()).unwrap();
        a.play_through_season(None).unwrap();
        b.play_through_season(None).unwrap();

        assert_eq!(a.current_standings(), b.current_standings());
        for (symbol, team) in a.teams() {
            assert_eq!(team.current_rating(), b.team(symbol).unwrap().current_rating());
        }
    }

    #[test]
    fn test_point_differentials_skip_simulated() {
        let mut season = Season::new(2017, roster(), schedule()).unwrap();
        season.play_through_season(None).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        season.simulate_remaining(&mut rng).unwrap();

        let diffs = season.point_differentials();
        let gsw = &diffs["GSW"];
        assert_eq!(gsw.games_played, 2);
        assert_eq!(gsw.points_scored, 228);
        assert_eq!(gsw.points_allowed, 211);
        assert!((gsw.per_game() - 8.5).abs() < 1e-12);
        assert_eq!(diffs["BOS"].games_played, 1);
    }

    #[test]
    fn test_season_dates() {
        let mut season = Season::new(2017, roster(), schedule()).unwrap();
        assert_eq!(season.first_day(), Some(night(1)));
        assert_eq!(season.last_day(), Some(night(5)));
        assert_eq!(season.current_season_date(), Some(night(4).date()));

        season.play_through_season(None).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        season.simulate_remaining(&mut rng).unwrap();
        assert_eq!(season.current_season_date(), Some(night(5).date()));
    }
}
