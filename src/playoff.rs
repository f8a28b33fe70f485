use std::collections::BTreeMap;

use rand::Rng;
use serde::Deserialize;
use statrs::distribution::{Binomial, DiscreteCDF};

use crate::conference::Conference;
use crate::constants::{PLAYOFF_TEAMS, SERIES_WINS};
use crate::error::{EloError, Result};
use crate::rating::expected_outcome;
use crate::season::Standings;
use crate::team::Team;

/// When a best-of-seven series stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesPolicy {
    /// Keep playing until both sides have four wins; more wins takes the
    /// series and an even split goes to the lower seed. This matches the
    /// historical projections and can run past seven games.
    #[default]
    BothReachFour,
    /// Conventional rule: first side to four wins.
    FirstToFour,
}

impl SeriesPolicy {
    /// Whether the series winner is settled.
    ///
    /// Under `BothReachFour` the outcome is fixed once the higher seed has five
    /// wins or the lower seed has four; the games still owed cannot change it.
    fn is_over(&self, higher_wins: u32, lower_wins: u32) -> bool {
        match self {
            SeriesPolicy::BothReachFour => higher_wins > SERIES_WINS || lower_wins >= SERIES_WINS,
            SeriesPolicy::FirstToFour => higher_wins >= SERIES_WINS || lower_wins >= SERIES_WINS,
        }
    }
}

/// Probability that the side winning each game with probability `p` takes the series.
///
/// Under `FirstToFour` this is P(X >= 4) for X ~ Binomial(7, p). Under
/// `BothReachFour` the higher seed wins only by reaching five wins before the
/// other side reaches four, which is P(X >= 5) for X ~ Binomial(8, p).
pub fn series_win_probability(p: f64, policy: SeriesPolicy) -> Result<f64> {
    let (games, needed) = match policy {
        SeriesPolicy::FirstToFour => (2 * SERIES_WINS as u64 - 1, SERIES_WINS as u64),
        SeriesPolicy::BothReachFour => (2 * SERIES_WINS as u64, SERIES_WINS as u64 + 1),
    };

    let binomial = Binomial::new(p, games).map_err(|e| EloError::InvalidArgument {
        name: "p",
        reason: e.to_string(),
    })?;
    Ok(1.0 - binomial.cdf(needed - 1))
}

/// A best-of-seven series between two teams.
///
/// The win probability is fixed from the ratings at the start of the series.
#[derive(Clone, Copy, Debug)]
pub struct PlayoffRound<'a> {
    higher_seed: &'a Team,
    lower_seed: &'a Team,
}

impl<'a> PlayoffRound<'a> {
    pub fn new(higher_seed: &'a Team, lower_seed: &'a Team) -> Self {
        PlayoffRound {
            higher_seed,
            lower_seed,
        }
    }

    /// Probability the higher seed wins any single game.
    pub fn game_win_probability(&self) -> f64 {
        expected_outcome(self.higher_seed.current_rating(), self.lower_seed.current_rating())
    }

    pub fn simulate_winner<R: Rng + ?Sized>(&self, policy: SeriesPolicy, rng: &mut R) -> &'a Team {
        let p = self.game_win_probability();
        let (mut higher_wins, mut lower_wins) = (0, 0);

        while !policy.is_over(higher_wins, lower_wins) {
            if rng.gen::<f64>() < p {
                higher_wins += 1;
            } else {
                lower_wins += 1;
            }
        }

        if higher_wins > lower_wins {
            self.higher_seed
        } else {
            self.lower_seed
        }
    }
}

/// Simulates both conference brackets and the final from seeded standings.
pub struct PlayoffSimulator<'a> {
    standings: &'a Standings,
    teams: &'a BTreeMap<String, Team>,
    policy: SeriesPolicy,
}

impl<'a> PlayoffSimulator<'a> {
    pub fn new(
        standings: &'a Standings,
        teams: &'a BTreeMap<String, Team>,
        policy: SeriesPolicy,
    ) -> Self {
        PlayoffSimulator {
            standings,
            teams,
            policy,
        }
    }

    fn seeds(&self, conference: Conference) -> Result<Vec<&'a Team>> {
        let entries = self.standings.conference(conference);
        if entries.len() < PLAYOFF_TEAMS {
            return Err(EloError::InsufficientTeams {
                conference: conference.to_string(),
                found: entries.len(),
                needed: PLAYOFF_TEAMS,
            });
        }

        entries[..PLAYOFF_TEAMS]
            .iter()
            .map(|entry| {
                self.teams.get(&entry.team).ok_or_else(|| EloError::UnknownTeam {
                    team: entry.team.clone(),
                })
            })
            .collect()
    }

    fn series<R: Rng + ?Sized>(&self, higher: &'a Team, lower: &'a Team, rng: &mut R) -> &'a Team {
        PlayoffRound::new(higher, lower).simulate_winner(self.policy, rng)
    }

    /// Play one conference's bracket: 1v8 meets 4v5, 2v7 meets 3v6.
    pub fn simulate_conference<R: Rng + ?Sized>(
        &self,
        conference: Conference,
        rng: &mut R,
    ) -> Result<&'a Team> {
        let seeds = self.seeds(conference)?;

        let w1w8 = self.series(seeds[0], seeds[7], rng);
        let w2w7 = self.series(seeds[1], seeds[6], rng);
        let w3w6 = self.series(seeds[2], seeds[5], rng);
        let w4w5 = self.series(seeds[3], seeds[4], rng);

        let top_half = self.series(w1w8, w4w5, rng);
        let bottom_half = self.series(w2w7, w3w6, rng);
        Ok(self.series(top_half, bottom_half, rng))
    }

    /// Play the full postseason and return the champion.
    pub fn simulate_playoffs<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&'a Team> {
        let west = self.simulate_conference(Conference::West, rng)?;
        let east = self.simulate_conference(Conference::East, rng)?;
        Ok(self.series(west, east, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::StandingsEntry;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn team(symbol: &str, conference: Conference, rating: f64) -> Team {
        let start = NaiveDate::from_ymd_opt(2016, 10, 24)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Team::new(symbol, conference, start).with_start_rating(rating)
    }

    fn make_bracket() -> (Standings, BTreeMap<String, Team>) {
        let mut teams = BTreeMap::new();
        let mut standings = Standings::default();

        for (conference, prefix) in [(Conference::West, "W"), (Conference::East, "E")] {
            for seed in 1..=8 {
                let symbol = format!("{}{}", prefix, seed);
                // Seed 1 is strongest
                let rating = 1800.0 - 50.0 * seed as f64;
                teams.insert(symbol.clone(), team(&symbol, conference, rating));

                let entry = StandingsEntry {
                    team: symbol,
                    record: (60 - seed, 22 + seed),
                };
                match conference {
                    Conference::West => standings.west.push(entry),
                    Conference::East => standings.east.push(entry),
                }
            }
        }
        (standings, teams)
    }

    #[test]
    fn test_first_to_four_stops_at_four() {
        let a = team("A", Conference::West, 1500.0);
        let b = team("B", Conference::West, 1500.0);
        let round = PlayoffRound::new(&a, &b);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut a_wins = 0;
        for _ in 0..4000 {
            if round.simulate_winner(SeriesPolicy::FirstToFour, &mut rng).symbol == "A" {
                a_wins += 1;
            }
        }
        let rate = a_wins as f64 / 4000.0;
        assert!((rate - 0.5).abs() < 0.03, "rate {}", rate);
    }

    #[test]
    fn test_both_reach_four_tracks_closed_form() {
        let a = team("A", Conference::West, 1500.0);
        let b = team("B", Conference::West, 1500.0);
        let round = PlayoffRound::new(&a, &b);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let a_wins = (0..4000)
            .filter(|_| round.simulate_winner(SeriesPolicy::BothReachFour, &mut rng).symbol == "A")
            .count();
        let rate = a_wins as f64 / 4000.0;

        // Even teams: the higher seed needs 5 of the first 8, 93/256
        let expected = series_win_probability(0.5, SeriesPolicy::BothReachFour).unwrap();
        assert!((expected - 93.0 / 256.0).abs() < 1e-9);
        assert!((rate - expected).abs() < 0.03, "rate {} expected {}", rate, expected);
    }

    #[test]
    fn test_strong_team_wins_series_more_than_single_game() {
        let a = team("A", Conference::West, 1700.0);
        let b = team("B", Conference::West, 1300.0);
        let round = PlayoffRound::new(&a, &b);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let a_wins = (0..1000)
            .filter(|_| round.simulate_winner(SeriesPolicy::FirstToFour, &mut rng).symbol == "A")
            .count();
        let rate = a_wins as f64 / 1000.0;

        let single_game = expected_outcome(1700.0, 1300.0);
        let series = series_win_probability(single_game, SeriesPolicy::FirstToFour).unwrap();
        assert!(series > single_game);
        assert!(rate > 0.5);
        assert!((rate - series).abs() < 0.03, "rate {} expected {}", rate, series);
    }

    #[test]
    fn test_lopsided_series_finishes() {
        let a = team("A", Conference::West, 9000.0);
        let b = team("B", Conference::West, 1500.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for policy in [SeriesPolicy::BothReachFour, SeriesPolicy::FirstToFour] {
            assert_eq!(PlayoffRound::new(&a, &b).simulate_winner(policy, &mut rng).symbol, "A");
            assert_eq!(PlayoffRound::new(&b, &a).simulate_winner(policy, &mut rng).symbol, "A");
        }
    }

    #[test]
    fn test_both_reach_four_settles_early() {
        let policy = SeriesPolicy::BothReachFour;
        assert!(!policy.is_over(4, 3));
        assert!(policy.is_over(5, 0));
        assert!(policy.is_over(0, 4));
        assert!(policy.is_over(4, 4));
        assert!(SeriesPolicy::FirstToFour.is_over(4, 0));
    }

    #[test]
    fn test_series_probability_first_to_four_even() {
        let p = series_win_probability(0.5, SeriesPolicy::FirstToFour).unwrap();
        assert!((p - 0.5).abs() < 1e-9);
        assert!(series_win_probability(1.5, SeriesPolicy::FirstToFour).is_err());
    }

    #[test]
    fn test_champion_comes_from_bracket() {
        let (standings, teams) = make_bracket();
        let simulator = PlayoffSimulator::new(&standings, &teams, SeriesPolicy::FirstToFour);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut titles: BTreeMap<String, usize> = BTreeMap::new();
        for _ in 0..500 {
            let champion = simulator.simulate_playoffs(&mut rng).unwrap();
            *titles.entry(champion.symbol.clone()).or_insert(0) += 1;
        }

        assert!(titles.keys().all(|symbol| teams.contains_key(symbol)));
        let top_seeds = titles.get("W1").unwrap_or(&0) + titles.get("E1").unwrap_or(&0);
        let bottom_seeds = titles.get("W8").unwrap_or(&0) + titles.get("E8").unwrap_or(&0);
        assert!(top_seeds > bottom_seeds);
    }

    #[test]
    fn test_same_seed_same_champion() {
        let (standings, teams) = make_bracket();
        let simulator = PlayoffSimulator::new(&standings, &teams, SeriesPolicy::default());

        let a = simulator.simulate_playoffs(&mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        let b = simulator.simulate_playoffs(&mut ChaCha8Rng::seed_from_u64(99)).unwrap();
        assert_eq!(a.symbol, b.symbol);
    }

    #[test]
    fn test_short_conference_rejected() {
        let (mut standings, teams) = make_bracket();
        standings.east.truncate(7);
        let simulator = PlayoffSimulator::new(&standings, &teams, SeriesPolicy::default());

        let err = simulator
            .simulate_playoffs(&mut ChaCha8Rng::seed_from_u64(1))
            .unwrap_err();
        assert_eq!(
            err,
            EloError::InsufficientTeams {
                conference: "East".to_string(),
                found: 7,
                needed: 8
            }
        );
    }
}
