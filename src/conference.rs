use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use crate::constants::{ANCHOR_TEAM, CROSS_CONFERENCE_GAMES};
use crate::error::{EloError, Result};
use crate::game::Game;

/// One of the two halves of the league.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Conference {
    West,
    East,
}

impl fmt::Display for Conference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conference::West => write!(f, "West"),
            Conference::East => write!(f, "East"),
        }
    }
}

impl FromStr for Conference {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "west" | "western" => Ok(Conference::West),
            "east" | "eastern" => Ok(Conference::East),
            _ => Err(()),
        }
    }
}

/// Every team on a schedule, split into two non-empty, disjoint conferences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConferenceSplit {
    west: BTreeSet<String>,
    east: BTreeSet<String>,
}

impl ConferenceSplit {
    pub fn new(west: BTreeSet<String>, east: BTreeSet<String>) -> Result<Self> {
        if west.is_empty() || east.is_empty() {
            return Err(EloError::DegeneratePartition {
                west: west.len(),
                east: east.len(),
            });
        }
        if let Some(team) = west.intersection(&east).next() {
            return Err(EloError::InvalidArgument {
                name: "conferences",
                reason: format!("{} is in both conferences", team),
            });
        }
        Ok(ConferenceSplit { west, east })
    }

    pub fn conference_of(&self, team: &str) -> Option<Conference> {
        if self.west.contains(team) {
            Some(Conference::West)
        } else if self.east.contains(team) {
            Some(Conference::East)
        } else {
            None
        }
    }

    pub fn teams(&self, conference: Conference) -> &BTreeSet<String> {
        match conference {
            Conference::West => &self.west,
            Conference::East => &self.east,
        }
    }

    pub fn len(&self) -> usize {
        self.west.len() + self.east.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assigns every team on a schedule to a conference.
pub trait ConferenceClassifier {
    fn classify(&self, games: &[Game]) -> Result<ConferenceSplit>;
}

/// All team ids appearing on a schedule.
pub fn schedule_teams(games: &[Game]) -> BTreeSet<String> {
    games
        .iter()
        .flat_map(|g| [g.home_team.clone(), g.away_team.clone()])
        .collect()
}

/// Infers conferences from how often teams meet.
///
/// Conference rivals meet three or four times a season and teams from the
/// other conference meet twice. Counting each team's appearances in one seed
/// team's schedule therefore separates the seed's conference from the other.
/// The anchor team decides which group is the West.
///
/// Schedules that do not follow this shape (lockouts, partial seasons) can
/// misclassify teams without any error.
#[derive(Clone, Debug)]
pub struct ScheduleFrequencyClassifier {
    anchor: String,
}

impl ScheduleFrequencyClassifier {
    pub fn new(anchor: &str) -> Self {
        ScheduleFrequencyClassifier {
            anchor: anchor.to_string(),
        }
    }
}

impl Default for ScheduleFrequencyClassifier {
    fn default() -> Self {
        ScheduleFrequencyClassifier::new(ANCHOR_TEAM)
    }
}

impl ConferenceClassifier for ScheduleFrequencyClassifier {
    fn classify(&self, games: &[Game]) -> Result<ConferenceSplit> {
        let teams = schedule_teams(games);
        let anchor_present = teams.contains(&self.anchor);

        let seed = if anchor_present {
            self.anchor.clone()
        } else {
            games
                .iter()
                .min_by_key(|g| g.date)
                .map(|g| g.home_team.clone())
                .ok_or(EloError::DegeneratePartition { west: 0, east: 0 })?
        };

        let mut appearances: HashMap<&str, usize> = HashMap::new();
        for game in games.iter().filter(|g| g.involves(&seed)) {
            *appearances.entry(game.home_team.as_str()).or_insert(0) += 1;
            *appearances.entry(game.away_team.as_str()).or_insert(0) += 1;
        }

        let (rivals, others): (BTreeSet<String>, BTreeSet<String>) = teams
            .into_iter()
            .partition(|team| {
                appearances.get(team.as_str()).copied().unwrap_or(0) > CROSS_CONFERENCE_GAMES
            });

        if !anchor_present {
            warn!(
                anchor = %self.anchor,
                seed = %seed,
                "anchor team missing from schedule, treating the seed team's conference as the West"
            );
        }

        ConferenceSplit::new(rivals, others)
    }
}

/// Explicit team to conference assignments.
///
/// Table lines have the form `team,conference`, e.g. `LAL,West`.
#[derive(Clone, Debug, Default)]
pub struct ConferenceTable {
    assignments: HashMap<String, Conference>,
}

impl ConferenceTable {
    pub fn new() -> Self {
        ConferenceTable {
            assignments: HashMap::new(),
        }
    }

    /// Read assignments from a file.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let io_error = |e: std::io::Error| EloError::TableIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let reader = BufReader::new(File::open(path).map_err(io_error)?);
        let lines = reader
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(io_error)?;
        Self::parse(lines.iter().map(String::as_str))
    }

    /// Parse assignments from table lines, skipping blank ones.
    pub fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut table = ConferenceTable::new();

        for (idx, raw) in lines.into_iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let malformed = || EloError::MalformedTable {
                line: idx + 1,
                content: raw.to_string(),
            };

            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() != 2 {
                return Err(malformed());
            }
            let conference = parts[1].parse::<Conference>().map_err(|_| malformed())?;
            table.insert(parts[0].trim(), conference);
        }

        Ok(table)
    }

    /// Add or replace a team's assignment.
    pub fn insert(&mut self, team: &str, conference: Conference) {
        self.assignments.insert(team.to_string(), conference);
    }

    pub fn get(&self, team: &str) -> Option<Conference> {
        self.assignments.get(team).copied()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl ConferenceClassifier for ConferenceTable {
    fn classify(&self, games: &[Game]) -> Result<ConferenceSplit> {
        let mut west = BTreeSet::new();
        let mut east = BTreeSet::new();

        for team in schedule_teams(games) {
            match self.get(&team) {
                Some(Conference::West) => west.insert(team),
                Some(Conference::East) => east.insert(team),
                None => return Err(EloError::UnknownTeam { team }),
            };
        }

        ConferenceSplit::new(west, east)
    }
}
