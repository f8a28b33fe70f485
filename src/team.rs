use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::Peekable;

use chrono::{NaiveDate, NaiveDateTime};

use crate::conference::{Conference, ConferenceClassifier};
use crate::constants::DEFAULT_RATING;
use crate::error::{EloError, Result};
use crate::game::Game;

/// A team's identity, conference, and dated history of rating changes.
///
/// The current rating is always the starting rating plus every recorded delta.
#[derive(Clone, Debug)]
pub struct Team {
    pub symbol: String,
    pub conference: Conference,
    pub start_rating: f64,

    /// Rating change per game date; same-date results accumulate
    rating_changes: BTreeMap<NaiveDateTime, f64>,

    /// Running total of `rating_changes`
    total_change: f64,

    pub wins: u32,
    pub losses: u32,
}

impl Team {
    /// Create a team whose tracking starts at `start_date` with a zero change.
    pub fn new(symbol: &str, conference: Conference, start_date: NaiveDateTime) -> Self {
        let mut rating_changes = BTreeMap::new();
        rating_changes.insert(start_date, 0.0);

        Team {
            symbol: symbol.to_string(),
            conference,
            start_rating: DEFAULT_RATING,
            rating_changes,
            total_change: 0.0,
            wins: 0,
            losses: 0,
        }
    }

    pub fn with_start_rating(mut self, start_rating: f64) -> Self {
        self.start_rating = start_rating;
        self
    }

    /// Record the outcome of one game.
    pub fn record_result(&mut self, date: NaiveDateTime, delta: f64, won: bool) {
        *self.rating_changes.entry(date).or_insert(0.0) += delta;
        self.total_change += delta;
        if won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }

    pub fn current_rating(&self) -> f64 {
        self.start_rating + self.total_change
    }

    /// Total rating change, recomputed from the history.
    pub fn total_change(&self) -> f64 {
        self.rating_changes.values().sum()
    }

    /// Win-loss record as (wins, losses).
    pub fn record(&self) -> (u32, u32) {
        (self.wins, self.losses)
    }

    /// Rating change accumulated over the last `dates` recorded dates.
    pub fn recent_change(&self, dates: usize) -> Result<f64> {
        if dates == 0 {
            return Err(EloError::InvalidArgument {
                name: "dates",
                reason: "must be positive".to_string(),
            });
        }
        Ok(self.rating_changes.values().rev().take(dates).sum())
    }

    pub fn rating_changes(&self) -> &BTreeMap<NaiveDateTime, f64> {
        &self.rating_changes
    }

    /// Day-by-day rating from the first to the last recorded date.
    pub fn rating_history(&self) -> RatingHistory<'_> {
        let mut bounds = self.rating_changes.keys();
        let first = bounds.next().map(NaiveDateTime::date);
        let last = bounds.next_back().map(NaiveDateTime::date).or(first);

        RatingHistory {
            changes: self.rating_changes.iter().peekable(),
            next_day: first,
            last_day: last,
            rating: self.start_rating,
        }
    }

    /// Build a roster for every team on a schedule.
    ///
    /// Conferences come from `classifier`. Each team's tracking starts at
    /// `start_date` with `start_rating`.
    pub fn roster_from_schedule(
        games: &[Game],
        start_date: NaiveDateTime,
        start_rating: f64,
        classifier: &dyn ConferenceClassifier,
    ) -> Result<Vec<Team>> {
        let split = classifier.classify(games)?;

        let mut roster = Vec::with_capacity(split.len());
        for conference in [Conference::West, Conference::East] {
            for symbol in split.teams(conference) {
                roster.push(Team::new(symbol, conference, start_date).with_start_rating(start_rating));
            }
        }
        Ok(roster)
    }
}

/// Iterator over `(day, rating)` for each calendar day of a team's history.
///
/// Days without a game repeat the previous rating. Clone it, or call
/// [`Team::rating_history`] again, to restart.
#[derive(Clone, Debug)]
pub struct RatingHistory<'a> {
    changes: Peekable<btree_map::Iter<'a, NaiveDateTime, f64>>,
    next_day: Option<NaiveDate>,
    last_day: Option<NaiveDate>,
    rating: f64,
}

impl Iterator for RatingHistory<'_> {
    type Item = (NaiveDate, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let day = self.next_day?;
        if Some(day) > self.last_day {
            return None;
        }

        while let Some((_, delta)) = self.changes.next_if(|(date, _)| date.date() <= day) {
            self.rating += delta;
        }

        self.next_day = day.succ_opt();
        Some((day, self.rating))
    }
}
