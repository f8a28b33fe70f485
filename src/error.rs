use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Errors raised by the rating and simulation core.
///
/// Every error is fatal to the call that produced it. Nothing is retried and
/// no partial results are kept.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EloError {
    #[error("game between {home} and {away} on {date} is already complete")]
    AlreadyComplete {
        home: String,
        away: String,
        date: NaiveDateTime,
    },

    #[error("real result on {date} has not been replayed; replay the season before simulating")]
    OutOfOrder { date: NaiveDateTime },

    #[error("tied score {points}-{points} cannot produce a rating change")]
    TiedScore { points: u32 },

    #[error("aggregates require at least one completed trial")]
    NoTrials,

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("{date} falls outside the October-June season")]
    OffSeason { date: NaiveDate },

    #[error("unknown team `{team}`")]
    UnknownTeam { team: String },

    #[error("conference partition is degenerate: {west} western and {east} eastern teams")]
    DegeneratePartition { west: usize, east: usize },

    #[error("{conference} has {found} teams, playoffs need {needed}")]
    InsufficientTeams {
        conference: String,
        found: usize,
        needed: usize,
    },

    #[error("failed to read conference table {path}: {reason}")]
    TableIo { path: String, reason: String },

    #[error("malformed conference table line {line}: {content:?}")]
    MalformedTable { line: usize, content: String },
}

pub type Result<T> = std::result::Result<T, EloError>;
