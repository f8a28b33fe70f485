/// Rating every team starts the season with
pub const DEFAULT_RATING: f64 = 1500.0;

/// Scale of rating updates per game
pub const K_FACTOR: f64 = 20.0;

/// Largest K factor a configuration may ask for
pub const MAX_K_FACTOR: f64 = 100.0;

/// Rating gap at which the favorite is a 10:1 favorite
pub const ELO_SCALE: f64 = 400.0;

/// Margin of victory multiplier: (margin + OFFSET)^EXPONENT / (BASE + SLOPE * rating_gap)
pub const MARGIN_OFFSET: f64 = 3.0;
pub const MARGIN_EXPONENT: f64 = 0.8;
pub const MULTIPLIER_BASE: f64 = 7.5;
pub const MULTIPLIER_RATING_SLOPE: f64 = 0.0006;

/// Teams per conference that qualify for the playoffs
pub const PLAYOFF_TEAMS: usize = 8;

/// Wins needed to take a best-of-seven series
pub const SERIES_WINS: u32 = 4;

/// Team whose conference is treated as the Western conference
pub const ANCHOR_TEAM: &str = "LAL";

/// Games above which an opponent counts as a conference rival
pub const CROSS_CONFERENCE_GAMES: usize = 2;

/// Number of teams in a full league
pub const LEAGUE_TEAMS: usize = 30;

/// Placeholder scores written into simulated games; only the winner is meaningful
pub const SIMULATED_WINNER_POINTS: u32 = 1;
pub const SIMULATED_LOSER_POINTS: u32 = 0;

/// Monte Carlo trials run when none are configured
pub const DEFAULT_TRIALS: usize = 1000;
