// Bracket data model: the persisted shape of one knockout or round-robin unit.

pub mod outcome;
pub mod picks;
pub mod template;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest single-elimination field we build a template for (five rounds,
/// letters R, Z, Y, X, W).
pub const MAX_SINGLE_ELIM_TEAMS: usize = 32;

/// Largest round-robin field (and group-stage sub-group) we build fixtures for.
pub const MAX_ROUND_ROBIN_TEAMS: usize = 64;

/// Double elimination uses a curated graph that only fits 5 to 8 entrants.
pub const DOUBLE_ELIM_TEAMS: std::ops::RangeInclusive<usize> = 5..=8;

/// Token placed in entry slots that have no entrant.
pub const BYE: &str = "BYE";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("{kind} bracket cannot hold {count} teams")]
    InvalidTeamCount { kind: BracketKind, count: usize },

    #[error("unknown bracket `{0}`")]
    UnknownBracket(String),

    #[error("bracket `{bracket}` has no match `{code}`")]
    UnknownMatch { bracket: String, code: String },

    #[error("bracket `{bracket}` has no fixture #{index}")]
    FixtureOutOfRange { bracket: String, index: usize },

    #[error("bracket `{0}` is score-driven; picks are inferred from scores")]
    ScoreDriven(String),

    #[error("bracket `{0}` is pick-driven; it has no fixture scores")]
    PickDriven(String),

    #[error("bracket `{0}` has no standings table")]
    NoStandings(String),

    #[error("side {side} of {code} in bracket `{bracket}` is still undecided ({label})")]
    PendingSide {
        bracket: String,
        code: String,
        side: Side,
        label: String,
    },
}

// ---------------------------------------------------------------------------
// Enums shared by templates, picks and tokens
// ---------------------------------------------------------------------------

/// Kind of bracket. Accepts the short codes some producers write as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketKind {
    #[serde(alias = "SE", alias = "single")]
    SingleElim,
    #[serde(alias = "DE", alias = "double")]
    DoubleElim,
    #[serde(alias = "ITA", alias = "RR", alias = "roundrobin")]
    RoundRobin,
}

impl BracketKind {
    /// Elimination kinds are seeded through first-round pairs (`r1`),
    /// round robin through a flat slot list.
    pub fn is_elimination(&self) -> bool {
        matches!(self, BracketKind::SingleElim | BracketKind::DoubleElim)
    }
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BracketKind::SingleElim => "single-elimination",
            BracketKind::DoubleElim => "double-elimination",
            BracketKind::RoundRobin => "round-robin",
        };
        f.write_str(s)
    }
}

/// One side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Parse "A"/"B" in either case.
    pub fn from_str_side(s: &str) -> Option<Side> {
        match s.trim() {
            "A" | "a" => Some(Side::A),
            "B" | "b" => Some(Side::B),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Which participant of a finished match a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Winner,
    Loser,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Winner => "Winner",
            Outcome::Loser => "Loser",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Persisted bracket shape
// ---------------------------------------------------------------------------

/// Seed tokens for one first-round match of an elimination bracket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedPair {
    #[serde(rename = "A", default)]
    pub a: String,
    #[serde(rename = "B", default)]
    pub b: String,
}

impl SeedPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        SeedPair {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn token(&self, side: Side) -> &str {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

/// A bracket as the caller persists it:
/// `{id, title, color, type, nTeams, source, r1: [{A,B}], slots: []}`.
///
/// Fields this crate does not interpret are kept in `extra` so a load/save
/// cycle is lossless. `color` and `source` tell an absent key (`None`) from
/// an explicit `null` (`Some(None)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: BracketKind,
    pub n_teams: usize,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub source: Option<Option<String>>,
    #[serde(default)]
    pub r1: Vec<SeedPair>,
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A key that is present maps to `Some`, even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Bracket {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: BracketKind, n_teams: usize) -> Self {
        Bracket {
            id: id.into(),
            title: title.into(),
            color: None,
            kind,
            n_teams,
            source: None,
            r1: Vec::new(),
            slots: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Sub-groups of the group stage are marked with `source: "groups"`.
    /// Their round robin is capped and four-team sub-groups play a pool.
    pub fn is_group_stage(&self) -> bool {
        self.kind == BracketKind::RoundRobin
            && self
                .source()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case("groups") || s.trim().eq_ignore_ascii_case("gironi"))
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_ref()?.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_ref()?.as_deref()
    }

    /// Case-insensitive title comparison used by cross-bracket references.
    pub fn title_matches(&self, title: &str) -> bool {
        self.title.trim().eq_ignore_ascii_case(title.trim())
    }

    /// Raw seed token for a 0-based entry position.
    ///
    /// Elimination brackets read `r1` pairs (entry `2i` is pair `i` side A,
    /// `2i + 1` side B); round robin reads `slots`. Unsupplied positions at
    /// or beyond `n_teams` are byes; unsupplied positions inside the field
    /// are unknown (empty token).
    pub fn entry_token(&self, entry: usize) -> &str {
        let supplied = if self.kind.is_elimination() {
            let side = if entry % 2 == 0 { Side::A } else { Side::B };
            self.r1.get(entry / 2).map(|pair| pair.token(side))
        } else {
            self.slots.get(entry).map(String::as_str)
        };
        match supplied {
            Some(token) if !token.trim().is_empty() => token,
            _ if entry >= self.n_teams => BYE,
            _ => "",
        }
    }

    /// Raw token pair for a 1-based first-round match number, if that match
    /// exists in this bracket's layout.
    pub fn first_round_pair(&self, number: usize) -> Option<(&str, &str)> {
        if number == 0 || !self.kind.is_elimination() {
            return None;
        }
        let matches = match self.kind {
            BracketKind::SingleElim => self.n_teams.max(2).next_power_of_two() / 2,
            _ => 4,
        };
        if number > matches {
            return None;
        }
        let base = (number - 1) * 2;
        Some((self.entry_token(base), self.entry_token(base + 1)))
    }
}
