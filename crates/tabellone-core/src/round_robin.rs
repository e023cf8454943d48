// Round-robin fixture generation, score state and standings.
//
// Fixtures use the circle method: entrant 1 stays put, the others rotate one
// place per round. Odd fields get a dummy entrant 0 whose pairings are dropped.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::bracket::template::{Source, Template};

/// Largest sub-group the group stage builds full round-robin fixtures for.
pub const DEFAULT_GROUP_CAP: usize = 6;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// One pairing. Entrants are 1-based positions in the slot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixture {
    pub round: usize,
    pub home: usize,
    pub away: usize,
}

/// All pairings for `n` entrants in circle-method order.
pub fn fixtures(n: usize) -> Vec<Fixture> {
    if n < 2 {
        return Vec::new();
    }
    let mut ring: Vec<usize> = (1..=n).collect();
    if n % 2 == 1 {
        ring.push(0);
    }
    let size = ring.len();
    let mut out = Vec::with_capacity(n * (n - 1) / 2);

    for round in 1..size {
        for i in 0..size / 2 {
            let (home, away) = (ring[i], ring[size - 1 - i]);
            if home != 0 && away != 0 {
                out.push(Fixture { round, home, away });
            }
        }
        ring[1..].rotate_right(1);
    }
    out
}

/// Fixtures for a group-stage sub-group; only the first `cap` entrants play.
pub fn group_fixtures(n: usize, cap: usize) -> Vec<Fixture> {
    fixtures(n.min(cap))
}

// ---------------------------------------------------------------------------
// Score state
// ---------------------------------------------------------------------------

/// A persisted score. Producers write either JSON numbers or numeric strings;
/// the original form is kept so saving does not rewrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(serde_json::Number),
    Text(String),
}

impl ScoreValue {
    /// Points as a non-negative integer, if the value is numeric.
    pub fn points(&self) -> Option<u32> {
        match self {
            ScoreValue::Number(n) => n
                .as_u64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                        .map(|f| f as u64)
                })
                .and_then(|v| u32::try_from(v).ok()),
            ScoreValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<u32> for ScoreValue {
    fn from(points: u32) -> Self {
        ScoreValue::Number(points.into())
    }
}

/// Score entered for one fixture, `{a, b}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureScore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<ScoreValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<ScoreValue>,
}

impl FixtureScore {
    pub fn new(a: u32, b: u32) -> Self {
        FixtureScore {
            a: Some(a.into()),
            b: Some(b.into()),
        }
    }

    /// Both sides' points, only when both are present and numeric.
    pub fn points(&self) -> Option<(u32, u32)> {
        let a = self.a.as_ref()?.points()?;
        let b = self.b.as_ref()?.points()?;
        Some((a, b))
    }
}

/// Scores keyed by fixture index (template node order). Producers leave
/// `null` holes for fixtures never touched; those are kept so saving writes
/// them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreState(Vec<Option<FixtureScore>>);

impl ScoreState {
    pub fn new() -> Self {
        ScoreState(Vec::new())
    }

    pub fn from_pairs(pairs: &[(u32, u32)]) -> Self {
        ScoreState(pairs.iter().map(|&(a, b)| Some(FixtureScore::new(a, b))).collect())
    }

    pub fn get(&self, index: usize) -> Option<&FixtureScore> {
        self.0.get(index).and_then(Option::as_ref)
    }

    pub fn points(&self, index: usize) -> Option<(u32, u32)> {
        self.get(index).and_then(FixtureScore::points)
    }

    /// Set or clear (`None`) the score for a fixture. Growing the list pads
    /// it with holes.
    pub fn set(&mut self, index: usize, score: Option<(u32, u32)>) {
        if self.0.len() <= index {
            self.0.resize_with(index + 1, || None);
        }
        self.0[index] = Some(match score {
            Some((a, b)) => FixtureScore::new(a, b),
            None => FixtureScore::default(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// One row of a round-robin table.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingRow {
    /// 1-based entry position.
    pub entry: usize,
    pub name: String,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points_for: u32,
    pub points_against: u32,
}

impl StandingRow {
    fn new(entry: usize, name: String) -> Self {
        StandingRow {
            entry,
            name,
            played: 0,
            wins: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
        }
    }

    /// Points scored over points conceded. A side that has conceded nothing
    /// ranks above any finite quotient once it has scored.
    pub fn quotient(&self) -> f64 {
        match (self.points_for, self.points_against) {
            (0, 0) => 0.0,
            (_, 0) => f64::INFINITY,
            (pf, pa) => f64::from(pf) / f64::from(pa),
        }
    }
}

/// Ordered tie-break criteria. Earlier entries dominate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    Wins,
    PointsQuotient,
    PointsFor,
    Name,
}

pub const TIE_BREAKS: [TieBreak; 4] = [
    TieBreak::Wins,
    TieBreak::PointsQuotient,
    TieBreak::PointsFor,
    TieBreak::Name,
];

impl TieBreak {
    fn compare(&self, a: &StandingRow, b: &StandingRow) -> Ordering {
        match self {
            TieBreak::Wins => b.wins.cmp(&a.wins),
            TieBreak::PointsQuotient => b.quotient().total_cmp(&a.quotient()),
            TieBreak::PointsFor => b.points_for.cmp(&a.points_for),
            TieBreak::Name => a.name.cmp(&b.name),
        }
    }
}

fn compare_rows(a: &StandingRow, b: &StandingRow) -> Ordering {
    TIE_BREAKS
        .iter()
        .map(|t| t.compare(a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Build the standings table for a round-robin template.
///
/// `names` holds the resolved display name per entry (index 0 = entry 1).
/// Only fixtures with both scores present count. Level scores count as
/// played with no winner.
pub fn standings_table(template: &Template, names: &[String], scores: &ScoreState) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = (0..template.entry_count())
        .map(|i| StandingRow::new(i + 1, names.get(i).cloned().unwrap_or_default()))
        .collect();

    for (index, node) in template.nodes().iter().enumerate() {
        let Some((score_a, score_b)) = scores.points(index) else {
            continue;
        };
        let [Source::Entry(a), Source::Entry(b)] = &node.sources else {
            continue;
        };
        let (a, b) = (*a, *b);
        if a >= rows.len() || b >= rows.len() {
            continue;
        }

        rows[a].played += 1;
        rows[b].played += 1;
        rows[a].points_for += score_a;
        rows[a].points_against += score_b;
        rows[b].points_for += score_b;
        rows[b].points_against += score_a;
        match score_a.cmp(&score_b) {
            Ordering::Greater => {
                rows[a].wins += 1;
                rows[b].losses += 1;
            }
            Ordering::Less => {
                rows[b].wins += 1;
                rows[a].losses += 1;
            }
            Ordering::Equal => {}
        }
    }

    rows.sort_by(compare_rows);
    rows
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
