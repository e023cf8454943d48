// Static bracket topology: match codes, their input slots and which match
// feeds which.
//
// A template depends only on the bracket kind and team count. Seed tokens,
// picks and scores are layered on top by the outcome engine.

use std::collections::VecDeque;

use super::{
    Bracket, BracketError, BracketKind, Outcome, DOUBLE_ELIM_TEAMS, MAX_ROUND_ROBIN_TEAMS, MAX_SINGLE_ELIM_TEAMS,
};
use crate::round_robin;

/// Round letters for single elimination, round 1 first.
const ROUND_LETTERS: [char; 5] = ['R', 'Z', 'Y', 'X', 'W'];

pub const THIRD_PLACE: &str = "THIRD";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where one side of a match comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// 0-based entry position, filled from the bracket's seed tokens.
    Entry(usize),
    /// The winner or loser of another match in the same template.
    Result { from: String, outcome: Outcome },
}

impl Source {
    fn winner(code: impl Into<String>) -> Self {
        Source::Result {
            from: code.into(),
            outcome: Outcome::Winner,
        }
    }

    fn loser(code: impl Into<String>) -> Self {
        Source::Result {
            from: code.into(),
            outcome: Outcome::Loser,
        }
    }
}

/// Which part of the bracket a match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Single-elimination rounds and the double-elimination upper bracket.
    Main,
    /// Double-elimination lower bracket.
    Lower,
    /// Double-elimination crossover between upper and lower survivors.
    Crossover,
    Final,
    ThirdPlace,
    /// Round-robin fixture.
    Fixture,
    /// Pool-of-four semifinal.
    Semifinal,
    /// Pool-of-four match between semifinal losers.
    Consolation,
}

/// The shape a template was built for. `Pool` is the fixed four-entrant
/// sub-group layout, which has no persisted bracket kind of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    SingleElim,
    DoubleElim,
    RoundRobin,
    Pool,
}

impl From<BracketKind> for Shape {
    fn from(kind: BracketKind) -> Self {
        match kind {
            BracketKind::SingleElim => Shape::SingleElim,
            BracketKind::DoubleElim => Shape::DoubleElim,
            BracketKind::RoundRobin => Shape::RoundRobin,
        }
    }
}

/// One node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchNode {
    pub code: String,
    /// 1-based display column (round-robin: 1-based round of the circle).
    pub round: usize,
    pub phase: Phase,
    pub sources: [Source; 2],
}

impl MatchNode {
    fn new(code: impl Into<String>, round: usize, phase: Phase, a: Source, b: Source) -> Self {
        MatchNode {
            code: code.into(),
            round,
            phase,
            sources: [a, b],
        }
    }

    /// A leaf match draws both sides straight from seed tokens.
    pub fn is_leaf(&self) -> bool {
        self.sources.iter().all(|s| matches!(s, Source::Entry(_)))
    }
}

/// Fixed dependency graph for one bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    shape: Shape,
    team_count: usize,
    entries: usize,
    nodes: Vec<MatchNode>,
    final_code: Option<String>,
}

impl Template {
    /// Build the topology for a bracket kind and team count.
    pub fn build(kind: BracketKind, team_count: usize) -> Result<Template, BracketError> {
        let invalid = || BracketError::InvalidTeamCount {
            kind,
            count: team_count,
        };
        match kind {
            BracketKind::SingleElim => {
                if !(2..=MAX_SINGLE_ELIM_TEAMS).contains(&team_count) {
                    return Err(invalid());
                }
                Ok(single_elim(team_count))
            }
            BracketKind::DoubleElim => {
                if !DOUBLE_ELIM_TEAMS.contains(&team_count) {
                    return Err(invalid());
                }
                Ok(double_elim(team_count))
            }
            BracketKind::RoundRobin => {
                if !(2..=MAX_ROUND_ROBIN_TEAMS).contains(&team_count) {
                    return Err(invalid());
                }
                Ok(round_robin_template(team_count, team_count))
            }
        }
    }

    /// Template for a persisted bracket. Group-stage sub-groups of four play
    /// a pool; larger ones a round robin capped at `group_cap` entrants.
    pub fn for_bracket(bracket: &Bracket, group_cap: usize) -> Result<Template, BracketError> {
        if bracket.is_group_stage() {
            if bracket.n_teams == 4 {
                return Ok(Template::pool_of_four());
            }
            return Template::group(bracket.n_teams, group_cap);
        }
        Template::build(bracket.kind, bracket.n_teams)
    }

    /// Round-robin template for a group-stage sub-group. Entrants past `cap`
    /// get no fixtures.
    pub fn group(team_count: usize, cap: usize) -> Result<Template, BracketError> {
        if !(2..=MAX_ROUND_ROBIN_TEAMS).contains(&team_count) {
            return Err(BracketError::InvalidTeamCount {
                kind: BracketKind::RoundRobin,
                count: team_count,
            });
        }
        Ok(round_robin_template(team_count, cap.max(2)))
    }

    /// Four-entrant pool: semifinals 1v4 and 2v3, then a final between the
    /// winners and a consolation match between the losers.
    pub fn pool_of_four() -> Template {
        let nodes = vec![
            MatchNode::new("SF1", 1, Phase::Semifinal, Source::Entry(0), Source::Entry(3)),
            MatchNode::new("SF2", 1, Phase::Semifinal, Source::Entry(1), Source::Entry(2)),
            MatchNode::new("F", 2, Phase::Final, Source::winner("SF1"), Source::winner("SF2")),
            MatchNode::new("CONS", 2, Phase::Consolation, Source::loser("SF1"), Source::loser("SF2")),
        ];
        Template {
            shape: Shape::Pool,
            team_count: 4,
            entries: 4,
            nodes,
            final_code: Some("F".into()),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn team_count(&self) -> usize {
        self.team_count
    }

    /// Number of entry positions the template reads seed tokens for.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Nodes in evaluation order: every node appears after its sources.
    pub fn nodes(&self) -> &[MatchNode] {
        &self.nodes
    }

    pub fn node(&self, code: &str) -> Option<&MatchNode> {
        self.nodes.iter().find(|n| n.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.node(code).is_some()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.code.as_str()).collect()
    }

    /// Code of the match whose winner takes the bracket. Round robin has none.
    pub fn final_code(&self) -> Option<&str> {
        self.final_code.as_deref()
    }

    /// Number of distinct rounds (display columns).
    pub fn rounds(&self) -> usize {
        self.nodes.iter().map(|n| n.round).max().unwrap_or(0)
    }

    /// Matches that consume the outcome of `code`.
    pub fn dependents(&self, code: &str) -> Vec<&MatchNode> {
        self.nodes
            .iter()
            .filter(|n| {
                n.sources
                    .iter()
                    .any(|s| matches!(s, Source::Result { from, .. } if from == code))
            })
            .collect()
    }

    /// All matches downstream of `code`, nearest first. Callers use this to
    /// find picks invalidated when an upstream pick changes.
    pub fn downstream(&self, code: &str) -> Vec<&MatchNode> {
        let mut out: Vec<&MatchNode> = Vec::new();
        let mut frontier = VecDeque::from([code]);
        while let Some(current) = frontier.pop_front() {
            for node in self.dependents(current) {
                if !out.iter().any(|n| n.code == node.code) {
                    frontier.push_back(&node.code);
                    out.push(node);
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn round_code(round: usize, number: usize) -> String {
    format!("{}{}", ROUND_LETTERS[round], number)
}

fn single_elim(team_count: usize) -> Template {
    let slots = team_count.next_power_of_two();
    let rounds = slots.trailing_zeros() as usize;
    let mut nodes = Vec::with_capacity(slots);

    for round in 0..rounds {
        let matches = slots >> (round + 1);
        let phase = if round + 1 == rounds { Phase::Final } else { Phase::Main };
        for number in 1..=matches {
            let (a, b) = if round == 0 {
                let base = (number - 1) * 2;
                (Source::Entry(base), Source::Entry(base + 1))
            } else {
                (
                    Source::winner(round_code(round - 1, number * 2 - 1)),
                    Source::winner(round_code(round - 1, number * 2)),
                )
            };
            nodes.push(MatchNode::new(round_code(round, number), round + 1, phase, a, b));
        }
    }

    if rounds >= 2 {
        let semi = rounds - 2;
        nodes.push(MatchNode::new(
            THIRD_PLACE,
            rounds,
            Phase::ThirdPlace,
            Source::loser(round_code(semi, 1)),
            Source::loser(round_code(semi, 2)),
        ));
    }

    Template {
        shape: Shape::SingleElim,
        team_count,
        entries: slots,
        nodes,
        final_code: Some(round_code(rounds - 1, 1)),
    }
}

/// The curated 8-slot double-elimination graph. The lower bracket and the
/// crossover both pair against the *other* half's upper-bracket team.
fn double_elim(team_count: usize) -> Template {
    let nodes = vec![
        MatchNode::new("R1", 1, Phase::Main, Source::Entry(0), Source::Entry(1)),
        MatchNode::new("R2", 1, Phase::Main, Source::Entry(2), Source::Entry(3)),
        MatchNode::new("R3", 1, Phase::Main, Source::Entry(4), Source::Entry(5)),
        MatchNode::new("R4", 1, Phase::Main, Source::Entry(6), Source::Entry(7)),
        MatchNode::new("Z1", 2, Phase::Main, Source::winner("R1"), Source::winner("R2")),
        MatchNode::new("Z2", 2, Phase::Main, Source::winner("R3"), Source::winner("R4")),
        MatchNode::new("X1", 2, Phase::Lower, Source::loser("R1"), Source::loser("R2")),
        MatchNode::new("X2", 2, Phase::Lower, Source::loser("R3"), Source::loser("R4")),
        MatchNode::new("W1", 3, Phase::Lower, Source::winner("X1"), Source::loser("Z1")),
        MatchNode::new("W2", 3, Phase::Lower, Source::winner("X2"), Source::loser("Z2")),
        MatchNode::new("CO1", 4, Phase::Crossover, Source::winner("Z1"), Source::winner("W2")),
        MatchNode::new("CO2", 4, Phase::Crossover, Source::winner("Z2"), Source::winner("W1")),
        MatchNode::new("F", 5, Phase::Final, Source::winner("CO1"), Source::winner("CO2")),
        MatchNode::new(THIRD_PLACE, 5, Phase::ThirdPlace, Source::loser("CO1"), Source::loser("CO2")),
    ];
    Template {
        shape: Shape::DoubleElim,
        team_count,
        entries: 8,
        nodes,
        final_code: Some("F".into()),
    }
}

fn round_robin_template(team_count: usize, cap: usize) -> Template {
    let nodes = round_robin::group_fixtures(team_count, cap)
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            MatchNode::new(
                format!("R{}", i + 1),
                f.round,
                Phase::Fixture,
                Source::Entry(f.home - 1),
                Source::Entry(f.away - 1),
            )
        })
        .collect();
    Template {
        shape: Shape::RoundRobin,
        team_count,
        entries: team_count,
        nodes,
        final_code: None,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
