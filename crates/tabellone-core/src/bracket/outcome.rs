// Outcome engine: winner/loser of any match, derived on demand from the
// template, the pick state and the slot resolver.
//
// Evaluation is lazy and recursive. A derived match only evaluates the source
// its pick points at, so reading one match costs O(bracket depth).

use std::borrow::Cow;

use super::picks::PickState;
use super::template::{MatchNode, Phase, Source, Template};
use super::{Bracket, Outcome, Side};
use crate::round_robin::ScoreState;
use crate::seed::{ResolveGuard, Resolution, SlotResolver};

/// Everything a caller needs to render one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchView {
    pub code: String,
    pub round: usize,
    pub phase: Phase,
    /// Side labels: participant names or pending placeholders.
    pub sides: [String; 2],
    /// Per side, whether the label is a placeholder. Callers should not let
    /// a pending side be picked.
    pub pending: [bool; 2],
    pub pick: Option<Side>,
    pub winner: Option<String>,
    pub loser: Option<String>,
}

pub struct OutcomeEngine<'a> {
    bracket: &'a Bracket,
    template: &'a Template,
    picks: Cow<'a, PickState>,
    resolver: SlotResolver<'a>,
}

impl<'a> OutcomeEngine<'a> {
    pub fn new(
        bracket: &'a Bracket,
        template: &'a Template,
        picks: Cow<'a, PickState>,
        resolver: SlotResolver<'a>,
    ) -> Self {
        OutcomeEngine {
            bracket,
            template,
            picks,
            resolver,
        }
    }

    /// Engine for a score-driven bracket (round robin, pool of four): picks
    /// are inferred from `scores`.
    pub fn scored(
        bracket: &'a Bracket,
        template: &'a Template,
        scores: &ScoreState,
        resolver: SlotResolver<'a>,
    ) -> Self {
        let picks = PickState::from_scores(template, scores);
        OutcomeEngine::new(bracket, template, Cow::Owned(picks), resolver)
    }

    pub fn bracket(&self) -> &Bracket {
        self.bracket
    }

    pub fn template(&self) -> &Template {
        self.template
    }

    pub fn picks(&self) -> &PickState {
        &self.picks
    }

    /// Display name for a 0-based entry position.
    pub fn entry_name(&self, entry: usize) -> String {
        self.resolver.resolve(self.bracket.entry_token(entry))
    }

    /// Winner of `code`, or `""` while undecided.
    pub fn winner_of(&self, code: &str) -> String {
        let mut guard = self.fresh_guard();
        self.winner_with(code, &mut guard)
    }

    /// Loser of `code`, or `""` while undecided.
    pub fn loser_of(&self, code: &str) -> String {
        let mut guard = self.fresh_guard();
        self.loser_with(code, &mut guard)
    }

    pub fn winner_with(&self, code: &str, guard: &mut ResolveGuard) -> String {
        self.outcome_with(code, Outcome::Winner, guard)
            .map(|r| r.name)
            .unwrap_or_default()
    }

    pub fn loser_with(&self, code: &str, guard: &mut ResolveGuard) -> String {
        self.outcome_with(code, Outcome::Loser, guard)
            .map(|r| r.name)
            .unwrap_or_default()
    }

    /// Both side labels for `code`; `None` if the template has no such match.
    pub fn sides(&self, code: &str) -> Option<[String; 2]> {
        let node = self.template.node(code)?;
        let mut guard = self.fresh_guard();
        let [a, b] = self.node_sides(node, &mut guard);
        Some([a.name, b.name])
    }

    /// Render every match in template order.
    pub fn evaluate(&self) -> Vec<MatchView> {
        self.template.nodes().iter().map(|node| self.node_view(node)).collect()
    }

    /// Render one match; `None` if the template has no such match.
    pub fn view(&self, code: &str) -> Option<MatchView> {
        self.template.node(code).map(|node| self.node_view(node))
    }

    fn node_view(&self, node: &MatchNode) -> MatchView {
        let mut guard = self.fresh_guard();
        let [a, b] = self.node_sides(node, &mut guard);
        let pick = self.picks.get(&node.code);
        let (winner, loser) = match pick {
            Some(Side::A) => (Some(a.name.clone()), Some(b.name.clone())),
            Some(Side::B) => (Some(b.name.clone()), Some(a.name.clone())),
            None => (None, None),
        };
        MatchView {
            code: node.code.clone(),
            round: node.round,
            phase: node.phase,
            pending: [a.pending, b.pending],
            sides: [a.name, b.name],
            pick,
            winner,
            loser,
        }
    }

    /// Final placings: champion, runner-up, then winner and loser of the
    /// third-place (or consolation) match. `None` while undecided or still a
    /// placeholder. Empty for templates without a final.
    pub fn placements(&self) -> Vec<Option<String>> {
        let Some(final_code) = self.template.final_code() else {
            return Vec::new();
        };
        let mut codes = vec![final_code];
        if let Some(third) = self
            .template
            .nodes()
            .iter()
            .find(|n| matches!(n.phase, Phase::ThirdPlace | Phase::Consolation))
        {
            codes.push(&third.code);
        }
        codes
            .into_iter()
            .flat_map(|code| [(code, Outcome::Winner), (code, Outcome::Loser)])
            .map(|(code, outcome)| {
                let mut guard = self.fresh_guard();
                self.outcome_with(code, outcome, &mut guard)
                    .filter(|r| !r.pending)
                    .map(|r| r.name)
            })
            .collect()
    }

    fn fresh_guard(&self) -> ResolveGuard {
        ResolveGuard::new(self.resolver.options().max_depth)
    }

    /// Winner or loser of `code` with its pending flag. `None` when the match
    /// is unknown, unpicked, or already being evaluated higher up in `guard`.
    pub fn outcome_with(&self, code: &str, outcome: Outcome, guard: &mut ResolveGuard) -> Option<Resolution> {
        let picked = self.picks.get(code)?;
        let node = self.template.node(code)?;
        if !guard.enter_match(&self.bracket.id, code) {
            return None;
        }
        let side = match outcome {
            Outcome::Winner => picked,
            Outcome::Loser => picked.other(),
        };
        let source = match side {
            Side::A => &node.sources[0],
            Side::B => &node.sources[1],
        };
        let label = self.source_label(source, guard);
        guard.leave_match(&self.bracket.id, code);
        Some(label)
    }

    fn node_sides(&self, node: &MatchNode, guard: &mut ResolveGuard) -> [Resolution; 2] {
        [
            self.source_label(&node.sources[0], guard),
            self.source_label(&node.sources[1], guard),
        ]
    }

    fn source_label(&self, source: &Source, guard: &mut ResolveGuard) -> Resolution {
        match source {
            Source::Entry(entry) => self.resolver.resolve_with(self.bracket.entry_token(*entry), guard),
            Source::Result { from, outcome } => match self.outcome_with(from, *outcome, guard) {
                Some(resolution) if !resolution.name.is_empty() => resolution,
                _ => Resolution {
                    name: format!("{} {} — {}", outcome.label(), from, self.bracket.title),
                    pending: true,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketKind, SeedPair};
    use crate::standings::StaticStandings;

    fn standings() -> StaticStandings {
        let mut s = StaticStandings::default();
        s.set_group('A', vec!["Rossi/Bianchi".into(), "Verdi/Neri".into()]);
        s.set_group('B', vec!["Gialli/Blu".into(), "Rosa/Viola".into()]);
        s
    }

    fn five_team_bracket() -> Bracket {
        let mut bracket = Bracket::new("oro", "Oro", BracketKind::SingleElim, 5);
        bracket.r1 = vec![
            SeedPair::new("A1", "BYE"),
            SeedPair::new("B2", "A2"),
            SeedPair::new("B1", ""),
        ];
        bracket
    }

    #[test]
    fn leaf_winner_follows_pick() {
        let s = standings();
        let bracket = five_team_bracket();
        let template = Template::build(bracket.kind, bracket.n_teams).unwrap();
        let picks = PickState::from([("R2", Side::B)]);
        let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));

        assert_eq!(engine.winner_of("R2"), "Verdi/Neri");
        assert_eq!(engine.loser_of("R2"), "Rosa/Viola");
        assert_eq!(engine.winner_of("R1"), "");
        assert_eq!(engine.loser_of("R1"), "");
    }

    #[test]
    fn unfilled_entries_become_byes() {
        let s = standings();
        let bracket = five_team_bracket();
        let template = Template::build(bracket.kind, bracket.n_teams).unwrap();
        let picks = PickState::new();
        let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));
        assert_eq!(engine.sides("R3").unwrap(), ["Gialli/Blu".to_string(), "BYE".to_string()]);
        assert_eq!(engine.sides("R4").unwrap(), ["BYE".to_string(), "BYE".to_string()]);
        assert_eq!(engine.sides("Q9"), None);
    }

    #[test]
    fn derived_sides_use_placeholders_until_picked() {
        let s = standings();
        let bracket = five_team_bracket();
        let template = Template::build(bracket.kind, bracket.n_teams).unwrap();
        let mut picks = PickState::from([("R1", Side::A)]);
        {
            let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));
            assert_eq!(
                engine.sides("Z1").unwrap(),
                ["Rossi/Bianchi".to_string(), "Winner R2 — Oro".to_string()]
            );
            let view = engine.evaluate().into_iter().find(|v| v.code == "Z1").unwrap();
            assert_eq!(view.pending, [false, true]);
            assert_eq!(view.winner, None);
        }

        picks.toggle("R2", Side::A);
        picks.toggle("Z1", Side::B);
        let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));
        assert_eq!(engine.winner_of("Z1"), "Rosa/Viola");
        assert_eq!(engine.loser_of("Z1"), "Rossi/Bianchi");
        assert_eq!(
            engine.sides("THIRD").unwrap(),
            ["Rossi/Bianchi".to_string(), "Loser Z2 — Oro".to_string()]
        );
    }

    #[test]
    fn placements_fill_as_matches_finish() {
        let s = standings();
        let mut bracket = Bracket::new("arg", "Argento", BracketKind::SingleElim, 4);
        bracket.r1 = vec![SeedPair::new("A1", "B2"), SeedPair::new("B1", "A2")];
        let template = Template::build(bracket.kind, bracket.n_teams).unwrap();

        let mut picks = PickState::from([("R1", Side::A), ("R2", Side::B)]);
        {
            let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));
            assert_eq!(engine.placements(), vec![None, None, None, None]);
        }
        picks.toggle("Z1", Side::B);
        picks.toggle("THIRD", Side::A);
        let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));
        assert_eq!(
            engine.placements(),
            vec![
                Some("Verdi/Neri".to_string()),
                Some("Rossi/Bianchi".to_string()),
                Some("Rosa/Viola".to_string()),
                Some("Gialli/Blu".to_string()),
            ]
        );
    }

    #[test]
    fn double_elim_lower_bracket_flow() {
        let s = StaticStandings::default();
        let mut bracket = Bracket::new("de", "Doppia", BracketKind::DoubleElim, 6);
        bracket.r1 = vec![
            SeedPair::new("Uno", "Sei"),
            SeedPair::new("Tre", "Quattro"),
            SeedPair::new("Due", "Cinque"),
        ];
        let template = Template::build(bracket.kind, bracket.n_teams).unwrap();
        let picks = PickState::from([
            ("R1", Side::A),
            ("R2", Side::A),
            ("R3", Side::A),
            ("R4", Side::A),
            ("Z1", Side::B),
            ("X1", Side::A),
        ]);
        let engine = OutcomeEngine::new(&bracket, &template, Cow::Borrowed(&picks), SlotResolver::new(&s));

        assert_eq!(engine.sides("R4").unwrap(), ["BYE".to_string(), "BYE".to_string()]);
        assert_eq!(engine.winner_of("Z1"), "Tre");
        assert_eq!(engine.winner_of("X1"), "Sei");
        // W1 pairs the X1 winner against the Z1 loser
        assert_eq!(engine.sides("W1").unwrap(), ["Sei".to_string(), "Uno".to_string()]);
        // CO2 waits on Z2 and W1
        assert_eq!(
            engine.sides("CO2").unwrap(),
            ["Winner Z2 — Doppia".to_string(), "Winner W1 — Doppia".to_string()]
        );
    }

    #[test]
    fn pool_of_four_from_scores() {
        let s = StaticStandings::default();
        let mut bracket = Bracket::new("pool", "Pool A", BracketKind::RoundRobin, 4);
        bracket.slots = vec!["Uno".into(), "Due".into(), "Tre".into(), "Quattro".into()];
        let template = Template::pool_of_four();
        let scores = ScoreState::from_pairs(&[(21, 18), (19, 21)]);
        let engine = OutcomeEngine::scored(&bracket, &template, &scores, SlotResolver::new(&s));

        assert_eq!(engine.winner_of("SF1"), "Uno");
        assert_eq!(engine.winner_of("SF2"), "Tre");
        assert_eq!(engine.sides("F").unwrap(), ["Uno".to_string(), "Tre".to_string()]);
        assert_eq!(engine.sides("CONS").unwrap(), ["Quattro".to_string(), "Due".to_string()]);
        assert_eq!(engine.winner_of("F"), "");
        assert_eq!(engine.placements(), vec![None, None, None, None]);
    }
}
