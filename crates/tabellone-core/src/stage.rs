// Stage: every bracket of one tournament phase together with its pick and
// score state.
//
// The stage is the only place that mutates results. Evaluation goes through
// an `Evaluator`, which borrows the stage read-only and answers cross-bracket
// references between its brackets.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::bracket::outcome::OutcomeEngine;
use crate::bracket::picks::PickState;
use crate::bracket::template::{Shape, Template};
use crate::bracket::{Bracket, BracketError, Outcome, Side};
use crate::round_robin::{self, ScoreState, StandingRow};
use crate::seed::cross::first_round_token;
use crate::seed::{CrossBracketLookup, EngineOptions, MatchRef, ResolveGuard, SlotResolver};
use crate::snapshot::{ResultState, Snapshot};
use crate::standings::Standings;

pub struct Stage {
    brackets: Vec<Bracket>,
    templates: HashMap<String, Template>,
    results: ResultState,
}

impl Stage {
    /// Build templates for every bracket. Fails on the first bracket whose
    /// kind cannot hold its team count.
    pub fn new(brackets: Vec<Bracket>, results: ResultState, group_cap: usize) -> Result<Stage, BracketError> {
        let mut templates = HashMap::with_capacity(brackets.len());
        for bracket in &brackets {
            let template = Template::for_bracket(bracket, group_cap)?;
            if templates.insert(bracket.id.clone(), template).is_some() {
                warn!("duplicate bracket id '{}'; the last one wins", bracket.id);
            }
        }
        Ok(Stage {
            brackets,
            templates,
            results,
        })
    }

    pub fn from_snapshot(snapshot: Snapshot, group_cap: usize) -> Result<Stage, BracketError> {
        Stage::new(snapshot.brackets, snapshot.results, group_cap)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            brackets: self.brackets.clone(),
            results: self.results.clone(),
        }
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    pub fn results(&self) -> &ResultState {
        &self.results
    }

    pub fn bracket(&self, id: &str) -> Option<&Bracket> {
        self.brackets.iter().rev().find(|b| b.id == id)
    }

    /// First bracket whose title matches, ignoring case.
    pub fn find_by_title(&self, title: &str) -> Option<&Bracket> {
        self.brackets.iter().find(|b| b.title_matches(title))
    }

    pub fn template(&self, id: &str) -> Result<&Template, BracketError> {
        self.templates
            .get(id)
            .ok_or_else(|| BracketError::UnknownBracket(id.to_string()))
    }

    /// Whether results for `id` are entered as scores rather than picks.
    pub fn is_score_driven(&self, id: &str) -> Result<bool, BracketError> {
        self.require(id).map(|b| !b.kind.is_elimination())
    }

    /// Pick state in effect for `id`. Score-driven brackets get theirs
    /// inferred from the entered scores.
    pub fn picks(&self, id: &str) -> Result<Cow<'_, PickState>, BracketError> {
        if self.is_score_driven(id)? {
            let template = self.template(id)?;
            let scores = self.scores(id)?;
            return Ok(Cow::Owned(PickState::from_scores(template, &scores)));
        }
        Ok(self
            .results
            .picks(id)
            .map(Cow::Borrowed)
            .unwrap_or_default())
    }

    pub fn scores(&self, id: &str) -> Result<Cow<'_, ScoreState>, BracketError> {
        self.require(id)?;
        Ok(self
            .results
            .scores(id)
            .map(Cow::Borrowed)
            .unwrap_or_default())
    }

    /// Toggle the pick for `code`. Returns the pick now in effect.
    pub fn toggle_pick(&mut self, id: &str, code: &str, side: Side) -> Result<Option<Side>, BracketError> {
        if self.is_score_driven(id)? {
            return Err(BracketError::ScoreDriven(id.to_string()));
        }
        self.require_match(id, code)?;
        Ok(self.results.picks_mut(id).toggle(code, side))
    }

    /// Drop picks on every match fed by `code`. Returns the cleared codes.
    pub fn clear_downstream(&mut self, id: &str, code: &str) -> Result<Vec<String>, BracketError> {
        if self.is_score_driven(id)? {
            return Err(BracketError::ScoreDriven(id.to_string()));
        }
        self.require_match(id, code)?;
        let template = self
            .templates
            .get(id)
            .ok_or_else(|| BracketError::UnknownBracket(id.to_string()))?;
        let cleared = self.results.picks_mut(id).clear_downstream(template, code);
        if !cleared.is_empty() {
            debug!("cleared {} downstream pick(s) after {} in {}", cleared.len(), code, id);
        }
        Ok(cleared)
    }

    /// Set or clear the score of a fixture (0-based, template order).
    pub fn set_score(&mut self, id: &str, index: usize, score: Option<(u32, u32)>) -> Result<(), BracketError> {
        if !self.is_score_driven(id)? {
            return Err(BracketError::PickDriven(id.to_string()));
        }
        if index >= self.template(id)?.nodes().len() {
            return Err(BracketError::FixtureOutOfRange {
                bracket: id.to_string(),
                index: index + 1,
            });
        }
        self.results.scores_mut(id).set(index, score);
        Ok(())
    }

    /// Read-only evaluation context over this stage.
    pub fn evaluator<'a>(&'a self, standings: &'a dyn Standings, options: EngineOptions) -> Evaluator<'a> {
        Evaluator {
            stage: self,
            standings,
            options,
        }
    }

    fn require(&self, id: &str) -> Result<&Bracket, BracketError> {
        self.bracket(id)
            .ok_or_else(|| BracketError::UnknownBracket(id.to_string()))
    }

    fn require_match(&self, id: &str, code: &str) -> Result<(), BracketError> {
        if self.template(id)?.contains(code) {
            Ok(())
        } else {
            Err(BracketError::UnknownMatch {
                bracket: id.to_string(),
                code: code.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Resolves names and outcomes across all brackets of a stage.
pub struct Evaluator<'a> {
    stage: &'a Stage,
    standings: &'a dyn Standings,
    options: EngineOptions,
}

impl<'a> Evaluator<'a> {
    pub fn stage(&self) -> &Stage {
        self.stage
    }

    /// Slot resolver whose references hop into sibling brackets.
    pub fn resolver(&self) -> SlotResolver<'_> {
        SlotResolver::new(self.standings)
            .with_cross(self)
            .with_options(self.options)
    }

    pub fn resolve(&self, token: &str) -> String {
        self.resolver().resolve(token)
    }

    pub fn engine(&self, id: &str) -> Result<OutcomeEngine<'_>, BracketError> {
        let bracket = self.stage.require(id)?;
        let template = self.stage.template(id)?;
        let picks = self.stage.picks(id)?;
        Ok(OutcomeEngine::new(bracket, template, picks, self.resolver()))
    }

    /// Standings table of a round-robin bracket, best first.
    pub fn standings(&self, id: &str) -> Result<Vec<StandingRow>, BracketError> {
        let template = self.stage.template(id)?;
        if template.shape() != Shape::RoundRobin {
            return Err(BracketError::NoStandings(id.to_string()));
        }
        let engine = self.engine(id)?;
        let names: Vec<String> = (0..template.entry_count()).map(|i| engine.entry_name(i)).collect();
        let scores = self.stage.scores(id)?;
        Ok(round_robin::standings_table(template, &names, &scores))
    }

    /// Refuse a pick for a side whose label is a placeholder (undecided
    /// upstream match, unresolved reference or unknown slot). Toggling off the
    /// side already picked is always allowed.
    pub fn check_pick(&self, id: &str, code: &str, side: Side) -> Result<(), BracketError> {
        if self.stage.is_score_driven(id)? {
            return Err(BracketError::ScoreDriven(id.to_string()));
        }
        let engine = self.engine(id)?;
        if engine.picks().get(code) == Some(side) {
            return Ok(());
        }
        let view = engine.view(code).ok_or_else(|| BracketError::UnknownMatch {
            bracket: id.to_string(),
            code: code.to_string(),
        })?;
        let index = match side {
            Side::A => 0,
            Side::B => 1,
        };
        if view.pending[index] {
            return Err(BracketError::PendingSide {
                bracket: id.to_string(),
                code: code.to_string(),
                side,
                label: view.sides[index].clone(),
            });
        }
        Ok(())
    }

    /// Final placings of a bracket with a final match (see
    /// [`OutcomeEngine::placements`]).
    pub fn placements(&self, id: &str) -> Result<Vec<Option<String>>, BracketError> {
        let engine = self.engine(id)?;
        if engine.template().final_code().is_none() {
            return Err(BracketError::NoStandings(id.to_string()));
        }
        Ok(engine.placements())
    }
}

impl CrossBracketLookup for Evaluator<'_> {
    fn external_resolve(&self, outcome: Outcome, target: &str, guard: &mut ResolveGuard) -> Option<String> {
        let target = MatchRef::parse(target)?;
        let Some(bracket) = self.stage.find_by_title(&target.title) else {
            debug!("no bracket titled '{}'", target.title);
            return None;
        };

        // Elimination first-round codes hand back the seed token itself.
        if bracket.kind.is_elimination() && target.first_round.is_some() {
            return first_round_token(&self.stage.brackets, &self.stage.results.winners_by_id, outcome, &target);
        }

        let engine = self.engine(&bracket.id).ok()?;
        if !engine.template().contains(&target.code) {
            debug!("bracket '{}' has no match {}", bracket.title, target.code);
            return None;
        }
        engine
            .outcome_with(&target.code, outcome, guard)
            .filter(|r| !r.pending && !r.name.is_empty())
            .map(|r| r.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketKind, SeedPair};
    use crate::round_robin::DEFAULT_GROUP_CAP;
    use crate::standings::StaticStandings;

    fn standings() -> StaticStandings {
        let mut s = StaticStandings::default();
        s.set_group('A', vec!["Rossi/Bianchi".into(), "Verdi/Neri".into()]);
        s.set_group('B', vec!["Gialli/Blu".into(), "Rosa/Viola".into()]);
        s
    }

    fn stage() -> Stage {
        let mut oro = Bracket::new("oro", "Oro", BracketKind::SingleElim, 4);
        oro.r1 = vec![SeedPair::new("A1", "B2"), SeedPair::new("B1", "A2")];
        let mut argento = Bracket::new("arg", "Argento", BracketKind::SingleElim, 2);
        argento.r1 = vec![SeedPair::new("Loser Oro R1", "Loser Oro Z1")];
        let mut girone = Bracket::new("rr", "Girone", BracketKind::RoundRobin, 3);
        girone.slots = vec!["A1".into(), "B1".into(), "Winner Oro THIRD".into()];
        Stage::new(vec![oro, argento, girone], ResultState::default(), DEFAULT_GROUP_CAP).unwrap()
    }

    #[test]
    fn rejects_bad_team_counts() {
        let bad = Bracket::new("de", "Doppia", BracketKind::DoubleElim, 4);
        let err = Stage::new(vec![bad], ResultState::default(), DEFAULT_GROUP_CAP).err();
        assert_eq!(
            err,
            Some(BracketError::InvalidTeamCount {
                kind: BracketKind::DoubleElim,
                count: 4
            })
        );
    }

    #[test]
    fn picks_are_checked_against_the_template() {
        let mut stage = stage();
        assert_eq!(stage.toggle_pick("oro", "R1", Side::A), Ok(Some(Side::A)));
        assert_eq!(stage.toggle_pick("oro", "R1", Side::A), Ok(None));
        assert_eq!(
            stage.toggle_pick("oro", "Q7", Side::A),
            Err(BracketError::UnknownMatch {
                bracket: "oro".into(),
                code: "Q7".into()
            })
        );
        assert_eq!(
            stage.toggle_pick("nope", "R1", Side::A),
            Err(BracketError::UnknownBracket("nope".into()))
        );
        assert_eq!(
            stage.toggle_pick("rr", "R1", Side::A),
            Err(BracketError::ScoreDriven("rr".into()))
        );
    }

    #[test]
    fn scores_only_on_score_driven_brackets() {
        let mut stage = stage();
        assert_eq!(stage.set_score("oro", 0, Some((21, 10))), Err(BracketError::PickDriven("oro".into())));
        assert_eq!(
            stage.set_score("rr", 3, Some((21, 10))),
            Err(BracketError::FixtureOutOfRange {
                bracket: "rr".into(),
                index: 4
            })
        );
        stage.set_score("rr", 1, Some((21, 10))).unwrap();
        assert_eq!(stage.scores("rr").unwrap().points(1), Some((21, 10)));
        assert_eq!(stage.picks("rr").unwrap().len(), 1);
    }

    #[test]
    fn clear_downstream_drops_dependent_picks() {
        let mut stage = stage();
        for (code, side) in [("R1", Side::A), ("R2", Side::A), ("Z1", Side::B), ("THIRD", Side::A)] {
            stage.toggle_pick("oro", code, side).unwrap();
        }
        let mut cleared = stage.clear_downstream("oro", "R1").unwrap();
        cleared.sort();
        assert_eq!(cleared, vec!["THIRD", "Z1"]);
        assert_eq!(stage.picks("oro").unwrap().len(), 2);
    }

    #[test]
    fn first_round_reference_takes_seed_token() {
        let mut stage = stage();
        stage.toggle_pick("oro", "R1", Side::A).unwrap();
        let s = standings();
        let eval = stage.evaluator(&s, EngineOptions::default());
        // loser of R1 is the B2 seed
        assert_eq!(eval.engine("arg").unwrap().sides("R1").unwrap()[0], "Rosa/Viola");
        assert_eq!(eval.resolve("Winner Oro M1"), "Rossi/Bianchi");
    }

    #[test]
    fn derived_reference_evaluates_target_engine() {
        let mut stage = stage();
        for (code, side) in [("R1", Side::A), ("R2", Side::B), ("Z1", Side::A)] {
            stage.toggle_pick("oro", code, side).unwrap();
        }
        let s = standings();
        let eval = stage.evaluator(&s, EngineOptions::default());
        let sides = eval.engine("arg").unwrap().sides("R1").unwrap();
        assert_eq!(sides, ["Rosa/Viola".to_string(), "Verdi/Neri".to_string()]);
    }

    #[test]
    fn undecided_reference_stays_pending() {
        let stage = stage();
        let s = standings();
        let eval = stage.evaluator(&s, EngineOptions::default());
        let view = eval.engine("arg").unwrap().evaluate();
        assert_eq!(view[0].sides, ["Loser Oro R1".to_string(), "Loser Oro Z1".to_string()]);
        assert_eq!(view[0].pending, [true, true]);
        assert_eq!(eval.resolve("Winner Bronzo R1"), "Winner Bronzo R1");
    }

    #[test]
    fn picks_wait_for_decided_sides() {
        let mut stage = stage();
        let s = standings();
        stage.toggle_pick("oro", "R1", Side::A).unwrap();
        {
            let eval = stage.evaluator(&s, EngineOptions::default());
            assert_eq!(eval.check_pick("oro", "Z1", Side::A), Ok(()));
            assert_eq!(
                eval.check_pick("oro", "Z1", Side::B),
                Err(BracketError::PendingSide {
                    bracket: "oro".into(),
                    code: "Z1".into(),
                    side: Side::B,
                    label: "Winner R2 — Oro".into(),
                })
            );
            // seeded from a match in another bracket that is not decided yet
            assert!(matches!(
                eval.check_pick("arg", "R1", Side::B),
                Err(BracketError::PendingSide { .. })
            ));
            assert_eq!(eval.check_pick("rr", "R1", Side::A), Err(BracketError::ScoreDriven("rr".into())));
            assert!(matches!(
                eval.check_pick("oro", "Q7", Side::A),
                Err(BracketError::UnknownMatch { .. })
            ));
        }

        stage.toggle_pick("oro", "R2", Side::A).unwrap();
        stage.toggle_pick("oro", "Z1", Side::B).unwrap();
        stage.toggle_pick("oro", "R2", Side::A).unwrap();
        // R2 is open again, but the standing Z1 pick can still be cleared
        let eval = stage.evaluator(&s, EngineOptions::default());
        assert_eq!(eval.check_pick("oro", "Z1", Side::B), Ok(()));
        assert!(eval.check_pick("oro", "Z1", Side::A).is_ok());
    }

    #[test]
    fn standings_use_resolved_names() {
        let mut stage = stage();
        stage.set_score("rr", 0, Some((21, 15))).unwrap();
        let s = standings();
        let eval = stage.evaluator(&s, EngineOptions::default());
        let table = eval.standings("rr").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[0].wins, 1);
        assert!(table.iter().any(|r| r.name == "Gialli/Blu"));
        assert!(table.iter().any(|r| r.name == "Winner Oro THIRD"));
        assert_eq!(eval.standings("oro"), Err(BracketError::NoStandings("oro".into())));
    }
}
