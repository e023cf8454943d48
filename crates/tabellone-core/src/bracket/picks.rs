// Pick state: which side won each match, keyed by match code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::template::Template;
use super::Side;
use crate::round_robin::ScoreState;

/// Confirmed match outcomes for one bracket (`{matchCode: "A" | "B"}`).
///
/// Only explicit toggles change it; toggling the side already picked clears
/// the pick. Score-driven brackets build one with [`PickState::from_scores`]
/// instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickState(BTreeMap<String, Side>);

impl PickState {
    pub fn new() -> Self {
        PickState(BTreeMap::new())
    }

    pub fn get(&self, code: &str) -> Option<Side> {
        self.0.get(code).copied()
    }

    /// Pick `side` for `code`, or clear it when `side` is already picked.
    /// Returns the pick now in effect.
    pub fn toggle(&mut self, code: &str, side: Side) -> Option<Side> {
        if self.get(code) == Some(side) {
            self.0.remove(code);
            None
        } else {
            self.0.insert(code.to_string(), side);
            Some(side)
        }
    }

    pub fn clear(&mut self, code: &str) -> Option<Side> {
        self.0.remove(code)
    }

    /// Drop every pick downstream of `code`. Returns the cleared codes.
    pub fn clear_downstream(&mut self, template: &Template, code: &str) -> Vec<String> {
        template
            .downstream(code)
            .into_iter()
            .filter_map(|node| self.0.remove(&node.code).map(|_| node.code.clone()))
            .collect()
    }

    /// Infer picks from scores: the side with more points wins, level or
    /// incomplete scores leave the match unpicked. Score index `i` belongs to
    /// the template's `i`-th node.
    pub fn from_scores(template: &Template, scores: &ScoreState) -> Self {
        let mut picks = PickState::new();
        for (index, node) in template.nodes().iter().enumerate() {
            let Some((a, b)) = scores.points(index) else {
                continue;
            };
            if a > b {
                picks.0.insert(node.code.clone(), Side::A);
            } else if b > a {
                picks.0.insert(node.code.clone(), Side::B);
            }
        }
        picks
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Side)> {
        self.0.iter().map(|(code, side)| (code.as_str(), *side))
    }
}

impl fmt::Display for PickState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(code, side)| format!("{code}={side}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl<const N: usize> From<[(&str, Side); N]> for PickState {
    fn from(picks: [(&str, Side); N]) -> Self {
        PickState(picks.into_iter().map(|(c, s)| (c.to_string(), s)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::BracketKind;

    #[test]
    fn toggle_sets_then_clears() {
        let mut picks = PickState::new();
        assert_eq!(picks.toggle("R1", Side::A), Some(Side::A));
        assert_eq!(picks.get("R1"), Some(Side::A));
        assert_eq!(picks.toggle("R1", Side::A), None);
        assert_eq!(picks.get("R1"), None);
    }

    #[test]
    fn toggle_other_side_switches() {
        let mut picks = PickState::from([("R1", Side::A)]);
        assert_eq!(picks.toggle("R1", Side::B), Some(Side::B));
        assert_eq!(picks.get("R1"), Some(Side::B));
    }

    #[test]
    fn toggle_twice_is_identity() {
        let original = PickState::from([("R1", Side::A), ("R2", Side::B)]);
        for code in ["R1", "R2", "Z1"] {
            for side in [Side::A, Side::B] {
                // switching sides is not undone by a second toggle
                if original.get(code).is_some_and(|s| s != side) {
                    continue;
                }
                let mut picks = original.clone();
                picks.toggle(code, side);
                picks.toggle(code, side);
                assert_eq!(picks, original, "toggle {code}/{side}");
            }
        }
    }

    #[test]
    fn serializes_as_plain_map() {
        let picks = PickState::from([("R1", Side::A), ("Z1", Side::B)]);
        let json = serde_json::to_string(&picks).unwrap();
        assert_eq!(json, r#"{"R1":"A","Z1":"B"}"#);
        let back: PickState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, picks);
    }

    #[test]
    fn clear_downstream_removes_dependent_picks() {
        let template = Template::build(BracketKind::SingleElim, 4).unwrap();
        let mut picks = PickState::from([("R1", Side::A), ("R2", Side::B), ("Z1", Side::A), ("THIRD", Side::B)]);
        let mut cleared = picks.clear_downstream(&template, "R1");
        cleared.sort();
        assert_eq!(cleared, vec!["THIRD".to_string(), "Z1".to_string()]);
        assert_eq!(picks.get("R1"), Some(Side::A));
        assert_eq!(picks.get("R2"), Some(Side::B));
    }

    #[test]
    fn inferred_from_scores() {
        let template = Template::build(BracketKind::RoundRobin, 3).unwrap();
        let scores = ScoreState::from_pairs(&[(21, 15), (18, 21), (20, 20)]);
        let picks = PickState::from_scores(&template, &scores);
        assert_eq!(picks.get("R1"), Some(Side::A));
        assert_eq!(picks.get("R2"), Some(Side::B));
        assert_eq!(picks.get("R3"), None);
    }
}
