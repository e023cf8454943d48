// Cross-bracket references: `<Winner|Loser> <Bracket Title> <Code>`.

use std::collections::BTreeMap;

use super::guard::ResolveGuard;
use super::token::SeedToken;
use crate::bracket::picks::PickState;
use crate::bracket::{Bracket, Outcome, Side};

/// Letters producers have used for numbered first-round matches. All of them
/// address the `R` namespace.
const FIRST_ROUND_LETTERS: [char; 5] = ['R', 'M', 'G', 'S', 'F'];

/// Target part of a reference, split into bracket title and match code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRef {
    pub title: String,
    /// Normalized code: `M3`, `g3`, `S3`, `F3` all become `R3`; other codes
    /// are upper-cased.
    pub code: String,
    /// 1-based first-round match number when the code is in the `R` namespace.
    pub first_round: Option<usize>,
}

impl MatchRef {
    /// Split `"Gold Cup R2"` into title `"Gold Cup"` and code `"R2"`. The code
    /// is the last whitespace-separated word; the title must be non-empty.
    pub fn parse(target: &str) -> Option<MatchRef> {
        let (title, code) = target.trim().rsplit_once(char::is_whitespace)?;
        let title = title.trim();
        if title.is_empty() || code.is_empty() {
            return None;
        }
        let (code, first_round) = normalize_code(code);
        Some(MatchRef {
            title: title.to_string(),
            code,
            first_round,
        })
    }
}

fn normalize_code(code: &str) -> (String, Option<usize>) {
    let upper = code.to_ascii_uppercase();
    let mut chars = upper.chars();
    if let Some(letter) = chars.next() {
        let digits = chars.as_str();
        if FIRST_ROUND_LETTERS.contains(&letter)
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
        {
            if let Ok(number) = digits.parse::<usize>() {
                return (format!("R{number}"), Some(number));
            }
        }
    }
    (upper, None)
}

/// Something that can answer cross-bracket references.
///
/// Returns a *base token* for the resolver to resolve further, or `None` when
/// the reference is pending (unknown title, missing match, no pick yet, or a
/// cycle caught by `guard`).
pub trait CrossBracketLookup {
    fn external_resolve(&self, outcome: Outcome, target: &str, guard: &mut ResolveGuard) -> Option<String>;
}

/// Look up a first-round reference against sibling brackets and their pick
/// state (keyed by bracket id). Returns the winning or losing seed token.
pub fn external_resolve(
    brackets: &[Bracket],
    winners: &BTreeMap<String, PickState>,
    token: &str,
) -> Option<String> {
    let SeedToken::Reference { outcome, target } = SeedToken::parse(token) else {
        return None;
    };
    let target = MatchRef::parse(&target)?;
    first_round_token(brackets, winners, outcome, &target)
}

pub(crate) fn first_round_token(
    brackets: &[Bracket],
    winners: &BTreeMap<String, PickState>,
    outcome: Outcome,
    target: &MatchRef,
) -> Option<String> {
    let number = target.first_round?;
    let bracket = brackets.iter().find(|b| b.title_matches(&target.title))?;
    let (a, b) = bracket.first_round_pair(number)?;
    let picked = winners.get(&bracket.id)?.get(&target.code)?;
    let side = match outcome {
        Outcome::Winner => picked,
        Outcome::Loser => picked.other(),
    };
    let token = match side {
        Side::A => a,
        Side::B => b,
    };
    Some(token.to_string())
}
