// Seed token grammar.
//
// A raw slot string is parsed once into a `SeedToken` and the resolver
// dispatches on the variant. Rules are checked in priority order; anything
// that matches no rule is a literal name.

use std::fmt;

use crate::bracket::{Outcome, BYE};

/// Display name for an empty or explicitly unknown slot.
pub const UNKNOWN: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedToken {
    /// `""`, `"-"` or `"—"`.
    Unknown,
    /// `BYE` in any case.
    Bye,
    /// `A1`: group letter and 1-based position in that group's standings.
    Group { letter: char, position: usize },
    /// `3`: 1-based position in the overall ranking.
    Rank { position: usize },
    /// `Winner Oro R1`, `Perdente Argento Z2`, ...: another match's outcome.
    Reference { outcome: Outcome, target: String },
    /// Already a participant name.
    Literal(String),
}

impl SeedToken {
    pub fn parse(raw: &str) -> SeedToken {
        let s = raw.trim();
        if s.is_empty() || s == "-" || s == UNKNOWN {
            return SeedToken::Unknown;
        }
        if s.eq_ignore_ascii_case(BYE) {
            return SeedToken::Bye;
        }
        if let Some((letter, position)) = parse_group(s) {
            return SeedToken::Group { letter, position };
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            // Too many digits for a usize falls through to a literal.
            if let Ok(position) = s.parse() {
                return SeedToken::Rank { position };
            }
        }
        if let Some((outcome, target)) = parse_reference(s) {
            return SeedToken::Reference { outcome, target };
        }
        SeedToken::Literal(s.to_string())
    }

    /// Whether resolving this token needs another bracket's state.
    pub fn is_reference(&self) -> bool {
        matches!(self, SeedToken::Reference { .. })
    }
}

impl fmt::Display for SeedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedToken::Unknown => f.write_str(UNKNOWN),
            SeedToken::Bye => f.write_str(BYE),
            SeedToken::Group { letter, position } => write!(f, "{letter}{position}"),
            SeedToken::Rank { position } => write!(f, "{position}"),
            SeedToken::Reference { outcome, target } => write!(f, "{outcome} {target}"),
            SeedToken::Literal(name) => f.write_str(name),
        }
    }
}

/// One uppercase ASCII letter followed by one or two digits.
fn parse_group(s: &str) -> Option<(char, usize)> {
    let mut chars = s.chars();
    let letter = chars.next().filter(char::is_ascii_uppercase)?;
    let digits = chars.as_str();
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((letter, digits.parse().ok()?))
}

/// Verb (English or Italian, any case), whitespace, then a non-empty target.
fn parse_reference(s: &str) -> Option<(Outcome, String)> {
    let (verb, rest) = s.split_once(char::is_whitespace)?;
    let outcome = match verb.to_lowercase().as_str() {
        "winner" | "vincente" => Outcome::Winner,
        "loser" | "perdente" => Outcome::Loser,
        _ => return None,
    };
    let target = rest.trim();
    if target.is_empty() {
        return None;
    }
    Some((outcome, target.to_string()))
}

/// Shorten a `"FirstA LastA / FirstB LastB"` team label to `"LastA/LastB"`.
///
/// Labels without a slash, or whose halves are already single words, are
/// returned as-is, so the rule is idempotent.
pub fn compact_team_label(name: &str) -> String {
    if !name.contains('/') {
        return name.to_string();
    }
    let halves: Vec<&str> = name.split('/').map(str::trim).collect();
    if halves.iter().any(|h| h.is_empty()) || !halves.iter().any(|h| h.contains(char::is_whitespace)) {
        return name.to_string();
    }
    halves
        .iter()
        .map(|h| h.split_whitespace().last().unwrap_or(*h))
        .collect::<Vec<_>>()
        .join("/")
}
