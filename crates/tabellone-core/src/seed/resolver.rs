// Slot token resolution: raw seed token in, display name out. Never fails;
// anything that cannot be resolved yet comes back as a readable placeholder.

use tracing::debug;

use super::cross::CrossBracketLookup;
use super::guard::{ResolveGuard, DEFAULT_MAX_DEPTH};
use super::token::{compact_team_label, SeedToken, UNKNOWN};
use crate::bracket::BYE;
use crate::standings::Standings;

/// Knobs shared by the resolver and the outcome engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Hop budget for nested references.
    pub max_depth: usize,
    /// Apply [`compact_team_label`] to resolved names.
    pub compact_names: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            compact_names: true,
        }
    }
}

/// A resolved slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub name: String,
    /// True when the name is a placeholder rather than a participant (unknown
    /// slot or a reference whose match is not decided yet).
    pub pending: bool,
}

impl Resolution {
    fn known(name: String) -> Self {
        Resolution { name, pending: false }
    }

    fn pending(name: String) -> Self {
        Resolution { name, pending: true }
    }
}

pub struct SlotResolver<'a> {
    standings: &'a dyn Standings,
    cross: Option<&'a dyn CrossBracketLookup>,
    options: EngineOptions,
}

impl<'a> SlotResolver<'a> {
    /// Resolver without cross-bracket support: references always resolve to
    /// their pending placeholder.
    pub fn new(standings: &'a dyn Standings) -> Self {
        SlotResolver {
            standings,
            cross: None,
            options: EngineOptions::default(),
        }
    }

    pub fn with_cross(mut self, cross: &'a dyn CrossBracketLookup) -> Self {
        self.cross = Some(cross);
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Resolve a raw token to a display name.
    pub fn resolve(&self, raw: &str) -> String {
        self.resolve_detailed(raw).name
    }

    pub fn resolve_detailed(&self, raw: &str) -> Resolution {
        let mut guard = ResolveGuard::new(self.options.max_depth);
        self.resolve_with(raw, &mut guard)
    }

    /// Resolve under an existing guard, so hops into other brackets share
    /// one cycle check.
    pub fn resolve_with(&self, raw: &str, guard: &mut ResolveGuard) -> Resolution {
        let mut resolution = self.resolve_token(raw, guard);
        if self.options.compact_names && !resolution.pending {
            resolution.name = compact_team_label(&resolution.name);
        }
        resolution
    }

    fn resolve_token(&self, raw: &str, guard: &mut ResolveGuard) -> Resolution {
        match SeedToken::parse(raw) {
            SeedToken::Unknown => Resolution::pending(UNKNOWN.to_string()),
            SeedToken::Bye => Resolution::known(BYE.to_string()),
            SeedToken::Group { letter, position } => match self.standings.group_position(letter, position) {
                Some(name) => Resolution::known(name),
                None => Resolution::known(raw.trim().to_string()),
            },
            SeedToken::Rank { position } => match self.standings.overall_position(position) {
                Some(name) => Resolution::known(name),
                None => Resolution::known(raw.trim().to_string()),
            },
            SeedToken::Reference { outcome, target } => {
                let placeholder = format!("{} {}", outcome.label(), target);
                let Some(cross) = self.cross else {
                    return Resolution::pending(placeholder);
                };
                if !guard.descend() {
                    return Resolution::pending(placeholder);
                }
                let resolved = match cross.external_resolve(outcome, &target, guard) {
                    Some(base) => self.resolve_token(&base, guard),
                    None => {
                        debug!("reference `{}` is pending", placeholder);
                        Resolution::pending(placeholder)
                    }
                };
                guard.ascend();
                resolved
            }
            SeedToken::Literal(name) => Resolution::known(name),
        }
    }
}
