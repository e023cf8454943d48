// Recursion guard shared by the resolver, the outcome engine and
// cross-bracket lookups.

use std::collections::HashSet;
use tracing::warn;

pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Tracks the (bracket id, match code) pairs currently being evaluated and
/// the number of nested token references. A revisit or an exhausted hop
/// budget means the lookup is reported as pending instead of recursing.
///
/// Only reference hops (`descend`) count against the budget. Walking down
/// one bracket's own matches is bounded by the visiting set, so a chain of
/// brackets seeded from each other's finals costs one hop per bracket.
#[derive(Debug, Clone)]
pub struct ResolveGuard {
    visiting: HashSet<(String, String)>,
    depth: usize,
    max_depth: usize,
}

impl ResolveGuard {
    pub fn new(max_depth: usize) -> Self {
        ResolveGuard {
            visiting: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Start evaluating `code` in `bracket`. Returns false on a cycle; the
    /// caller must not call `leave_match` then.
    pub fn enter_match(&mut self, bracket: &str, code: &str) -> bool {
        let key = (bracket.to_string(), code.to_string());
        if self.visiting.contains(&key) {
            warn!("reference cycle through {} {}; treating as pending", bracket, code);
            return false;
        }
        self.visiting.insert(key);
        true
    }

    pub fn leave_match(&mut self, bracket: &str, code: &str) {
        self.visiting.remove(&(bracket.to_string(), code.to_string()));
    }

    /// One nested token hop. Returns false when the budget is spent.
    pub fn descend(&mut self) -> bool {
        if self.depth >= self.max_depth {
            warn!("resolution depth {} exhausted; treating as pending", self.max_depth);
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Default for ResolveGuard {
    fn default() -> Self {
        ResolveGuard::new(DEFAULT_MAX_DEPTH)
    }
}
