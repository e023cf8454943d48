pub mod cross;
pub mod guard;
pub mod resolver;
pub mod token;

pub use cross::{CrossBracketLookup, MatchRef};
pub use guard::ResolveGuard;
pub use resolver::{EngineOptions, Resolution, SlotResolver};
pub use token::SeedToken;
