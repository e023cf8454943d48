// Library crate for tabellone: bracket templates, seed resolution and
// outcome evaluation for multi-bracket tournament stages.
// The binary (main.rs) is a thin consumer of these modules.

pub mod bracket;
pub mod config;
pub mod round_robin;
pub mod seed;
pub mod snapshot;
pub mod stage;
pub mod standings;
