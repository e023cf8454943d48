// External standings: group tables and the overall ranking.
//
// These come from the group stage and are read-only here. CSV import follows
// the same rules as the rest of the data loaders: malformed rows are skipped
// with a warning, I/O and header problems are errors.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Group letter -> participant names in finishing order.
pub type GroupStandings = BTreeMap<char, Vec<String>>;

/// Participant names in overall finishing order.
pub type OverallRanking = Vec<String>;

/// Lookups the resolver needs. Positions are 1-based; `None` when the
/// position is not (yet) known.
pub trait Standings {
    fn group_position(&self, letter: char, position: usize) -> Option<String>;
    fn overall_position(&self, position: usize) -> Option<String>;
}

/// Highest position a standings CSV row may carry. Rows above it are
/// skipped.
pub const MAX_POSITION: usize = 1024;

/// In-memory standings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticStandings {
    pub groups: GroupStandings,
    pub overall: OverallRanking,
}

impl StaticStandings {
    pub fn new(groups: GroupStandings, overall: OverallRanking) -> Self {
        StaticStandings { groups, overall }
    }

    pub fn set_group(&mut self, letter: char, names: Vec<String>) {
        self.groups.insert(letter.to_ascii_uppercase(), names);
    }
}

fn nth(names: &[String], position: usize) -> Option<String> {
    let name = names.get(position.checked_sub(1)?)?;
    if name.trim().is_empty() {
        None
    } else {
        Some(name.clone())
    }
}

impl Standings for StaticStandings {
    fn group_position(&self, letter: char, position: usize) -> Option<String> {
        nth(self.groups.get(&letter)?, position)
    }

    fn overall_position(&self, position: usize) -> Option<String> {
        nth(&self.overall, position)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StandingsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV rows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawGroupRow {
    #[serde(alias = "girone")]
    group: String,
    #[serde(alias = "posizione")]
    position: usize,
    #[serde(alias = "squadra")]
    team: String,
}

#[derive(Debug, Deserialize)]
struct RawRankingRow {
    #[serde(alias = "posizione")]
    position: usize,
    #[serde(alias = "squadra")]
    team: String,
}

/// Place `name` at 1-based `position`, padding gaps with empty names (which
/// the lookups treat as unknown).
fn place(list: &mut Vec<String>, position: usize, name: String, what: &str) {
    let index = position - 1;
    if list.len() <= index {
        list.resize(index + 1, String::new());
    }
    if !list[index].is_empty() {
        warn!("duplicate {} position {}, using '{}'", what, position, name);
    }
    list[index] = name;
}

fn load_groups_from_reader<R: Read>(rdr: R) -> Result<GroupStandings, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut groups = GroupStandings::new();
    for result in reader.deserialize::<RawGroupRow>() {
        match result {
            Ok(raw) => {
                let mut letters = raw.group.chars();
                let letter = match (letters.next(), letters.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
                    _ => {
                        warn!("skipping standings row for '{}': bad group '{}'", raw.team, raw.group);
                        continue;
                    }
                };
                if raw.position == 0 || raw.position > MAX_POSITION || raw.team.is_empty() {
                    warn!("skipping standings row in group {}: position {} team '{}'", letter, raw.position, raw.team);
                    continue;
                }
                place(groups.entry(letter).or_default(), raw.position, raw.team, "group");
            }
            Err(e) => {
                warn!("skipping malformed standings row: {}", e);
            }
        }
    }
    Ok(groups)
}

fn load_ranking_from_reader<R: Read>(rdr: R) -> Result<OverallRanking, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut ranking = OverallRanking::new();
    for result in reader.deserialize::<RawRankingRow>() {
        match result {
            Ok(raw) => {
                if raw.position == 0 || raw.position > MAX_POSITION || raw.team.is_empty() {
                    warn!("skipping ranking row: position {} team '{}'", raw.position, raw.team);
                    continue;
                }
                place(&mut ranking, raw.position, raw.team, "ranking");
            }
            Err(e) => {
                warn!("skipping malformed ranking row: {}", e);
            }
        }
    }
    Ok(ranking)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, StandingsError> {
    std::fs::File::open(path).map_err(|e| StandingsError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load group standings from a `group,position,team` CSV.
pub fn load_group_standings(path: &Path) -> Result<GroupStandings, StandingsError> {
    load_groups_from_reader(open(path)?).map_err(|e| StandingsError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the overall ranking from a `position,team` CSV.
pub fn load_overall_ranking(path: &Path) -> Result<OverallRanking, StandingsError> {
    load_ranking_from_reader(open(path)?).map_err(|e| StandingsError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load both files. A path that does not exist yields empty standings, so a
/// stage can be inspected before the group phase has produced anything.
pub fn load_all(groups_path: &Path, ranking_path: &Path) -> Result<StaticStandings, StandingsError> {
    let groups = if groups_path.exists() {
        load_group_standings(groups_path)?
    } else {
        GroupStandings::new()
    };
    let overall = if ranking_path.exists() {
        load_overall_ranking(ranking_path)?
    } else {
        OverallRanking::new()
    };
    Ok(StaticStandings::new(groups, overall))
}
