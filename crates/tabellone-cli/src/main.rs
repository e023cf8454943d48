// tabellone entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, stdout is for output)
// 2. Load config
// 3. Load the stage snapshot and external standings
// 4. Run the subcommand
// 5. Save the snapshot if results changed

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use tabellone_core::bracket::outcome::MatchView;
use tabellone_core::bracket::template::Shape;
use tabellone_core::bracket::{Bracket, Side};
use tabellone_core::config::{self, Config};
use tabellone_core::snapshot::Snapshot;
use tabellone_core::stage::{Evaluator, Stage};
use tabellone_core::standings::{self, StaticStandings};

#[derive(Parser)]
#[command(name = "tabellone")]
#[command(about = "Resolve and edit tournament brackets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config/, defaults/ and the data files (default: cwd)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print brackets with resolved names and outcomes
    Show {
        /// Only this bracket id
        #[arg(long)]
        bracket: Option<String>,
    },

    /// Print the standings table of a round-robin bracket
    Standings {
        #[arg(long)]
        bracket: String,
    },

    /// Toggle the winner of an elimination match
    Pick {
        #[arg(long)]
        bracket: String,
        /// Match code, e.g. R1, Z2, CO1, THIRD
        #[arg(long)]
        code: String,
        #[arg(long, value_enum, ignore_case = true)]
        side: SideArg,
        /// Also drop picks on every match fed by this one
        #[arg(long)]
        clear_downstream: bool,
    },

    /// Enter (or clear, with neither --a nor --b) a round-robin score
    Score {
        #[arg(long)]
        bracket: String,
        /// 1-based fixture number in schedule order
        #[arg(long)]
        fixture: usize,
        #[arg(long)]
        a: Option<u32>,
        #[arg(long)]
        b: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    A,
    B,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Side {
        match side {
            SideArg::A => Side::A,
            SideArg::B => Side::B,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;

    // 2. Load config
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    if let Some(path) = config::ensure_config_file(&base_dir).context("failed to initialize configuration")? {
        info!("Created {} from defaults", path.display());
    }
    let config = config::load_config_from(&base_dir).context("failed to load configuration")?;

    // 3. Load snapshot and standings
    let snapshot_path = base_dir.join(&config.paths.snapshot);
    let snapshot = Snapshot::load(&snapshot_path).context("failed to load stage snapshot")?;
    let mut stage = Stage::from_snapshot(snapshot, config.group_cap()).context("invalid bracket in snapshot")?;
    info!("Loaded {} bracket(s) from {}", stage.brackets().len(), snapshot_path.display());

    let standings = standings::load_all(
        &base_dir.join(&config.paths.group_standings),
        &base_dir.join(&config.paths.overall_ranking),
    )
    .context("failed to load standings")?;
    debug!(
        "Standings: {} group(s), {} ranked team(s)",
        standings.groups.len(),
        standings.overall.len()
    );

    // 4. Run the subcommand
    let changed = run(cli.command, &mut stage, &standings, &config)?;

    // 5. Save
    if changed {
        save(&stage, &snapshot_path)?;
    }
    Ok(())
}

fn run(command: Commands, stage: &mut Stage, standings: &StaticStandings, config: &Config) -> anyhow::Result<bool> {
    match command {
        Commands::Show { bracket } => {
            let eval = stage.evaluator(standings, config.engine_options());
            let brackets: Vec<&Bracket> = match &bracket {
                Some(id) => vec![eval
                    .stage()
                    .bracket(id)
                    .with_context(|| format!("unknown bracket `{id}`"))?],
                None => eval.stage().brackets().iter().collect(),
            };
            for bracket in brackets {
                print_bracket(&eval, bracket)?;
            }
            Ok(false)
        }
        Commands::Standings { bracket } => {
            let eval = stage.evaluator(standings, config.engine_options());
            print_standings(&eval, &bracket)?;
            Ok(false)
        }
        Commands::Pick {
            bracket,
            code,
            side,
            clear_downstream,
        } => {
            let code = code.trim().to_ascii_uppercase();
            stage
                .evaluator(standings, config.engine_options())
                .check_pick(&bracket, &code, side.into())?;
            let now = stage.toggle_pick(&bracket, &code, side.into())?;
            match now {
                Some(side) => println!("{bracket} {code}: side {side} wins"),
                None => println!("{bracket} {code}: pick cleared"),
            }
            if clear_downstream {
                let cleared = stage.clear_downstream(&bracket, &code)?;
                if !cleared.is_empty() {
                    println!("cleared: {}", cleared.join(", "));
                }
            }
            Ok(true)
        }
        Commands::Score { bracket, fixture, a, b } => {
            let Some(index) = fixture.checked_sub(1) else {
                bail!("fixture numbers start at 1");
            };
            let score = match (a, b) {
                (Some(a), Some(b)) => Some((a, b)),
                (None, None) => None,
                _ => bail!("give both --a and --b, or neither to clear the score"),
            };
            stage.set_score(&bracket, index, score)?;
            match score {
                Some((a, b)) => println!("{bracket} fixture {fixture}: {a}-{b}"),
                None => println!("{bracket} fixture {fixture}: score cleared"),
            }
            Ok(true)
        }
    }
}

fn print_bracket(eval: &Evaluator<'_>, bracket: &Bracket) -> anyhow::Result<()> {
    let engine = eval.engine(&bracket.id)?;
    let shape = engine.template().shape();
    println!(
        "== {} ({}, {}, {} teams) ==",
        bracket.title, bracket.id, bracket.kind, bracket.n_teams
    );

    let scores = eval.stage().scores(&bracket.id)?;
    for (index, view) in engine.evaluate().iter().enumerate() {
        let score = match scores.points(index) {
            Some((a, b)) if shape != Shape::SingleElim && shape != Shape::DoubleElim => format!("  {a}-{b}"),
            _ => String::new(),
        };
        println!("{}{}", match_line(view), score);
    }

    if shape == Shape::RoundRobin {
        print_standings(eval, &bracket.id)?;
    } else {
        let places = engine.placements();
        if places.iter().any(Option::is_some) {
            let line: Vec<String> = places
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}. {}", i + 1, p.as_deref().unwrap_or("—")))
                .collect();
            println!("Placements: {}", line.join("  "));
        }
    }
    println!();
    Ok(())
}

fn match_line(view: &MatchView) -> String {
    let mark = |side: Side| if view.pick == Some(side) { "*" } else { " " };
    format!(
        "{:<6} {}{:<28} vs {}{:<28}",
        view.code,
        mark(Side::A),
        view.sides[0],
        mark(Side::B),
        view.sides[1]
    )
}

fn print_standings(eval: &Evaluator<'_>, id: &str) -> anyhow::Result<()> {
    let table = eval.standings(id)?;
    println!("{:<3} {:<28} {:>2} {:>2} {:>2} {:>5} {:>5} {:>6}", "#", "Team", "P", "W", "L", "PF", "PA", "Q");
    for (rank, row) in table.iter().enumerate() {
        println!(
            "{:<3} {:<28} {:>2} {:>2} {:>2} {:>5} {:>5} {:>6.3}",
            rank + 1,
            row.name,
            row.played,
            row.wins,
            row.losses,
            row.points_for,
            row.points_against,
            row.quotient()
        );
    }
    Ok(())
}

fn save(stage: &Stage, path: &Path) -> anyhow::Result<()> {
    stage
        .snapshot()
        .save(path)
        .with_context(|| format!("failed to save snapshot to {}", path.display()))?;
    info!("Saved snapshot to {}", path.display());
    Ok(())
}

/// Initialize tracing on stderr. `TABELLONE_LOG` takes precedence over
/// `RUST_LOG`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("TABELLONE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("tabellone=info,tabellone_core=info,warn"));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
