use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use descent_core::*;
use serde_json::json;

/// Replays a script of actions, one JSON object per line, and prints the state after each one.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// Start a run from this share code before the script
    #[arg(short, long)]
    seed: Option<String>,

    /// Ascension level for the run started by --seed
    #[arg(short, long, default_value_t = 0)]
    ascension: u8,

    /// Use the compact (taller than wide) floor layouts
    #[arg(long)]
    compact: bool,

    /// Directory holding the saved run and lifetime stats
    #[arg(long, default_value = ".descent")]
    save_dir: PathBuf,

    /// Script to replay; reads stdin when omitted
    script: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let mut session = Session::open(FileStorage::new(&args.save_dir));
    let mut out = io::stdout().lock();

    if args.compact {
        session.dispatch(&Action::SetLayout {
            layout: Layout::Compact,
        });
    }
    if let Some(code) = &args.seed {
        let seed = RunSeed::from_share_code(code)
            .ok_or_else(|| anyhow!("invalid share code {code:?}"))?;
        let action = Action::StartRun {
            ascension: AscensionLevel::saturating(args.ascension),
            seed,
        };
        report(&mut out, &action, session.dispatch(&action))?;
    }

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    for (number, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let action: Action = serde_json::from_str(line)
            .with_context(|| format!("line {}: not an action", number + 1))?;
        report(&mut out, &action, session.dispatch(&action))?;
    }

    let stats = session.stats();
    log::info!(
        "{} runs, best floor {}, best score {}",
        stats.total_runs,
        stats.best_floor,
        stats.best_score
    );
    Ok(())
}

fn report(out: &mut impl Write, action: &Action, state: &GameState) -> Result<()> {
    let line = json!({
        "action": action,
        "state": state,
        "overlays": state.overlays(),
        "minesRemaining": state.mines_remaining(),
        "clock": state.clock.display(),
        "shareCode": state.run.seed.share_code(),
    });
    writeln!(out, "{line}")?;
    Ok(())
}
