//! `tsx`: inspect, validate, export and autotile against Tiled tilesets

mod commands;
mod config;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use commands::ExportFormat;
use config::{CliConfig, TieBreakMode};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;
use tsx_autotile::WangId;

/// Exit status when no tile fits the requested neighborhood
const EXIT_NO_MATCH: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "tsx", version, about = "Tools for Tiled tilesets and their Wang sets")]
struct Cli {
    /// Configuration file (defaults to ./tsx.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// More log output; repeat for more detail
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show geometry, probability overrides and wang sets
    Inspect {
        file: PathBuf,
    },
    /// Validate tileset files
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Find the tile matching a neighborhood
    Resolve {
        file: PathBuf,
        /// Wang set name (defaults to `default_set` from the config)
        #[arg(long)]
        set: Option<String>,
        /// Eight comma-separated terrain ids, 0 for any
        #[arg(long, value_name = "A,B,C,D,E,F,G,H")]
        wangid: WangId,
        #[arg(long, value_enum)]
        tie_break: Option<TieBreakMode>,
        /// Seed for `--tie-break random`
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Write the tileset back out, normalized
    Export {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Tsx)]
        format: ExportFormat,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn log_level(&self, config: &CliConfig) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::WARN),
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

fn init_logging(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli, config: CliConfig) -> Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Inspect { file } => commands::inspect(&file, &mut stdout)?,
        Commands::Check { files } => commands::check(&files, &mut stdout)?,
        Commands::Resolve {
            file,
            set,
            wangid,
            tie_break,
            seed,
        } => {
            let Some(set) = set.or(config.default_set) else {
                bail!("no wang set given: pass --set or configure default_set");
            };
            let mode = tie_break.unwrap_or(config.tie_break);
            match commands::resolve(&file, &set, &wangid, mode, seed.or(config.seed))? {
                Ok(tile) => writeln!(stdout, "{tile}")?,
                Err(no_match) => {
                    eprintln!("{no_match}");
                    return Ok(ExitCode::from(EXIT_NO_MATCH));
                }
            }
        }
        Commands::Export {
            file,
            format,
            output,
        } => {
            let text = commands::export(&file, format)?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => stdout.write_all(text.as_bytes())?,
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("cannot read the working directory")?;
    let config = CliConfig::discover(cli.config.as_deref(), &cwd)?;
    init_logging(cli.log_level(&config));
    tracing::debug!("Using configuration {:?}", config);
    run(cli, config)
}
