//! `esi` entrypoint: the minimal command-line surface spec.md §6/§11
//! describes for core-only operation — run one of the four fixed
//! skull-stripping recipes over an MRI volume and write the masked
//! result back out.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use esi_core::{Asker, Environment, Error, Logger, Progress};
use esi_skullstrip::{Recipe, SkullStripOptions};
use esi_volume::{read_volume, write_volume};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RecipeArg {
    #[value(name = "1a")]
    OneA,
    #[value(name = "1b")]
    OneB,
    #[value(name = "2")]
    Two,
    #[value(name = "3")]
    Three,
}

impl From<RecipeArg> for Recipe {
    fn from(arg: RecipeArg) -> Self {
        match arg {
            RecipeArg::OneA => Recipe::OneA,
            RecipeArg::OneB => Recipe::OneB,
            RecipeArg::Two => Recipe::Two,
            RecipeArg::Three => Recipe::Three,
        }
    }
}

/// Skull-strip an MRI volume with one of the four fixed recipes
/// (spec.md §4.4, §6).
#[derive(Debug, Parser)]
#[command(name = "esi", version, about = "ESI core toolkit: MRI skull-stripping")]
struct Args {
    /// Path to the input MRI volume (the minimal raw-volume container
    /// `esi-volume::read_volume` round-trips, not a NIfTI file).
    mri: PathBuf,

    /// Which fixed pipeline to run.
    #[arg(long, value_enum, default_value = "1a")]
    recipe: RecipeArg,

    /// Overrides the voxel size declared by the input file (mm).
    #[arg(long)]
    voxel_size: Option<f64>,

    /// Removes the inferior brain-stem elongation after stripping.
    #[arg(long)]
    remove_brain_stem: bool,

    /// Where to write the masked MRI volume.
    #[arg(long)]
    out: PathBuf,
}

struct StderrLogger;

impl Logger for StderrLogger {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("warning: {message}");
    }
}

struct StderrProgress;

impl Progress for StderrProgress {
    fn start(&self, stage: &str, total_chunks: u64) {
        eprintln!("[{stage}] starting ({total_chunks} steps)");
    }

    fn advance(&self, completed_chunks: u64) {
        eprint!("\r  {completed_chunks} steps done");
    }

    fn finish(&self, stage: &str) {
        eprintln!("\n[{stage}] done");
    }
}

struct AlwaysYesAsker;

impl Asker for AlwaysYesAsker {
    fn confirm(&self, question: &str, default: bool) -> bool {
        eprintln!("{question} (assuming yes, non-interactive CLI)");
        let _ = default;
        true
    }
}

/// Structured stderr output for the interactive line plus a rolling log
/// file for postmortem debugging, the same split the teacher's `ox-bin`
/// draws between its terminal UI and `oxidized.log`.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::EnvFilter;

    let file_appender = tracing_appender::rolling::never(".", "esi.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .init();

    guard
}

/// Exit codes exactly as spec.md §6: 0 success, 1 bad input, 2 empty
/// result (degenerate MRI), 3 cancelled. An error that isn't one of
/// ours (shouldn't happen, but `anyhow` doesn't guarantee it) falls
/// back to 1.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<Error>() {
        Some(Error::InvalidInput { .. } | Error::OutOfRange { .. } | Error::Io { .. }) => 1,
        Some(Error::Degenerate { .. } | Error::NotEnoughData { .. }) => 2,
        Some(Error::Cancelled { .. }) => 3,
        None => 1,
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mri = read_volume(&args.mri).context("reading input MRI volume")?;

    let declared_voxel_size = args.voxel_size.unwrap_or_else(|| mri.voxel_size());
    let options = SkullStripOptions {
        recipe: args.recipe.into(),
        declared_voxel_size_mm: declared_voxel_size,
        remove_brain_stem: args.remove_brain_stem,
        ..SkullStripOptions::default()
    };

    let logger = StderrLogger;
    let progress = StderrProgress;
    let asker = AlwaysYesAsker;
    let env = Environment {
        progress: &progress,
        logger: &logger,
        asker: &asker,
    };

    let brain = esi_skullstrip::run(&mri, &env, options).context("running skull-stripping pipeline")?;

    write_volume(&args.out, &brain).context("writing output MRI volume")?;

    info!(out = %args.out.display(), "wrote masked MRI");
    Ok(())
}

fn main() -> ExitCode {
    let _log_guard = init_logging();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}
