//! The `strata` binary.
//!
//! ```text
//! strata <inputs.toml> [key=value ...] [--describe] [--verbose]
//! ```

use std::io::{self, BufRead};
use std::process::ExitCode;

use clap::Parser;
use strata_comm::{Communicator, SerialComm, ThreadGroup};
use strata_core::{RunError, SPACEDIM};
use strata_engine::{header_format, BuildInfo, Driver, Invocation, RunConfig, RunSummary};
use strata_physics::{PhysicsConfig, RelaxationBuilder};
use strata_plotfile::{HeaderFormat, PlotfileWriter};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Adaptive mesh refinement time-stepping driver", long_about = None)]
struct Cli {
    /// Inputs file followed by `key=value` overrides, applied in order.
    args: Vec<String>,

    /// Print build metadata and exit without running.
    #[arg(long)]
    describe: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn build_info() -> BuildInfo {
    BuildInfo {
        package: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        target: option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown"),
        profile: env!("STRATA_PROFILE"),
        git_sha: option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        features: Vec::new(),
        spacedim: SPACEDIM,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.describe {
        print!("{}", build_info());
        return ExitCode::SUCCESS;
    }

    match run(&cli.args) {
        Ok(summary) => {
            info!(steps = summary.steps, time = summary.final_time, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

/// Everything a rank needs, resolved once before the group launches.
struct Launch {
    config: RunConfig,
    physics: PhysicsConfig,
    format: HeaderFormat,
    job_info: String,
}

fn run(args: &[String]) -> Result<RunSummary, RunError> {
    let invocation = Invocation::classify(args)?;
    let mut table = invocation.load()?;
    let config = RunConfig::from_table(&mut table)?;
    let physics: PhysicsConfig = table.section("physics")?;
    physics.validate()?;
    let launch = Launch {
        format: header_format(&config.amr.plot_format)?,
        job_info: build_info().job_info(table.inputs()),
        config,
        physics,
    };

    let nprocs = launch.config.parallel.nprocs;
    if nprocs == 1 {
        return run_rank(&launch, &SerialComm);
    }
    info!(nprocs, "launching process group");
    let results = ThreadGroup::run(nprocs, |comm| run_rank(&launch, &comm))?;
    // The first failing rank decides the diagnostic.
    let summaries = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    summaries
        .into_iter()
        .next()
        .ok_or_else(|| RunError::collaborator("process group", "no rank reported"))
}

fn run_rank(launch: &Launch, comm: &dyn Communicator) -> Result<RunSummary, RunError> {
    let builder = RelaxationBuilder::new(launch.physics.clone()).with_job_info(launch.job_info.clone());
    let driver = Driver::new(
        launch.config.run.clone(),
        launch.config.amr.clone(),
        &launch.config.eb,
        Box::new(builder),
        PlotfileWriter::new(launch.format),
        comm,
    )?;
    let stdin = io::stdin();
    let mut pause_input: Box<dyn BufRead> = if comm.is_coordinator() {
        Box::new(stdin.lock())
    } else {
        Box::new(io::empty())
    };
    driver.run(comm, &mut *pause_input)
}
