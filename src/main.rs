//! CLI entry point: parse arguments, run one patch pipeline, exit 2 on failure.

use clap::{CommandFactory, Parser};
use icu_tzdata_patch::config::{DEFAULT_ICU_VERSION, DEFAULT_TZDATA_VERSION};
use icu_tzdata_patch::patcher::DEFAULT_TOOL;
use icu_tzdata_patch::{Endianness, MergeTool, PatchRequest, Pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Patch an ICU `.dat` bundle with updated timezone resources.
///
/// Downloads metaZones, timezoneTypes, windowsZones, and zoneinfo64 for the
/// requested versions and merges them into the target bundle with `icupkg`.
#[derive(Parser, Debug)]
#[command(
    name = "icu-tzdata-patch",
    version,
    after_help = "Example: icu-tzdata-patch ./icudt61l.dat 2019c 44 le"
)]
struct Cli {
    /// Path to a valid .dat bundle to patch
    target: Option<PathBuf>,

    /// Timezone database version
    #[arg(default_value = DEFAULT_TZDATA_VERSION)]
    tzdata_version: String,

    /// ICU major version
    #[arg(default_value = DEFAULT_ICU_VERSION)]
    icu_version: String,

    /// Byte order of the target bundle (le or be)
    #[arg(default_value_t = Endianness::Le)]
    endianness: Endianness,

    /// Directory for temporary resource files (default: a dedicated temp dir)
    #[arg(long)]
    working_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // No target behaves like --help: print usage and succeed.
    let Some(target) = cli.target else {
        let mut command = Cli::command();
        let _ = command.print_help();
        return;
    };

    let mut request = PatchRequest::new(target);
    request.tzdata_version = cli.tzdata_version;
    request.icu_version = cli.icu_version;
    request.endianness = cli.endianness;
    request.working_dir = cli.working_dir;

    // If icupkg is not on PATH, keep the bare command name so the failure
    // surfaces as a launch error from the run itself.
    let tool = MergeTool::from_path().unwrap_or_else(|| MergeTool::new(PathBuf::from(DEFAULT_TOOL)));

    if let Err(e) = Pipeline::new(tool).run(&request).await {
        eprintln!("{e}");
        std::process::exit(2);
    }
}
