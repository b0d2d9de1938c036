mod catalog;
mod ephemeris;
mod filter;
mod geometry;
mod label;
mod mission;
mod pipeline;
mod time;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::mission::{MissionError, MissionProfile};
use crate::pipeline::{RunError, RunOptions};

#[derive(Parser)]
#[command(name = "view-o-mat")]
#[command(about = "Camera view geometry from planetary mission labels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the view catalog for a directory of labels or a single label
    Run {
        /// Label directory or single label file
        path: PathBuf,
        /// Built-in mission profile
        #[arg(long, required_unless_present = "mission_file", conflicts_with = "mission_file")]
        mission: Option<String>,
        /// Mission profile YAML file
        #[arg(long)]
        mission_file: Option<PathBuf>,
        /// Ephemeris resources loaded for every window (repeatable, comma-separated)
        #[arg(long, required = true, value_delimiter = ',')]
        kernels: Vec<PathBuf>,
        /// Directory that relative window resources are resolved against
        #[arg(long)]
        kernel_root: Option<PathBuf>,
        /// Output catalog (defaults to the mission's file name)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Frame the vectors are expressed in (defaults to the mission's body-fixed frame)
        #[arg(long)]
        target_frame: Option<String>,
        /// Also write one JSON view next to each accepted label
        #[arg(long)]
        sidecar: bool,
        /// Accept every target name
        #[arg(long)]
        no_target_filter: bool,
        /// Skip observations where the target spans fewer pixels
        #[arg(long)]
        min_px: Option<f64>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate a mission profile file
    Validate { profile: PathBuf },
    /// List the built-in mission profiles
    Missions,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            mission,
            mission_file,
            kernels,
            kernel_root,
            out,
            target_frame,
            sidecar,
            no_target_filter,
            min_px,
            verbose,
        } => {
            init_logging(verbose);
            let profile = match load_profile(mission.as_deref(), mission_file.as_deref()) {
                Ok(p) => p,
                Err(e) => {
                    log::error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            let options = RunOptions {
                input: path,
                kernels,
                kernel_root,
                output: out,
                target_frame,
                sidecar,
                target_filter: !no_target_filter,
                min_px,
            };
            run(&profile, &options)
        }
        Commands::Validate { profile } => validate(&profile),
        Commands::Missions => {
            for name in mission::builtin_names() {
                println!("{}", name);
            }
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_profile(name: Option<&str>, file: Option<&Path>) -> Result<MissionProfile, MissionError> {
    match (name, file) {
        (_, Some(file)) => MissionProfile::from_file(file),
        (Some(name), None) => mission::builtin(name),
        (None, None) => Err(MissionError::Unknown(String::new())),
    }
}

fn run(profile: &MissionProfile, options: &RunOptions) -> ExitCode {
    log::info!("Mission {} ({} kernels)", profile.name, options.kernels.len());
    match pipeline::run(profile, options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(RunError::InvalidInput(path)) => {
            log::error!("{} is neither a directory nor a label file", path.display());
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &Path) -> ExitCode {
    match MissionProfile::from_file(path) {
        Ok(profile) => {
            println!("Mission profile is valid: {}", profile.name);
            if let Some(description) = &profile.description {
                println!("  {}", description);
            }
            println!(
                "  {} labels ({}), target {} in {}, observer {}",
                profile.label.format,
                profile.label.extensions.join(","),
                profile.target.body,
                profile.target.frame,
                profile.observer
            );
            println!(
                "  {} windows, {} excluded names, {} excluded date ranges",
                profile.windows.len(),
                profile.exclude.names.len(),
                profile.exclude.date_ranges.len()
            );
            if let Some(eoe) = &profile.end_of_exposure {
                println!(
                    "  end of exposure for '{}' in {} ranges",
                    eoe.name_pattern,
                    eoe.ranges.len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
