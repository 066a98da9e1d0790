use std::collections::HashSet;
use std::fs::canonicalize;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use colored::Colorize;

use crate::cacti::CactiCharacterizer;
use crate::cli::args::Args;
use crate::cli::progress::BatchProgress;
use crate::config::parse_batch_config;
use crate::plan::{run_batch, BatchParams, TaskKey};
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
  _ __ __ _ _ __ ___   __ _  ___ _ __
 | '__/ _` | '_ ` _ \ / _` |/ _ \ '_ \
 | | | (_| | | | | | | (_| |  __/ | | |
 |_|  \__,_|_| |_| |_|\__, |\___|_| |_|
                      |___/
";

pub fn run() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_path = canonicalize(&args.config)?;

    println!("{BANNER}");
    println!("ramgen v{}\n", env!("CARGO_PKG_VERSION"));

    println!("Reading configuration file...\n");
    let config = parse_batch_config(&config_path)?;
    let process = config.process.validate()?;

    println!("Configuration file: {:?}", &config_path);
    println!("Technology parameters:");
    println!("\tNode: {} nm", process.tech_nm);
    println!("\tSignal layer: {}", process.signal_layer());
    println!("\tPin pitch: {} um", process.pin_pitch);
    if let Some(tech) = &process.custom_tech_name {
        println!("\tCustom technology: {tech}");
    }
    println!("Macros: {}\n", config.srams.len());

    std::fs::create_dir_all(&args.output_dir)?;
    let output_dir = canonicalize(&args.output_dir)?;

    let enabled_tasks = [(true, TaskKey::GenerateLef), (!args.no_lib, TaskKey::GenerateLib)]
        .into_iter()
        .filter_map(|(a, b)| if a { Some(b) } else { None });
    let tasks: HashSet<TaskKey> = HashSet::from_iter(enabled_tasks);

    let cacti_dir = match &args.cacti_dir {
        Some(dir) => canonicalize(dir)?,
        None => std::env::current_dir()?,
    };
    let characterizer = CactiCharacterizer::new(cacti_dir)
        .with_timeout(Duration::from_secs(args.cacti_timeout_secs));

    let progress = BatchProgress::new();
    let outcomes = run_batch(
        &BatchParams {
            process: &process,
            output_dir: &output_dir,
            characterizer: &characterizer,
            custom_tech_dir: args.custom_tech_dir.as_deref(),
            tasks: &tasks,
            properties: !args.no_properties,
            jobs: args.jobs,
        },
        &config.srams,
        Some(&progress),
    )?;

    println!();
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(work_dir) => println!("{} {}: {:?}", "ok".green().bold(), outcome.name, work_dir),
            Err(err) => {
                failed += 1;
                println!("{} {}: {err:#}", "failed".red().bold(), outcome.name);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} macros failed", outcomes.len());
    }
    println!("\nArtifacts saved to: {:?}\n", &output_dir);

    Ok(())
}
