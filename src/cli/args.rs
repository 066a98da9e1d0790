use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Path to batch configuration file (JSON, TOML, or YAML).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory under which one output directory per macro is created.
    #[arg(short, long, default_value = "results")]
    pub output_dir: PathBuf,

    /// Directory containing the CACTI executable.
    #[arg(long)]
    pub cacti_dir: Option<PathBuf>,

    /// Directory containing custom technology files.
    #[arg(long)]
    pub custom_tech_dir: Option<PathBuf>,

    /// Seconds to wait for a single CACTI run before giving up.
    #[arg(long, default_value_t = 600)]
    pub cacti_timeout_secs: u64,

    /// Number of macros to generate in parallel.
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Skip Liberty generation.
    #[arg(long)]
    pub no_lib: bool,

    /// Leave the property block out of the LEF.
    #[arg(long)]
    pub no_properties: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}
