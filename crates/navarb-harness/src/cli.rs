#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use navarb::NavigationConfig;

use crate::error::Result;
use crate::scenario::{Scenario, run_scenario};

#[derive(Debug, Parser)]
#[command(
    name = "navarb-harness",
    about = "Replay navigation scenarios against a headless page",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a scenario file and print the report as JSON.
    Run(RunArgs),

    /// Load and validate a config file.
    #[command(name = "check-config")]
    CheckConfig(ConfigArgs),

    /// Print the default config as TOML.
    #[command(name = "default-config")]
    DefaultConfig,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Scenario JSON file.
    #[arg(long)]
    pub scenario: PathBuf,

    /// Config file (TOML, or JSON when the extension is `.json`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print only the final debug snapshot.
    #[arg(long)]
    pub final_only: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub config: PathBuf,
}

pub fn load_config(path: Option<&PathBuf>) -> Result<NavigationConfig> {
    let Some(path) = path else {
        return Ok(NavigationConfig::default());
    };
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        NavigationConfig::from_json_file(path)?
    } else {
        NavigationConfig::from_toml_file(path)?
    };
    Ok(config)
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    let output = run(cli)?;
    println!("{output}");
    Ok(())
}

/// Execute a command and return what it prints.
pub fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Commands::Run(args) => {
            let config = load_config(args.config.as_ref())?;
            let scenario = Scenario::from_file(&args.scenario)?;
            let report = run_scenario(&scenario, config);
            if args.final_only {
                Ok(report.final_snapshot.to_json_pretty())
            } else {
                Ok(serde_json::to_string_pretty(&report)?)
            }
        }
        Commands::CheckConfig(args) => {
            let config = load_config(Some(&args.config))?;
            Ok(serde_json::json!({
                "status": "ok",
                "threshold_px": config.breakpoint.threshold_px,
                "debounce_ms": config.timing.debounce_ms,
            })
            .to_string())
        }
        Commands::DefaultConfig => Ok(NavigationConfig::default().to_toml_string()?),
    }
}
