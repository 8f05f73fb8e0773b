//! RapidCompact CLI
//!
//! Entry point for the `rapidcompact` command-line tool.

use clap::{ArgAction, Parser, Subcommand};
use rapidcompact_cli::config::default_user_config_path;
use rapidcompact_cli::workflow::{
    run_optimize, run_preset, run_validate, run_wait, OptimizeRequest, PresetRequest, WaitRequest,
};
use rapidcompact_cli::{signal, CancelToken, Credentials, EffectiveConfig, ExitCode, Session, WorkflowError};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rapidcompact")]
#[command(about = "Optimize 3D models with the RapidCompact cloud API", version)]
struct Cli {
    /// API base URL (default: https://api.rapidcompact.com/api/)
    #[arg(long, short = 'b', global = true)]
    base_url: Option<String>,

    /// Credentials JSON file (default: credentials.json)
    #[arg(long, short = 'c', global = true)]
    credentials_file: Option<PathBuf>,

    /// TOML settings file, applied over ~/.config/rapidcompact/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for downloads, presets and run_summary.json (default: output)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Workflow JSON Schema (default: schema/workflow_schema_v2_5.schema.json)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a model, optimize every variant and download the results
    Optimize {
        /// Model directory, model file, or <base asset id>.id
        model: PathBuf,

        /// Variant definitions JSON file (default: variants.json)
        #[arg(long, short = 'f')]
        variants_file: Option<PathBuf>,

        /// Label for the uploaded model (default: file name without extension)
        #[arg(long, short = 'l')]
        label: Option<String>,

        /// Delete uploaded base assets and optimized models afterwards (default)
        #[arg(long, overrides_with = "no_cleanup")]
        cleanup: bool,

        /// Keep uploaded base assets and optimized models
        #[arg(long, overrides_with = "cleanup")]
        no_cleanup: bool,

        /// Exit with code 42 if any optimization failed
        #[arg(long, short = 'e')]
        exit_on_error: bool,

        /// Unpack downloaded .zip outputs
        #[arg(long)]
        extract: bool,

        /// Give up on a single poll after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Convert each valid variant into a CLI preset package
    Preset {
        /// Variant definitions JSON file (default: variants.json)
        #[arg(long, short = 'f')]
        variants_file: Option<PathBuf>,

        /// Exit with code 1 on the first failed conversion
        #[arg(long, short = 'e')]
        exit_on_error: bool,

        /// Unpack the preset packages
        #[arg(long)]
        extract: bool,
    },

    /// Validate variant configurations against the schema (no network)
    Validate {
        /// Variant definitions JSON file (default: variants.json)
        #[arg(long, short = 'f')]
        variants_file: Option<PathBuf>,
    },

    /// Wait for an already queued optimization and download its results
    Wait {
        /// Rapid model id returned when the optimization was submitted
        rapid_model_id: String,

        /// Variant the optimization was created from (maps output file types)
        #[arg(long)]
        variant: Option<String>,

        /// Variant definitions JSON file (default: variants.json)
        #[arg(long, short = 'f')]
        variants_file: Option<PathBuf>,

        /// Output file prefix (default: the rapid model id)
        #[arg(long, short = 'l')]
        label: Option<String>,

        /// Unpack downloaded .zip outputs
        #[arg(long)]
        extract: bool,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print the effective configuration and where it came from
    Config {
        /// Dot-separated key to print instead of the whole configuration
        key: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    process::exit(code.as_i32());
}

/// Logs go to stderr; stdout carries progress and reports.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn set(overrides: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        overrides.insert(key.to_string(), value);
    }
}

fn path_value(path: Option<&PathBuf>) -> Option<Value> {
    path.map(|p| Value::String(p.display().to_string()))
}

/// CLI flags as the highest-precedence config layer.
fn cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();
    set(&mut overrides, "base_url", cli.base_url.clone().map(Value::String));
    set(&mut overrides, "credentials_file", path_value(cli.credentials_file.as_ref()));
    set(&mut overrides, "output_dir", path_value(cli.output_dir.as_ref()));
    set(&mut overrides, "schema_file", path_value(cli.schema.as_ref()));

    let (variants_file, timeout) = match &cli.command {
        Commands::Optimize {
            variants_file,
            timeout,
            ..
        }
        | Commands::Wait {
            variants_file,
            timeout,
            ..
        } => (variants_file.as_ref(), *timeout),
        Commands::Preset { variants_file, .. } | Commands::Validate { variants_file } => {
            (variants_file.as_ref(), None)
        }
        Commands::Config { .. } => (None, None),
    };
    set(&mut overrides, "variants_file", path_value(variants_file));
    if let Some(seconds) = timeout {
        overrides.insert("poll".to_string(), json!({ "timeout_seconds": seconds }));
    }
    Value::Object(overrides)
}

fn run(cli: Cli) -> Result<ExitCode, WorkflowError> {
    let effective = EffectiveConfig::build(
        default_user_config_path().as_deref(),
        cli.config.as_deref(),
        Some(cli_overrides(&cli)),
    )?;
    let settings = effective.settings()?;
    tracing::debug!(sources = effective.sources.len(), "configuration resolved");

    match cli.command {
        Commands::Config { key } => {
            run_config(&effective, key.as_deref());
            Ok(ExitCode::Success)
        }
        Commands::Validate { .. } => {
            let checks = run_validate(&settings.variants_file, &settings.schema_file)?;
            let producible = checks.iter().filter(|c| c.producible()).count();
            println!("{} of {} variant(s) can be produced.", producible, checks.len());
            Ok(ExitCode::Success)
        }
        command => {
            println!("API Endpoint: {}", settings.base_url);
            let credentials = Credentials::load(&settings.credentials_file)?;
            let cancel = CancelToken::new();
            if let Err(e) = signal::install(cancel.clone()) {
                tracing::warn!(error = %e, "Ctrl-C handler not installed");
            }
            let session = Session::new(settings, credentials.token(), cancel)?;
            run_remote(&session, command)
        }
    }
}

fn run_remote(session: &Session, command: Commands) -> Result<ExitCode, WorkflowError> {
    match command {
        Commands::Optimize {
            model,
            label,
            no_cleanup,
            exit_on_error,
            extract,
            ..
        } => {
            let request = OptimizeRequest {
                model,
                label,
                cleanup: !no_cleanup,
                exit_on_error,
                extract,
            };
            let summary = run_optimize(session, &request)?;
            println!("{}", summary.human_summary);
            for line in summary.failure_lines() {
                println!("  {}", line);
            }
            Ok(summary.exit_code_enum().unwrap_or(ExitCode::Fatal))
        }
        Commands::Preset {
            exit_on_error,
            extract,
            ..
        } => {
            let outputs = run_preset(
                session,
                &PresetRequest {
                    exit_on_error,
                    extract,
                },
            )?;
            println!("{} CLI preset(s) written.", outputs.len());
            Ok(ExitCode::Success)
        }
        Commands::Wait {
            rapid_model_id,
            variant,
            label,
            extract,
            ..
        } => {
            let request = WaitRequest {
                label: label.unwrap_or_else(|| rapid_model_id.clone()),
                rapid_model_id,
                variant,
                extract,
            };
            let record = run_wait(session, &request)?;
            for output in &record.outputs {
                println!("{}  {}", output.sha256, output.path.display());
            }
            Ok(ExitCode::Success)
        }
        Commands::Config { .. } | Commands::Validate { .. } => Ok(ExitCode::Success),
    }
}

fn run_config(effective: &EffectiveConfig, key: Option<&str>) {
    let rendered = match key {
        Some(key) => match effective.get(key) {
            Some(value) => serde_json::to_string_pretty(value),
            None => {
                eprintln!("No such configuration key: {}", key);
                process::exit(ExitCode::Fatal.as_i32());
            }
        },
        None => serde_json::to_string_pretty(effective),
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(ExitCode::Fatal.as_i32());
        }
    }
}
