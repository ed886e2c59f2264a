//! Device Inspector - OpenCL GPU capability report
//!
//! Answers "does this machine expose GPU compute, and what are its limits?":
//! - Locates the first OpenCL platform
//! - Enumerates its GPU devices
//! - Prints identification, memory, and compute properties for each device
//!
//! Exits with status 1 when no platform or no GPU device is available.

mod config;
mod hardware;

use crate::config::{Config, OutputFormat};
use crate::hardware::{ComputeDriver, InspectError, Inspector, JsonReport, TextReport};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Device Inspector - report OpenCL GPU capabilities
#[derive(Parser)]
#[command(name = "device-inspector")]
#[command(version)]
#[command(about = "Report the GPU devices of the first OpenCL platform and their limits")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print the report as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the platform and its GPU devices (default)
    Report,

    /// Show configuration path and effective settings
    Config {
        /// Write the default config file if none exists yet
        #[arg(long, default_value_t = false)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = Config::load_from(&config_path)?;

    init_tracing(log_level(cli.verbose, &config.logging.level));

    match cli.command {
        Some(Commands::Report) | None => {
            let format = effective_format(cli.json, &config);
            let inspector = Inspector::new(default_driver());
            let stdout = io::stdout();
            let result = run_report(
                &inspector,
                &config.report.unavailable_placeholder,
                format,
                stdout.lock(),
            );

            if let Err(err) = result {
                println!("{}", err.to_string().bright_red());
                std::process::exit(1);
            }
        }
        Some(Commands::Config { init }) => {
            show_config_info(&config_path, &config, init)?;
        }
    }

    Ok(())
}

/// `--config` wins over `DEVICE_INSPECTOR_CONFIG_PATH` and the default location.
fn resolve_config_path(cli_path: Option<&Path>) -> Result<PathBuf> {
    match cli_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path(),
    }
}

/// `--json` overrides the configured report format.
fn effective_format(json: bool, config: &Config) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        config.report.format
    }
}

/// Run one inspection and write it to `out` in `format`.
fn run_report<D: ComputeDriver, W: Write>(
    inspector: &Inspector<D>,
    placeholder: &str,
    format: OutputFormat,
    out: W,
) -> Result<usize, InspectError> {
    match format {
        OutputFormat::Text => {
            let mut sink = TextReport::new(out, placeholder);
            inspector.inspect(&mut sink)
        }
        OutputFormat::Json => {
            let mut sink = JsonReport::default();
            let count = inspector.inspect(&mut sink)?;
            sink.finish(out)?;
            Ok(count)
        }
    }
}

#[cfg(feature = "opencl")]
fn default_driver() -> hardware::OpenClDriver {
    hardware::OpenClDriver::new()
}

#[cfg(not(feature = "opencl"))]
fn default_driver() -> hardware::driver::UnavailableDriver {
    tracing::warn!("Built without the `opencl` feature; no driver backend is available");
    hardware::driver::UnavailableDriver
}

/// Pick the default log filter: `-v` flags win over the configured level.
fn log_level(verbosity: u8, configured: &str) -> &str {
    match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Diagnostics go to stderr so the report on stdout stays clean.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn show_config_info(path: &Path, config: &Config, init: bool) -> Result<()> {
    println!("{}", "Device Inspector Configuration\n".bright_cyan().bold());

    println!(
        "{} {}",
        "Config file:".bright_yellow(),
        path.display().to_string().bright_white()
    );

    if init {
        if Config::init_at(path)? {
            println!("  {} {}", "Status:".bright_cyan(), "Created".bright_green());
        } else {
            println!(
                "  {} {}",
                "Status:".bright_cyan(),
                "Exists (left unchanged)".bright_green()
            );
        }
    } else if path.exists() {
        println!("  {} {}", "Status:".bright_cyan(), "Exists".bright_green());
    } else {
        println!(
            "  {} {}",
            "Status:".bright_cyan(),
            "Not created yet (will use defaults)".bright_yellow()
        );
    }

    println!("\n{}", "Report settings:".bright_white().bold());
    println!(
        "  {} {}",
        "Unavailable placeholder:".bright_cyan(),
        config.report.unavailable_placeholder
    );
    println!(
        "  {} {:?}",
        "Format:".bright_cyan(),
        config.report.format
    );

    println!("\n{}", "Logging settings:".bright_white().bold());
    println!("  {} {}", "Level:".bright_cyan(), config.logging.level);
    println!(
        "  {} {}",
        "Backend:".bright_cyan(),
        if cfg!(feature = "opencl") {
            "OpenCL"
        } else {
            "none (built without `opencl`)"
        }
    );

    Ok(())
}
