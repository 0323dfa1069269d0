//! Tooldrawer CLI
//!
//! Developer tool for compiling widget definitions and trying edits
//! against them. Results go to stdout as JSON; logs go to stderr.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Tooldrawer - widget definition compiler and edit engine
#[derive(Parser)]
#[command(name = "tooldrawer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (or project directory)
    #[arg(short, long, default_value = "tooldrawer.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the asset base URL from the configuration
    #[arg(long, env = "TOOLDRAWER_ASSET_BASE_URL")]
    asset_base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Tooldrawer project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Compile widget definitions
    Compile {
        /// Compile a specific widget only
        #[arg(short, long)]
        widget: Option<String>,

        /// Rewrite outputs even when unchanged
        #[arg(long)]
        force: bool,
    },

    /// Apply an op batch to instance data
    Apply {
        /// Compiled widget name
        #[arg(short, long)]
        widget: String,

        /// Instance data JSON file
        #[arg(short, long)]
        data: String,

        /// Ops JSON file
        #[arg(short, long)]
        ops: String,

        /// Accept 1/0 and yes/no style booleans
        #[arg(long)]
        permissive: bool,

        /// Validate the whole tree once, after the last op
        #[arg(long)]
        defer_validation: bool,
    },

    /// Validate instance data against a compiled widget
    Validate {
        /// Compiled widget name
        #[arg(short, long)]
        widget: String,

        /// Instance data JSON file
        #[arg(short, long)]
        data: String,
    },

    /// Apply localization overlay ops
    Overlay {
        /// Base instance data JSON file
        #[arg(short, long)]
        data: String,

        /// Overlay ops JSON file
        #[arg(short, long)]
        ops: String,

        /// Allowlist JSON file
        #[arg(short, long)]
        allowlist: String,
    },

    /// Show compiled controls
    Inspect {
        /// Compiled widget name
        #[arg(short, long)]
        widget: String,

        /// Show only the control governing this path
        #[arg(short, long)]
        path: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs stay on stderr so stdout is clean JSON
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let accepted = match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
            true
        }
        Commands::Compile { widget, force } => {
            commands::compile::run(
                &cli.config,
                widget.as_deref(),
                force,
                cli.asset_base_url.as_deref(),
            )?;
            true
        }
        Commands::Apply {
            widget,
            data,
            ops,
            permissive,
            defer_validation,
        } => commands::apply::run(
            &cli.config,
            &widget,
            &data,
            &ops,
            permissive,
            defer_validation,
        )?,
        Commands::Validate { widget, data } => {
            commands::validate::run(&cli.config, &widget, &data)?
        }
        Commands::Overlay {
            data,
            ops,
            allowlist,
        } => commands::overlay::run(&data, &ops, &allowlist)?,
        Commands::Inspect { widget, path } => {
            commands::inspect::run(&cli.config, &widget, path.as_deref())?;
            true
        }
    };

    Ok(if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
