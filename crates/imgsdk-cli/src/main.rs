//! imgsdk CLI - headless driver for the native render session bridge.

mod apply;
mod parse;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "imgsdk")]
#[command(about = "Headless driver for the imgsdk render session bridge")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one effect to an image file (no surface, file-to-file)
    Apply {
        /// Input image path
        #[arg(short, long)]
        input: String,

        /// Output image path
        #[arg(short, long)]
        output: String,

        /// Effect command spec, JSON or pipe form
        #[arg(short, long)]
        cmd: String,

        /// Path to the engine library (defaults to the system search path)
        #[arg(long)]
        engine: Option<String>,
    },

    /// Validate a command spec and print its canonical form
    Parse {
        /// Effect command spec, JSON or pipe form
        spec: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Apply {
            input,
            output,
            cmd,
            engine,
        } => apply::execute(&input, &output, &cmd, engine.as_deref())?,

        Commands::Parse { spec } => parse::execute(&spec)?,
    }

    Ok(())
}
