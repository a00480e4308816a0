mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "luisbot")]
#[command(about = "A sample bot that replies with the top LUIS intent", long_about = None)]
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
    /// Write starter configuration files
    Init {
        /// Force overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Show resolved configuration status
    Status,

    /// Run one utterance through the configured recognizer
    Recognize {
        /// Utterance text
        text: String,
    },

    /// Start the bot endpoint (long-running daemon)
    Serve {
        /// Port to listen on (overrides the endpoint descriptor)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Recognize { text } => {
            commands::recognize::run(&text).await?;
        }
        Commands::Serve { port, host } => {
            commands::serve::run(host, port).await?;
        }
    }

    Ok(())
}
