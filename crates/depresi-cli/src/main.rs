use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use depresi_ai::{
    ArtifactPaths, DEFAULT_ENCODERS_PATH, DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH, Predictor,
};
use tokio::net::TcpListener;
use tracing::{error, info};

mod check;

#[derive(Debug, Parser)]
#[command(
    name = "depresi",
    version,
    about = "Student depression risk prediction service"
)]
struct Cli {
    #[command(flatten)]
    artifacts: ArtifactArgs,

    /// Address to bind the HTTP server on
    #[arg(long, env = "DEPRESI_HOST", default_value = "0.0.0.0", global = true)]
    host: String,

    /// Port to bind the HTTP server on
    #[arg(long, env = "DEPRESI_PORT", default_value_t = 5000, global = true)]
    port: u16,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct ArtifactArgs {
    /// XGBoost model in native JSON format
    #[arg(long, env = "DEPRESI_MODEL", default_value = DEFAULT_MODEL_PATH, global = true)]
    model: PathBuf,

    /// Fitted feature scaler
    #[arg(long, env = "DEPRESI_SCALER", default_value = DEFAULT_SCALER_PATH, global = true)]
    scaler: PathBuf,

    /// Fitted label encoders; optional, fallback encoding is used when absent
    #[arg(long, env = "DEPRESI_ENCODERS", default_value = DEFAULT_ENCODERS_PATH, global = true)]
    encoders: PathBuf,
}

impl From<ArtifactArgs> for ArtifactPaths {
    fn from(args: ArtifactArgs) -> Self {
        Self {
            model: args.model,
            scaler: args.scaler,
            encoders: args.encoders,
        }
    }
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Load the artifacts and serve predictions over HTTP (default)
    Serve,
    /// Load the artifacts, report the encoding tier per column, and exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("depresi v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);
    let paths = ArtifactPaths::from(cli.artifacts);

    let predictor = Predictor::load(&paths).inspect_err(|e| error!("startup failed: {e:#}"))?;

    match command {
        Command::Check => {
            print!("{}", check::render(predictor.policy()));
            Ok(())
        }
        Command::Serve => {
            let listener = TcpListener::bind((cli.host.as_str(), cli.port))
                .await
                .with_context(|| format!("binding {}:{}", cli.host, cli.port))
                .inspect_err(|e| error!("startup failed: {e:#}"))?;
            depresi_server::serve(listener, Arc::new(predictor))
                .await
                .context("server exited")
        }
    }
}
