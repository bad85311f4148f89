#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use zkey_prover::core::{ProverConfig, load_config};
use zkey_prover::{AppResult, fetch_cmd, prove_cmd, verify_cmd};

#[derive(Parser, Debug)]
#[command(name = "zkey-prover")]
#[command(about = "Fetch a Circom proving key on demand and prove/verify multiplier statements", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set ZKEY_PROVER_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Overrides {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Local path of the proving key (file:// prefix allowed)
    #[arg(long, global = true)]
    zkey: Option<String>,
    /// URL to download the proving key from
    #[arg(long, global = true)]
    remote_url: Option<String>,
    /// Minimum size in bytes for the local proving key to count as complete
    #[arg(long, global = true)]
    min_size: Option<u64>,
    /// Prove command template (placeholders: {zkey}, {inputs})
    #[arg(long, global = true)]
    prove_cmd: Option<String>,
    /// Verify command template (placeholders: {zkey}, {proof})
    #[arg(long, global = true)]
    verify_cmd: Option<String>,
    /// Timeout in seconds for each prover invocation
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the proving key if missing or incomplete
    Fetch {
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Prove knowledge of a and b such that a * b = c
    Prove {
        /// Value for signal a (decimal integer)
        #[arg(long, allow_hyphen_values = true)]
        a: String,
        /// Value for signal b (decimal integer)
        #[arg(long, allow_hyphen_values = true)]
        b: String,
        /// Write the proof to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Verify the proof right after generating it
        #[arg(long)]
        verify: bool,
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Verify a proof written by `prove --out`
    Verify {
        /// Path to proof file
        #[arg(long)]
        proof: PathBuf,
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("ZKEY_PROVER_LOG").unwrap_or_else(|_| {
        if verbose { "zkey_prover=debug".to_string() } else { "zkey_prover=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn resolve_config(overrides: Overrides) -> AppResult<ProverConfig> {
    let mut config = match &overrides.config {
        Some(path) => load_config(path)?,
        None => ProverConfig::default(),
    };
    if let Some(zkey) = overrides.zkey {
        config.artifact.local_path = Some(zkey);
    }
    if let Some(url) = overrides.remote_url {
        config.artifact.remote_url = url;
    }
    if let Some(min) = overrides.min_size {
        config.artifact.min_size_bytes = min;
    }
    if let Some(cmd) = overrides.prove_cmd {
        config.engine.prove_template = Some(cmd);
    }
    if let Some(cmd) = overrides.verify_cmd {
        config.engine.verify_template = Some(cmd);
    }
    if let Some(secs) = overrides.timeout {
        config.engine.timeout_secs = secs;
    }
    Ok(config)
}

async fn dispatch(command: Commands, config: ProverConfig) -> AppResult<()> {
    match command {
        Commands::Fetch { json } => fetch_cmd::run(&config, json).await,
        Commands::Prove { a, b, out, verify, json } => {
            prove_cmd::run(&config, a, b, out, json, verify).await
        }
        Commands::Verify { proof, json } => verify_cmd::run(&config, proof, json).await,
    }
}

#[tokio::main]
async fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match resolve_config(cli.overrides) {
        Ok(config) => dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
