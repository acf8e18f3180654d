//! Brand audit CLI
//!
//! Ingests reference fonts for a brand kit and audits rendered documents
//! against it.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

use commands::audit::AuditCommand;
use commands::ingest::IngestFontCommand;

#[derive(Parser)]
#[command(
    name = "brand-audit",
    version,
    about = "Audit rendered documents against a brand kit",
    after_help = "EXAMPLES:\n  \
                  # Build glyph embeddings for every font listed in the kit\n  \
                  brand-audit ingest-font --kit brand.yaml --weights glyph_encoder.safetensors --store ./glyphs\n\n  \
                  # Audit a three-page document\n  \
                  brand-audit audit --kit brand.yaml --manifest doc.json --pages p1.png p2.png p3.png \\\n    \
                  --store ./glyphs --models models.yaml --output report.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render, encode and store reference glyphs of brand fonts
    IngestFont(IngestFontCommand),

    /// Audit document pages against a brand kit
    Audit(AuditCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Cap rayon workers the same way ONNX intra-op threads are capped
    if let Ok(threads) = std::env::var("BRAND_AUDIT_THREADS") {
        if let Ok(num_threads) = threads.parse::<usize>() {
            ThreadPoolBuilder::new().num_threads(num_threads).build_global().ok();
        }
    }

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::IngestFont(cmd) => cmd.execute(),
        Commands::Audit(cmd) => cmd.execute().await,
    }
}
