//! Astral CLI - evaluate location claims and create signed fixes.
//!
//! ```text
//! astral evaluate <request.json>
//! astral create <signals.json> [plugin-name] [--signing-key <hex>]
//! astral keygen
//! ```

mod request;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use astral_core::security::{encode_public_key, signing_key_from_hex};
use astral_core::{AstralError, AstralResult, LocationProofPlugin, RawSignals, TrustRoot};
use astral_sdk::SignedFixPlugin;

use request::EvaluationRequest;

#[derive(Parser)]
#[command(name = "astral", about = "Location-proof evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a claim against the stamps in a request file.
    Evaluate {
        /// JSON request: config, plugins, claim and stamps.
        request: PathBuf,
    },
    /// Create and sign a stamp from raw signals.
    Create {
        /// JSON signals: lat, lon and observed_at (or start and end).
        signals: PathBuf,

        /// Plugin name recorded on the stamp.
        #[arg(default_value = "manual")]
        plugin: String,

        /// Hex Ed25519 seed; a fresh key is used when absent.
        #[arg(long, env = "ASTRAL_SIGNING_KEY", hide_env_values = true)]
        signing_key: Option<String>,
    },
    /// Print a fresh Ed25519 seed and its public key.
    Keygen,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::json!({ "class": e.class(), "error": e.to_string() })
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> AstralResult<String> {
    match command {
        Command::Evaluate { request: path } => {
            let request = EvaluationRequest::from_json(&read_file(&path)?)?;
            tracing::info!(
                stamps = request.stamps.len(),
                plugins = request.plugins.len(),
                "Evaluating {}",
                path.display()
            );
            let vector = request.evaluate().await?;
            Ok(serde_json::to_string_pretty(&vector)?)
        }
        Command::Create {
            signals,
            plugin: plugin_name,
            signing_key: seed,
        } => {
            let payload: serde_json::Value = serde_json::from_str(&read_file(&signals)?)?;

            let plugin = SignedFixPlugin::new(plugin_name.as_str(), TrustRoot::Unknown);
            let unsigned = plugin.create(RawSignals::new(plugin_name.as_str(), payload)).await?;
            let stamp = plugin.sign(unsigned, &signing_key(seed.as_deref())?).await?;
            Ok(serde_json::to_string_pretty(&stamp)?)
        }
        Command::Keygen => {
            let key = SigningKey::generate(&mut OsRng);
            Ok(serde_json::to_string_pretty(&serde_json::json!({
                "seed": hex::encode(key.to_bytes()),
                "public_key": encode_public_key(&key.verifying_key()),
            }))?)
        }
    }
}

fn read_file(path: &Path) -> AstralResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AstralError::Validation(format!("cannot read {}: {}", path.display(), e)))
}

/// Key from the given seed, or a fresh one whose public half is logged.
fn signing_key(seed: Option<&str>) -> AstralResult<SigningKey> {
    match seed {
        Some(seed) => signing_key_from_hex(seed),
        None => {
            let key = SigningKey::generate(&mut OsRng);
            tracing::warn!(
                public_key = %encode_public_key(&key.verifying_key()),
                "no signing key given, signing with an ephemeral key"
            );
            Ok(key)
        }
    }
}
