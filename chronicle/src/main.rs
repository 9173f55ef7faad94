//! Terminal client for The Chronicles of Darian.
//!
//! ```bash
//! GEMINI_API_KEY=... cargo run -p chronicle
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default filter) so stdout
//! stays the game transcript.

mod headless;

use chronicle_core::SessionConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "chronicle=info,chronicle_core=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let mut config = SessionConfig::from_env();
    if let Some(dir) = arg_value(&args, "--save-dir") {
        config = config.with_save_dir(dir);
    }
    if let Some(length) = arg_value(&args, "--length") {
        config = config.with_response_length(length.parse()?);
    }
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; turns are disabled until #key is used");
    }

    headless::run_headless(config).await?;
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_help() {
    println!("chronicle - a solo tabletop adventure narrated by Gemini");
    println!();
    println!("USAGE:");
    println!("    chronicle [--save-dir <dir>] [--length <short|normal|long>]");
    println!();
    println!("ENVIRONMENT:");
    println!("    GEMINI_API_KEY              Gemini API key");
    println!("    CHRONICLE_MODEL             Gemini model (default gemini-2.5-flash)");
    println!("    CHRONICLE_RESPONSE_LENGTH   short, normal or long");
    println!("    CHRONICLE_SAVE_DIR          Local save directory (default saves)");
    println!("    CHRONICLE_BLOB_UPLOAD_URL   Remote save upload endpoint");
    println!("    CHRONICLE_BLOB_BASE_URL     Remote save download base URL");
    println!("    RUST_LOG                    Log filter (logs go to stderr)");
}
