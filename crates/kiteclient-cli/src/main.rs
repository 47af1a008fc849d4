//! kite - command-line access to the Kite trading API.
//!
//! Logs in with password + TOTP, keeps the session token encrypted in the
//! cache directory and prints API responses as JSON.

mod commands;
mod login;

use std::io;

use anyhow::Result;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kiteclient_core::Config;

use commands::Command;

/// Log file name inside the cache directory
const LOG_FILE: &str = "kite.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the file writer on drop.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file = config
        .cache_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE)));

    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn print_usage() {
    eprintln!(
        "Usage: kite <command> [args]

Commands:
  login [--save]                       Log in and store the session (--save keeps credentials in the keychain)
  logout [--forget]                    Remove the stored session (--forget also removes credentials)
  profile                              User profile
  margins [equity|commodity]           Margins for all or one segment
  orders                               Today's order book
  positions                            Net and day positions
  history <order_id>                   State history of one order
  quote <instrument>...                Full quotes, e.g. NSE:INFY
  ltp <instrument>...                  Last traded prices
  place <variety> <exchange> <symbol> <BUY|SELL> <qty> <product> <order_type> [key=value]...
  modify <variety> <order_id> [key=value]...
  cancel <variety> <order_id> [parent_order_id]
  snapshot                             Profile, margins and positions in one call

Credentials are read from KITE_USER_ID, KITE_PASSWORD and KITE_TOTP_SECRET,
then from the keychain, then prompted for."
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        print_usage();
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Ok(user_id) = std::env::var(login::USER_ID_VAR) {
        config.user_id = Some(user_id);
    }

    let _guard = init_tracing(&config);
    info!("kite starting");

    let command = Command::parse(&args)?;
    debug!(?command, "Parsed command");

    match command {
        Command::Login { save } => login::login(&mut config, save).await,
        Command::Logout { forget } => login::logout(&config, forget),
        command => {
            let output = login::run_authenticated(&mut config, &command).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}
