//! Print the laser's identity and sweep configuration as JSON.

use anyhow::Result;
use clap::Parser;
use santec_tsl::config::{ReadMode, SessionConfig, DEFAULT_PORT};
use santec_tsl::devices::tsl::TSL;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "sweep_state")]
#[command(about = "Dump identity and sweep settings of a Santec TSL")]
struct Args {
    #[arg(long, default_value = "192.168.0.200")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// JSON session config; overrides --host and --port
    #[arg(long)]
    config: Option<String>,

    /// Use one read per reply instead of waiting for the newline
    #[arg(long)]
    single_read: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::new(&args.host, args.port),
    };
    if args.single_read {
        cfg.read_mode = ReadMode::Single;
    }

    let mut tsl = TSL::connect(&cfg)?;
    let identity = tsl.get_identity()?;
    let sweep = tsl.get_sweep_settings()?;
    tsl.close();

    println!("{}", serde_json::to_string_pretty(&json!({ "identity": identity, "sweep": sweep }))?);
    Ok(())
}
