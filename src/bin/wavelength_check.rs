//! Connect, read the sweep cycle count, tune the laser and read the wavelength back.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use santec_tsl::config::{SessionConfig, DEFAULT_PORT};
use santec_tsl::devices::tsl::TSL;
use tracing::info;

const DEFAULT_HOST: &str = "192.168.0.200";

#[derive(Parser, Debug)]
#[command(name = "wavelength_check")]
#[command(about = "Tune a Santec TSL and read the wavelength back")]
struct Args {
    /// Laser IP address or hostname
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// JSON session config; overrides --host and --port
    #[arg(long)]
    config: Option<String>,

    /// Target wavelength in nm
    #[arg(short, long, default_value_t = 1638.0)]
    wavelength: f64,

    /// Seconds to wait for the laser to settle before reading back
    #[arg(long, default_value_t = 1.0)]
    settle: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::new(&args.host, args.port),
    };

    info!("Connecting to TSL at {}:{}...", cfg.host, cfg.port);
    let mut tsl = TSL::connect(&cfg).context("Unable to connect to the laser")?;

    let cycles = tsl.read_sweep_cycles()?;
    info!("Sweep cycles: {}", cycles);

    tsl.set_wavelength(args.wavelength)?;
    std::thread::sleep(Duration::from_secs_f64(args.settle.max(0.0).min(3600.0)));

    println!("{}", tsl.read_wavelength()?);
    Ok(())
}
