// SPDX-License-Identifier: GPL-3.0-only

use camera_sender::Config;
use camera_sender::VendorClass;
use camera_sender::constants::app_info;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-sender")]
#[command(about = "Hardware-adaptive camera sender with FEC shard output")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (default: ~/.config/camera-sender/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Camera device node
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Data shards per access unit (k)
    #[arg(short = 'k', long, global = true)]
    data_shards: Option<u32>,

    /// Parity shards per access unit (r)
    #[arg(short = 'r', long, global = true)]
    parity_shards: Option<u32>,

    /// Skip PCI detection and assume this GPU vendor
    #[arg(long, global = true, value_enum)]
    vendor: Option<VendorArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show GPU vendor, available accelerated elements and resolved roles
    Detect,

    /// Print the pipeline that would be built, without running it
    Topology {
        /// Describe the preview pipeline instead of the streaming one
        #[arg(short, long)]
        preview: bool,
    },

    /// Show the camera on screen only
    Preview,

    /// Capture, encode and produce FEC shards (default)
    Send,
}

#[derive(Clone, Copy, ValueEnum)]
enum VendorArg {
    Intel,
    Nvidia,
    Amd,
    None,
}

impl From<VendorArg> for VendorClass {
    fn from(arg: VendorArg) -> Self {
        match arg {
            VendorArg::Intel => VendorClass::IntelIntegrated,
            VendorArg::Nvidia => VendorClass::Nvidia,
            VendorArg::Amd => VendorClass::Amd,
            VendorArg::None => VendorClass::Unknown,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_sender=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Detect) => cli::detect(&config),
        Some(Commands::Topology { preview }) => cli::topology(&config, preview),
        Some(Commands::Preview) => cli::preview(&config),
        Some(Commands::Send) | None => cli::send(&config),
    }
}

/// Config file, then command-line overrides, then validation
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    if let Some(k) = cli.data_shards {
        config.fec.data_shards = k;
    }
    if let Some(r) = cli.parity_shards {
        config.fec.parity_shards = r;
    }
    if let Some(vendor) = cli.vendor {
        config.vendor_override = Some(vendor.into());
    }

    config.validate()?;
    Ok(config)
}
