// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Reporting detected GPU and media capabilities
//! - Printing the stage graph that would be built
//! - Running the preview and streaming pipelines

use camera_sender::Config;
use camera_sender::fec::FecEncoder;
use camera_sender::gpu::{self, GstRegistryProbe, VendorClass};
use camera_sender::media::decoders::detect_hw_decoders;
use camera_sender::media::{
    ResolvedRoles, Role, RoleCapabilitySet, RoleResolver, log_capability_report,
    probe_capabilities,
};
use camera_sender::pipelines::{
    AccessUnitHandler, PreviewEngine, SenderEngine, StageGraph, TopologyBuilder,
    TopologySettings, Variant, install_stop_handler,
};
use camera_sender::transport::{LoggingShardSink, forward_shards};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Vendor from config override or PCI detection
fn vendor(config: &Config) -> VendorClass {
    match config.vendor_override {
        Some(vendor) => {
            info!(%vendor, "Using configured GPU vendor");
            vendor
        }
        None => gpu::detect_vendor(config.vendor_selection),
    }
}

fn resolve(config: &Config, probe: &GstRegistryProbe) -> ResolvedRoles {
    RoleResolver::new(probe).resolve_all(vendor(config))
}

fn build_graph(
    config: &Config,
    probe: &GstRegistryProbe,
    variant: Variant,
) -> Result<StageGraph, Box<dyn std::error::Error>> {
    let resolved = resolve(config, probe);
    let graph = TopologyBuilder::new(probe, TopologySettings::from(config)).build(&resolved, variant)?;
    Ok(graph)
}

/// Print vendor, capability inventory and resolved roles
pub fn detect(config: &Config) -> CliResult {
    let probe = GstRegistryProbe::new()?;

    let vendors = gpu::detect_vendors();
    let vendor = vendor(config);
    println!("Display controllers: {:?}", vendors);
    println!(
        "Selected vendor:     {} ({:?})",
        vendor, config.vendor_selection
    );
    println!();

    let capabilities = RoleCapabilitySet::standard();
    let report = probe_capabilities(&probe, &capabilities);
    log_capability_report(&report);
    print!("{}", report);
    println!();

    let decoders = detect_hw_decoders(&probe, &capabilities);
    if !decoders.is_empty() {
        let names: Vec<String> = decoders.iter().map(ToString::to_string).collect();
        println!("Hardware JPEG decoders: {}", names.join(", "));
        println!();
    }

    let resolved = RoleResolver::new(&probe).resolve_all(vendor);
    println!("Resolved roles:");
    for role in Role::ALL {
        match resolved.get(role) {
            Some(r) => println!("  {:<9} {} ({})", role.display_name(), r.id, r.family),
            None => println!("  {:<9} software", role.display_name()),
        }
    }

    Ok(())
}

/// Print the stage graph without running it
pub fn topology(config: &Config, preview: bool) -> CliResult {
    let probe = GstRegistryProbe::new()?;
    let variant = if preview {
        Variant::Preview
    } else {
        Variant::Streaming
    };
    let graph = build_graph(config, &probe, variant)?;
    println!("{}", graph);
    Ok(())
}

/// Run the display-only pipeline until Ctrl+C or end of stream
pub fn preview(config: &Config) -> CliResult {
    let probe = GstRegistryProbe::new()?;
    let graph = build_graph(config, &probe, Variant::Preview)?;

    let engine = PreviewEngine::new(&graph)?;
    let stop = install_stop_handler()?;

    println!("Previewing {} (press Ctrl+C to stop)", config.device);
    engine.start()?;
    engine.run_until(&stop)?;
    Ok(())
}

/// Run the streaming pipeline until Ctrl+C, end of stream, or error
pub fn send(config: &Config) -> CliResult {
    let probe = GstRegistryProbe::new()?;
    let graph = build_graph(config, &probe, Variant::Streaming)?;

    // Tables are built here, before the first access unit arrives
    let encoder = FecEncoder::new(config.fec)?;

    let rt = tokio::runtime::Runtime::new()?;
    let (tx, rx) = mpsc::channel(config.shard_queue_depth);
    let forwarder = rt.spawn(forward_shards(rx, LoggingShardSink::default()));

    let handler = AccessUnitHandler::new(encoder, tx, config.halt_on_fec_failure);
    let engine = SenderEngine::new(&graph, handler)?;
    let stop = install_stop_handler()?;

    println!(
        "Streaming {} with k={} r={} (press Ctrl+C to stop)",
        config.device, config.fec.data_shards, config.fec.parity_shards
    );
    engine.start()?;
    let result = engine.run_until(&stop);
    let stats = engine.stats();

    // Dropping the pipeline releases the hand-off callback and its sender
    drop(engine);
    let forwarded = rt.block_on(async {
        tokio::time::timeout(
            Duration::from_secs(camera_sender::constants::timing::STOP_TIMEOUT_SECS),
            forwarder,
        )
        .await
    });
    match forwarded {
        Ok(Ok(Ok(summary))) => info!(sets = summary.sets, failed = summary.failed, "Transport drained"),
        Ok(Ok(Err(e))) => warn!(error = %e, "Transport finished with error"),
        Ok(Err(e)) => warn!(error = %e, "Transport task failed"),
        Err(_) => warn!("Transport did not drain in time"),
    }

    println!(
        "Access units: {}  shard sets: {}  dropped: {}  encode failures: {}",
        stats.access_units, stats.shard_sets, stats.dropped, stats.encode_failures
    );
    result?;
    Ok(())
}
