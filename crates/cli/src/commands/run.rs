//! `run` command implementation.

use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use contracts::{ReceiverBlueprint, SourceConfig, TraceSourceConfig};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::ensure_config_exists;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    ensure_config_exists(&args.config)?;

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref path) = args.trace {
        info!(trace = %path.display(), "Replaying trace instead of configured source");
        blueprint.source = SourceConfig::Trace(TraceSourceConfig { path: path.clone() });
    }

    for warning in config_loader::collect_warnings(&blueprint) {
        warn!("{}", warning);
    }

    info!(
        lanes = blueprint.receiver.aligner.num_lanes,
        lane_width = blueprint.receiver.aligner.lane_width,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_cycles: (args.max_cycles > 0).then_some(args.max_cycles),
        snapshot_every: (args.snapshot_every > 0).then_some(args.snapshot_every),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let stop = pipeline.stop_handle();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping pipeline...");
        stop.store(true, Ordering::Relaxed);
    });

    info!("Starting pipeline...");
    let result = pipeline.run().await;
    signal_task.abort();

    let stats = result.context("Pipeline execution failed")?;
    info!(
        cycles = stats.cycles,
        snapshots = stats.snapshots,
        interrupted = stats.interrupted,
        "Pipeline completed"
    );
    stats.print_summary();

    info!("csi-rx finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &ReceiverBlueprint) {
    let rx = &blueprint.receiver;
    println!("\n=== Configuration Summary ===\n");
    println!("Receiver:");
    println!(
        "  Lanes: {} x {} bits ({}-bit word)",
        rx.aligner.num_lanes,
        rx.aligner.lane_width,
        rx.aligner.geometry().data_width()
    );
    println!("  Aligner depth: {}", rx.aligner.depth);
    println!("  Packet capture depth: {}", rx.packet.depth);
    println!(
        "  Image: 1/{} x 1/{} into {}x{}",
        rx.image.subsample_x, rx.image.subsample_y, rx.image.out_width, rx.image.out_height
    );

    println!("\nSource:");
    match &blueprint.source {
        SourceConfig::Synthetic(s) => {
            println!(
                "  Synthetic: {} frame(s), {} lines x {} words",
                s.frames, s.lines, s.line_words
            );
            println!("  Lane skews: {:?}", blueprint.lane_skews());
        }
        SourceConfig::Trace(t) => println!("  Trace: {}", t.path.display()),
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
