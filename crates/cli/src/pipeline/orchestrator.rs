//! Pipeline orchestrator - coordinates all components.
//!
//! The receiver steps on a blocking task; snapshots cross a bounded channel to
//! the dispatcher, which runs on the async runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{CaptureSnapshot, LaneSource, ReceiverBlueprint, ReceiverStats};
use csi_rx::Receiver;
use observability::{
    record_sink_totals, record_snapshot, record_snapshot_interval, ReceiverMetricsAggregator,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The receiver blueprint
    pub blueprint: ReceiverBlueprint,

    /// Maximum number of cycles to step (None = until the source ends)
    pub max_cycles: Option<u64>,

    /// Snapshot period in cycles (None = only the final snapshot)
    pub snapshot_every: Option<u64>,

    /// Snapshot channel capacity
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the stepping loop at the next cycle
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup source and receiver
        let source = lane_source::source_from_blueprint(blueprint)
            .context("Failed to build lane source")?;
        let receiver =
            Receiver::new(blueprint.receiver.clone()).context("Failed to build receiver")?;
        receiver
            .check_source(&*source)
            .context("Source does not match receiver geometry")?;

        info!(
            lanes = blueprint.receiver.aligner.num_lanes,
            lane_width = blueprint.receiver.aligner.lane_width,
            depth = blueprint.receiver.aligner.depth,
            skews = ?blueprint.lane_skews(),
            "Receiver configured"
        );

        // Setup Dispatcher
        let (snapshot_tx, snapshot_rx) =
            mpsc::channel::<CaptureSnapshot>(self.config.buffer_size.max(1));

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - snapshots will be discarded");
        }

        let dispatcher = readout::create_dispatcher(blueprint.sinks.clone(), snapshot_rx)
            .context("Failed to create dispatcher")?;
        let active_sinks = blueprint.sinks.len();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        // Step the receiver off the async runtime
        let limits = RunLimits {
            max_cycles: self.config.max_cycles,
            snapshot_every: self.config.snapshot_every.filter(|n| *n > 0),
        };
        let stop = Arc::clone(&self.stop);
        let stepping = tokio::task::spawn_blocking(move || {
            let mut receiver = receiver;
            let mut source = source;
            step_receiver(&mut receiver, source.as_mut(), &snapshot_tx, limits, &stop)
        });

        let outcome = stepping
            .await
            .map_err(|e| CliError::pipeline_execution(e.to_string()))?;

        // Wait for dispatcher to flush
        info!("Stepping finished, flushing sinks...");
        let sink_reports = match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
        {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Timed out waiting for sinks to flush");
                Vec::new()
            }
        };

        for (name, metrics) in &sink_reports {
            record_sink_totals(name, metrics.written, metrics.failed, metrics.superseded);
        }

        let stats = PipelineStats {
            cycles: outcome.cycles,
            snapshots: outcome.snapshots,
            snapshots_lost: outcome.snapshots_lost,
            interrupted: outcome.interrupted,
            duration: start_time.elapsed(),
            active_sinks,
            receiver: outcome.receiver_stats,
            receiver_metrics: outcome.aggregator,
            sink_reports,
        };

        info!(
            cycles = stats.cycles,
            duration_secs = stats.duration.as_secs_f64(),
            cycles_per_sec = format!("{:.0}", stats.cycles_per_second()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy)]
struct RunLimits {
    max_cycles: Option<u64>,
    snapshot_every: Option<u64>,
}

#[derive(Debug, Default)]
struct SteppingOutcome {
    cycles: u64,
    snapshots: u64,
    snapshots_lost: u64,
    interrupted: bool,
    last_snapshot_cycle: Option<u64>,
    receiver_stats: ReceiverStats,
    aggregator: ReceiverMetricsAggregator,
}

/// Blocking stepping loop
///
/// Always ends with a snapshot of the final state unless one was just taken.
fn step_receiver(
    receiver: &mut Receiver,
    source: &mut dyn LaneSource,
    snapshot_tx: &mpsc::Sender<CaptureSnapshot>,
    limits: RunLimits,
    stop: &AtomicBool,
) -> SteppingOutcome {
    let mut outcome = SteppingOutcome::default();

    loop {
        if stop.load(Ordering::Relaxed) {
            warn!(cycles = outcome.cycles, "Stop requested");
            outcome.interrupted = true;
            break;
        }
        if limits.max_cycles.is_some_and(|max| outcome.cycles >= max) {
            info!(cycles = outcome.cycles, "Reached max cycles limit");
            break;
        }
        let Some(sample) = source.next_sample() else {
            debug!(cycles = outcome.cycles, "Source exhausted");
            break;
        };

        receiver.step(sample);
        outcome.cycles += 1;

        if limits
            .snapshot_every
            .is_some_and(|n| outcome.cycles % n == 0)
        {
            emit_snapshot(receiver, snapshot_tx, &mut outcome);
        }
    }

    if outcome.last_snapshot_cycle != Some(receiver.cycle()) {
        emit_snapshot(receiver, snapshot_tx, &mut outcome);
    }

    outcome.receiver_stats = *receiver.stats();
    outcome
}

fn emit_snapshot(
    receiver: &mut Receiver,
    snapshot_tx: &mpsc::Sender<CaptureSnapshot>,
    outcome: &mut SteppingOutcome,
) {
    let snapshot = receiver.snapshot();

    record_snapshot(&snapshot);
    record_snapshot_interval(snapshot.cycle - outcome.last_snapshot_cycle.unwrap_or(0));
    outcome.aggregator.update(&snapshot);
    outcome.last_snapshot_cycle = Some(snapshot.cycle);

    debug!(
        sequence = snapshot.sequence,
        cycle = snapshot.cycle,
        pixels_written = snapshot.stats.pixels_written,
        "Snapshot taken"
    );

    if snapshot_tx.blocking_send(snapshot).is_err() {
        outcome.snapshots_lost += 1;
        warn!("Dispatcher channel closed");
    } else {
        outcome.snapshots += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ReceiverConfig, SinkConfig, SinkType, SourceConfig, SyntheticSourceConfig,
    };

    fn blueprint() -> ReceiverBlueprint {
        ReceiverBlueprint {
            receiver: ReceiverConfig::default(),
            source: SourceConfig::Synthetic(SyntheticSourceConfig {
                frames: 2,
                lines: 18,
                line_words: 10,
                blanking_words: 2,
                idle_words: 4,
                lane_skews: vec![0, 1, 0, 1],
            }),
            sinks: vec![SinkConfig {
                name: "log".into(),
                sink_type: SinkType::Log,
                queue_capacity: 100,
                params: Default::default(),
            }],
            ..Default::default()
        }
    }

    fn config(snapshot_every: Option<u64>, max_cycles: Option<u64>) -> PipelineConfig {
        PipelineConfig {
            blueprint: blueprint(),
            max_cycles,
            snapshot_every,
            buffer_size: 4,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_pipeline_runs_skewed_synthetic_source() {
        let cycles_per_frame = match &blueprint().source {
            SourceConfig::Synthetic(s) => s.cycles_per_frame(),
            _ => unreachable!(),
        };

        let stats = Pipeline::new(config(Some(100), None)).run().await.unwrap();

        // Two frames plus one flush cycle for the largest skew
        assert_eq!(stats.cycles, 2 * cycles_per_frame + 1);
        assert!(!stats.interrupted);
        assert_eq!(stats.receiver.cycles, stats.cycles);
        assert_eq!(stats.receiver.frame_starts, 2);
        assert!(stats.receiver.realignments > 0);
        assert!(stats.receiver.pixels_written > 0);

        // Four periodic snapshots plus the final one
        assert_eq!(stats.snapshots, 5);
        assert_eq!(stats.sink_reports.len(), 1);
        assert_eq!(stats.sink_reports[0].1.written, 5);
        assert_eq!(stats.receiver_metrics.total_snapshots, 5);
    }

    #[tokio::test]
    async fn test_max_cycles_limits_run() {
        let stats = Pipeline::new(config(Some(10), Some(30))).run().await.unwrap();
        assert_eq!(stats.cycles, 30);
        // Final state was already captured at cycle 30
        assert_eq!(stats.snapshots, 3);
    }

    #[tokio::test]
    async fn test_stop_flag_interrupts_before_first_cycle() {
        let pipeline = Pipeline::new(config(None, None));
        pipeline.stop_handle().store(true, Ordering::Relaxed);

        let stats = pipeline.run().await.unwrap();
        assert!(stats.interrupted);
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.snapshots, 1);
    }

    #[test]
    fn test_step_receiver_counts_lost_snapshots() {
        let bp = blueprint();
        let mut receiver = Receiver::new(bp.receiver.clone()).unwrap();
        let mut source = lane_source::source_from_blueprint(&bp).unwrap();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let limits = RunLimits {
            max_cycles: Some(20),
            snapshot_every: Some(10),
        };
        let outcome = step_receiver(
            &mut receiver,
            source.as_mut(),
            &tx,
            limits,
            &AtomicBool::new(false),
        );
        assert_eq!(outcome.cycles, 20);
        assert_eq!(outcome.snapshots, 0);
        assert_eq!(outcome.snapshots_lost, 2);
        assert_eq!(outcome.aggregator.total_snapshots, 2);
    }
}
