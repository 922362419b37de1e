//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::ReceiverStats;
use observability::ReceiverMetricsAggregator;
use readout::SinkMetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Cycles stepped
    pub cycles: u64,

    /// Snapshots handed to the dispatcher
    pub snapshots: u64,

    /// Snapshots taken after the dispatcher went away
    pub snapshots_lost: u64,

    /// Stopped by a shutdown signal
    pub interrupted: bool,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sinks configured
    pub active_sinks: usize,

    /// Final receiver counters
    pub receiver: ReceiverStats,

    /// Per-snapshot aggregation
    pub receiver_metrics: ReceiverMetricsAggregator,

    /// Final per-sink metrics
    pub sink_reports: Vec<(String, SinkMetricsSnapshot)>,
}

impl PipelineStats {
    /// Simulated cycles per wall-clock second
    pub fn cycles_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.cycles as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Cycles: {}", self.cycles);
        println!("   ├─ Cycles/s: {:.0}", self.cycles_per_second());
        println!("   ├─ Snapshots: {}", self.snapshots);
        if self.snapshots_lost > 0 {
            println!("   ├─ Snapshots lost: {}", self.snapshots_lost);
        }
        println!("   ├─ Interrupted: {}", self.interrupted);
        println!("   └─ Active sinks: {}", self.active_sinks);

        let rx = &self.receiver;
        println!("\n🔀 Word Aligner");
        println!("   ├─ Aligned markers: {}", rx.markers_aligned);
        println!("   ├─ Realignments: {}", rx.realignments);
        println!("   └─ Rejected realignments: {}", rx.realignments_rejected);

        println!("\n📦 Packet Capture");
        println!("   ├─ Restarts: {}", rx.capture_restarts);
        println!("   ├─ Words captured: {}", rx.packet_words_captured);
        println!("   └─ Words dropped: {}", rx.packet_words_dropped);

        println!("\n🖼  Image Capture");
        println!("   ├─ Frame starts: {}", rx.frame_starts);
        println!("   ├─ Pixel bursts: {}", rx.pixel_bursts);
        println!("   ├─ Other packets: {}", rx.other_packets);
        println!("   ├─ Pixels written: {}", rx.pixels_written);
        println!("   └─ Pixels suppressed: {}", rx.pixels_suppressed);

        let summary = self.receiver_metrics.summary();
        println!("\n📈 Per Snapshot");
        println!("   ├─ Pixels written: {}", summary.pixels_per_interval);
        println!("   └─ Frame coverage: {}", summary.coverage);

        if !self.sink_reports.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, m)) in self.sink_reports.iter().enumerate() {
                let prefix = if i == self.sink_reports.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {} {}: written={} failed={} superseded={}",
                    prefix, name, m.written, m.failed, m.superseded
                );
            }
        }

        println!();
    }
}
