//! LogSink - logs snapshot summaries via tracing

use contracts::{CaptureSnapshot, ContractError, SnapshotSink};
use tracing::{info, instrument};

/// Sink that logs snapshot summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_snapshot_summary(&self, snapshot: &CaptureSnapshot) {
        let stats = &snapshot.stats;
        let head = snapshot.packet.first().copied().unwrap_or_default();

        info!(
            sink = %self.name,
            sequence = snapshot.sequence,
            cycle = snapshot.cycle,
            packet_head = format_args!("{head:#010x}"),
            markers = stats.markers_aligned,
            realignments = stats.realignments,
            frame_starts = stats.frame_starts,
            pixels_written = stats.pixels_written,
            "CaptureSnapshot received"
        );
    }
}

impl SnapshotSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, snapshot),
        fields(sink = %self.name, sequence = snapshot.sequence)
    )]
    async fn write(&mut self, snapshot: &CaptureSnapshot) -> Result<(), ContractError> {
        self.log_snapshot_summary(snapshot);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
