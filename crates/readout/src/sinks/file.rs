//! FileSink - writes each snapshot into its own directory
//!
//! Layout: `<base_path>/<sequence>/{packet.hex, preview.png, stats.json}`

use contracts::{CaptureSnapshot, ContractError, ReceiverStats, SnapshotSink};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

use crate::render::{hex_dump, BayerPreview};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Also write the preview PNG
    pub write_preview: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let write_preview = params
            .get("preview")
            .is_none_or(|v| !matches!(v.as_str(), "false" | "0" | "no"));

        Self {
            base_path,
            write_preview,
        }
    }
}

#[derive(Serialize)]
struct StatsRecord<'a> {
    sequence: u64,
    cycle: u64,
    data_width: u32,
    frame_width: u32,
    frame_height: u32,
    stats: &'a ReceiverStats,
}

/// Sink that persists snapshots to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
}

impl FileSink {
    /// Create a new FileSink, creating the base directory
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    /// Directory a snapshot is written to
    pub fn snapshot_dir(&self, sequence: u64) -> PathBuf {
        self.config.base_path.join(format!("{sequence:06}"))
    }

    fn write_snapshot_to_disk(&self, snapshot: &CaptureSnapshot) -> std::io::Result<()> {
        let dir = self.snapshot_dir(snapshot.sequence);
        fs::create_dir_all(&dir)?;

        // 1. Packet capture
        fs::write(
            dir.join("packet.hex"),
            hex_dump(&snapshot.packet, snapshot.data_width),
        )?;

        // 2. Frame preview
        if self.config.write_preview {
            BayerPreview::from_frame(&snapshot.frame)
                .save_png(dir.join("preview.png"))
                .map_err(std::io::Error::other)?;
        }

        // 3. Counters
        let record = StatsRecord {
            sequence: snapshot.sequence,
            cycle: snapshot.cycle,
            data_width: snapshot.data_width,
            frame_width: snapshot.frame.width,
            frame_height: snapshot.frame.height,
            stats: &snapshot.stats,
        };
        let file = File::create(dir.join("stats.json"))?;
        serde_json::to_writer_pretty(file, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        Ok(())
    }

    fn persist_snapshot(&self, snapshot: &CaptureSnapshot) -> Result<(), ContractError> {
        self.write_snapshot_to_disk(snapshot).map_err(|e| {
            error!(sink = %self.name, sequence = snapshot.sequence, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl SnapshotSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, snapshot),
        fields(sink = %self.name, sequence = snapshot.sequence)
    )]
    async fn write(&mut self, snapshot: &CaptureSnapshot) -> Result<(), ContractError> {
        self.persist_snapshot(snapshot)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::snapshot;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_write() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().to_path_buf(),
            write_preview: true,
        };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.write(&snapshot(7)).await.unwrap();
        sink.flush().await.unwrap();

        let out = dir.path().join("000007");
        let hex = fs::read_to_string(out.join("packet.hex")).unwrap();
        assert_eq!(hex.lines().collect::<Vec<_>>(), ["2b000780", "00000001", "00000002", "00000003"]);

        let preview = image::open(out.join("preview.png")).unwrap();
        assert_eq!((preview.width(), preview.height()), (2, 1));

        let stats: serde_json::Value =
            serde_json::from_reader(File::open(out.join("stats.json")).unwrap()).unwrap();
        assert_eq!(stats["sequence"], 7);
        assert_eq!(stats["cycle"], 700);
        assert_eq!(stats["stats"]["pixels_written"], 0);
    }

    #[tokio::test]
    async fn test_preview_can_be_disabled() {
        let dir = tempdir().unwrap();
        let params = HashMap::from([
            ("base_path".to_string(), dir.path().display().to_string()),
            ("preview".to_string(), "false".to_string()),
        ]);
        let mut sink = FileSink::from_params("no_preview", &params).unwrap();
        sink.write(&snapshot(0)).await.unwrap();

        let out = sink.snapshot_dir(0);
        assert!(out.join("packet.hex").exists());
        assert!(!out.join("preview.png").exists());
    }
}
