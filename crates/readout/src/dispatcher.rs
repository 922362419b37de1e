//! Dispatcher - fans capture snapshots out to sinks

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{CaptureSnapshot, SinkConfig, SinkType};

use crate::error::ReadoutError;
use crate::handle::SinkHandle;
use crate::metrics::SinkMetricsSnapshot;
use crate::sinks::{FileSink, LogSink, TerminalSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<CaptureSnapshot>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<CaptureSnapshot>) -> Self {
        Self { config, input_rx }
    }

    /// Spawn every configured sink and return the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub fn build(self) -> Result<Dispatcher, ReadoutError> {
        let handles = self
            .config
            .sinks
            .iter()
            .map(create_sink_handle)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, ReadoutError> {
    match config.sink_type {
        SinkType::Log => Ok(SinkHandle::spawn(
            LogSink::new(&config.name),
            config.queue_capacity,
        )),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| ReadoutError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Terminal => Ok(SinkHandle::spawn(
            TerminalSink::new(&config.name),
            config.queue_capacity,
        )),
    }
}

/// Fans snapshots out to every sink; a slow sink only loses its own superseded copies
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<CaptureSnapshot>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<CaptureSnapshot>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, SinkMetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run until the input channel closes, then drain and close every sink
    ///
    /// Returns the final per-sink metrics.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, SinkMetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut snapshot_count: u64 = 0;
        while let Some(snapshot) = self.input_rx.recv().await {
            snapshot_count += 1;
            let snapshot = Arc::new(snapshot);
            for handle in &self.handles {
                handle.offer(Arc::clone(&snapshot));
            }
            debug!(sequence = snapshot.sequence, "Snapshot dispatched");
        }

        info!(
            snapshots = snapshot_count,
            "Dispatcher input closed, shutting down"
        );

        let mut report = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let metrics = Arc::clone(handle.metrics());
            handle.shutdown().await;
            report.push((name, metrics.snapshot()));
        }

        info!("Dispatcher shutdown complete");
        report
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, SinkMetricsSnapshot)>> {
        tokio::spawn(self.run())
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<CaptureSnapshot>,
) -> Result<Dispatcher, ReadoutError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build()
}
