//! # Readout
//!
//! 捕获缓冲区的外部读取模块。
//!
//! 负责：
//! - 消费 `CaptureSnapshot`
//! - Hex dump 与 GBRG 彩色预览 (PNG / ANSI)
//! - Fan-out 到多个 sinks，隔离慢 sink，不阻塞接收主链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod render;
pub mod sinks;

pub use contracts::{CaptureSnapshot, SnapshotSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::ReadoutError;
pub use handle::{Offer, SinkHandle};
pub use metrics::{SinkMetrics, SinkMetricsSnapshot};
pub use render::{hex_dump, BayerPreview};
pub use sinks::{FileSink, FileSinkConfig, LogSink, TerminalSink};
