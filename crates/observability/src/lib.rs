//! # Observability
//!
//! 接收器的日志与指标出口。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON / Pretty / Compact)，`-q` 时可忽略 RUST_LOG
//! - Prometheus 导出，快照间隔直方图按周期数分桶
//! - CaptureSnapshot 指标收集与区间统计
//!
//! ## 使用示例
//!
//! ```ignore
//! let config = ObservabilityConfig::logging_only(LogFormat::Compact, "info");
//! observability::init_with_config(config)?;
//!
//! observability::record_snapshot(&receiver.snapshot());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::Subscriber;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

pub use crate::metrics::{
    record_sink_totals, record_snapshot, record_snapshot_interval, MetricsSummary,
    ReceiverMetricsAggregator, RunningStats, StatsSummary,
};

/// 快照间隔直方图的分桶 (周期数)
const SNAPSHOT_INTERVAL_BUCKETS: &[f64] = &[
    1e3, 1e4, 1e5, 2.5e5, 5e5, 1e6, 2.5e6, 5e6, 1e7,
];

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别
    pub default_log_level: String,
    /// 是否读取 RUST_LOG
    pub env_filter: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::logging_only(LogFormat::default(), "info")
    }
}

impl ObservabilityConfig {
    /// 仅日志，不启动 Prometheus
    pub fn logging_only(log_format: LogFormat, default_log_level: impl Into<String>) -> Self {
        Self {
            log_format,
            metrics_port: None,
            default_log_level: default_log_level.into(),
            env_filter: true,
        }
    }

    /// 同时在 `port` 上导出 Prometheus 指标
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    fn filter(&self) -> EnvFilter {
        if self.env_filter {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
        } else {
            EnvFilter::new(&self.default_log_level)
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

impl LogFormat {
    fn layer<S>(self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        match self {
            Self::Json => fmt::layer()
                .json()
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            Self::Pretty => fmt::layer().pretty().boxed(),
            Self::Compact => fmt::layer().compact().with_target(false).boxed(),
        }
    }
}

/// 按默认配置初始化 (JSON 日志，无指标导出)
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(config.filter())
        .with(config.log_format.layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_exporter(port)
}

fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("csi_rx_snapshot_interval_cycles".to_string()),
            SNAPSHOT_INTERVAL_BUCKETS,
        )
        .context("Invalid snapshot interval buckets")?
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    crate::metrics::describe();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_logs_only() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.default_log_level, "info");
        assert!(config.env_filter);
    }

    #[test]
    fn test_metrics_port_builder() {
        let config = ObservabilityConfig::logging_only(LogFormat::Compact, "debug")
            .with_metrics_port(9100);
        assert_eq!(config.metrics_port, Some(9100));
        assert_eq!(config.default_log_level, "debug");
    }

    #[test]
    fn test_interval_buckets_ascend() {
        assert!(SNAPSHOT_INTERVAL_BUCKETS.windows(2).all(|w| w[0] < w[1]));
    }
}
