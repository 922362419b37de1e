//! Receiver 指标收集模块
//!
//! 基于 CaptureSnapshot 收集和统计接收链路的运行指标。

use contracts::{CaptureSnapshot, ReceiverStats};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// 向已安装的 recorder 注册指标说明
pub(crate) fn describe() {
    describe_counter!("csi_rx_cycles_total", Unit::Count, "Byte-clock cycles stepped");
    describe_counter!(
        "csi_rx_markers_aligned_total",
        Unit::Count,
        "Aligned words carrying every lane's sync marker"
    );
    describe_counter!(
        "csi_rx_realignments_total",
        Unit::Count,
        "Settled markers by pointer outcome"
    );
    describe_counter!(
        "csi_rx_packet_words_dropped_total",
        Unit::Count,
        "Words past the captured packet head"
    );
    describe_counter!(
        "csi_rx_pixels_suppressed_total",
        Unit::Count,
        "Decimation hits outside the preview buffer"
    );
    describe_counter!(
        "csi_rx_snapshots_dispatched_total",
        Unit::Count,
        "Snapshots per sink and delivery status"
    );
    describe_gauge!(
        "csi_rx_frame_coverage_ratio",
        Unit::Percent,
        "Share of non-zero preview samples"
    );
    describe_histogram!(
        "csi_rx_snapshot_interval_cycles",
        Unit::Count,
        "Cycles between consecutive snapshots"
    );
}

/// 从 CaptureSnapshot 记录指标
///
/// 每次产生快照时调用。计数器用累计值覆盖 (`absolute`)，
/// 因此重复调用同一快照不会重复计数。
pub fn record_snapshot(snapshot: &CaptureSnapshot) {
    let stats = &snapshot.stats;

    counter!("csi_rx_snapshots_total").increment(1);
    gauge!("csi_rx_last_snapshot_sequence").set(snapshot.sequence as f64);

    counter!("csi_rx_cycles_total").absolute(stats.cycles);
    counter!("csi_rx_markers_aligned_total").absolute(stats.markers_aligned);
    counter!("csi_rx_capture_restarts_total").absolute(stats.capture_restarts);
    counter!("csi_rx_packet_words_captured_total").absolute(stats.packet_words_captured);
    counter!("csi_rx_packet_words_dropped_total").absolute(stats.packet_words_dropped);
    counter!("csi_rx_pixel_bursts_total").absolute(stats.pixel_bursts);
    counter!("csi_rx_other_packets_total").absolute(stats.other_packets);
    counter!("csi_rx_pixels_written_total").absolute(stats.pixels_written);
    counter!("csi_rx_pixels_suppressed_total").absolute(stats.pixels_suppressed);

    gauge!("csi_rx_frame_coverage_ratio").set(frame_coverage(snapshot));
}

/// 记录 sink 的累计分发结果
pub fn record_sink_totals(sink_name: &str, written: u64, failed: u64, superseded: u64) {
    for (status, value) in [
        ("success", written),
        ("failure", failed),
        ("superseded", superseded),
    ] {
        counter!(
            "csi_rx_snapshots_dispatched_total",
            "sink" => sink_name.to_string(),
            "status" => status
        )
        .absolute(value);
    }
}

/// 记录两次快照之间的周期数
pub fn record_snapshot_interval(cycles: u64) {
    histogram!("csi_rx_snapshot_interval_cycles").record(cycles as f64);
}

/// 帧缓冲中非零样本的比例
fn frame_coverage(snapshot: &CaptureSnapshot) -> f64 {
    let total = snapshot.frame.pixels.len();
    if total == 0 {
        return 0.0;
    }
    let filled = snapshot.frame.pixels.iter().filter(|&&p| p != 0).count();
    filled as f64 / total as f64
}

/// 接收指标聚合器
///
/// 在内存中按快照间隔聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ReceiverMetricsAggregator {
    /// 快照数
    pub total_snapshots: u64,

    /// 最近一次快照的累计计数
    pub last_stats: ReceiverStats,

    /// 每个间隔内写入的像素数
    pub pixels_per_interval: RunningStats,

    /// 每个间隔内的重对齐次数
    pub realignments_per_interval: RunningStats,

    /// 每个间隔内对齐成功的 marker 数
    pub markers_per_interval: RunningStats,

    /// 帧缓冲覆盖率
    pub coverage: RunningStats,
}

impl ReceiverMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, snapshot: &CaptureSnapshot) {
        let delta = snapshot.stats.since(&self.last_stats);

        self.total_snapshots += 1;
        self.pixels_per_interval.push(delta.pixels_written as f64);
        self.realignments_per_interval
            .push(delta.realignments as f64);
        self.markers_per_interval.push(delta.markers_aligned as f64);
        self.coverage.push(frame_coverage(snapshot));
        self.last_stats = snapshot.stats;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let stats = &self.last_stats;
        let triggers = stats.realignments + stats.realignments_rejected;
        MetricsSummary {
            total_snapshots: self.total_snapshots,
            cycles: stats.cycles,
            realignments: stats.realignments,
            realignments_rejected: stats.realignments_rejected,
            reject_rate: if triggers > 0 {
                stats.realignments_rejected as f64 / triggers as f64 * 100.0
            } else {
                0.0
            },
            frame_starts: stats.frame_starts,
            pixels_written: stats.pixels_written,
            pixels_suppressed: stats.pixels_suppressed,
            pixels_per_interval: StatsSummary::from(&self.pixels_per_interval),
            coverage: StatsSummary::from(&self.coverage),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_snapshots: u64,
    pub cycles: u64,
    pub realignments: u64,
    pub realignments_rejected: u64,
    pub reject_rate: f64,
    pub frame_starts: u64,
    pub pixels_written: u64,
    pub pixels_suppressed: u64,
    pub pixels_per_interval: StatsSummary,
    pub coverage: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Receiver Metrics Summary ===")?;
        writeln!(f, "Snapshots: {}", self.total_snapshots)?;
        writeln!(f, "Cycles: {}", self.cycles)?;
        writeln!(
            f,
            "Realignments: {} committed, {} rejected ({:.2}%)",
            self.realignments, self.realignments_rejected, self.reject_rate
        )?;
        writeln!(f, "Frame starts: {}", self.frame_starts)?;
        writeln!(
            f,
            "Pixels: {} written, {} suppressed",
            self.pixels_written, self.pixels_suppressed
        )?;
        writeln!(f, "Pixels per snapshot: {}", self.pixels_per_interval)?;
        writeln!(f, "Frame coverage: {}", self.coverage)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FrameSnapshot;

    fn snapshot(sequence: u64, pixels_written: u64, filled: usize) -> CaptureSnapshot {
        let mut pixels = vec![0u16; 8];
        for p in pixels.iter_mut().take(filled) {
            *p = 0x1234;
        }
        CaptureSnapshot {
            sequence,
            cycle: sequence * 10,
            data_width: 32,
            packet: vec![0; 4],
            frame: FrameSnapshot {
                width: 4,
                height: 2,
                pixels,
            },
            stats: ReceiverStats {
                cycles: sequence * 10,
                realignments: sequence,
                realignments_rejected: 1,
                pixels_written,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_uses_interval_deltas() {
        let mut aggregator = ReceiverMetricsAggregator::new();

        aggregator.update(&snapshot(1, 4, 2));
        aggregator.update(&snapshot(2, 10, 8));

        assert_eq!(aggregator.total_snapshots, 2);
        // 4 then 6 pixels per interval
        assert!((aggregator.pixels_per_interval.mean() - 5.0).abs() < 1e-10);
        assert!((aggregator.coverage.max() - 1.0).abs() < 1e-10);
        assert!((aggregator.coverage.min() - 0.25).abs() < 1e-10);

        let summary = aggregator.summary();
        assert_eq!(summary.pixels_written, 10);
        assert_eq!(summary.realignments, 2);
        assert!((summary.reject_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut aggregator = ReceiverMetricsAggregator::new();
        aggregator.update(&snapshot(1, 4, 2));
        aggregator.reset();
        assert_eq!(aggregator.total_snapshots, 0);
        assert_eq!(aggregator.last_stats, ReceiverStats::default());
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_snapshots: 3,
            cycles: 1000,
            realignments: 95,
            realignments_rejected: 5,
            reject_rate: 5.0,
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Cycles: 1000"));
        assert!(output.contains("95 committed, 5 rejected (5.00%)"));
        assert!(output.contains("Frame coverage: N/A"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_snapshot(&snapshot(1, 4, 2));
        record_sink_totals("log", 3, 0, 1);
        record_snapshot_interval(100);
    }
}
