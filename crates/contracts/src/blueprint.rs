//! ReceiverBlueprint - Config Loader 输出
//!
//! 描述完整的接收器配置：接收器参数、样本来源、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::ReceiverConfig;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的接收器配置蓝图
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 接收器参数 (对齐器、包捕获、图像捕获)
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// 样本来源
    #[serde(default)]
    pub source: SourceConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 样本来源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// 合成 CSI-2 帧流
    Synthetic(SyntheticSourceConfig),
    /// 回放文本捕获文件
    Trace(TraceSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Synthetic(SyntheticSourceConfig::default())
    }
}

/// 合成帧流参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSourceConfig {
    /// 帧数
    pub frames: u32,

    /// 每帧长包 (行) 数，默认值恰好填满 96x108 预览 (5x9 抽样)
    pub lines: u32,

    /// 每行载荷字数
    pub line_words: u32,

    /// 行间消隐周期数
    pub blanking_words: u32,

    /// 帧间空闲周期数
    pub idle_words: u32,

    /// 每条 lane 的延迟周期 (空表示无偏斜)
    pub lane_skews: Vec<usize>,
}

impl Default for SyntheticSourceConfig {
    fn default() -> Self {
        Self {
            frames: 1,
            lines: 972,
            line_words: 480,
            blanking_words: 8,
            idle_words: 32,
            lane_skews: Vec::new(),
        }
    }
}

impl SyntheticSourceConfig {
    /// Cycles one frame occupies on the wire
    pub fn cycles_per_frame(&self) -> u64 {
        let blanking = u64::from(self.blanking_words);
        let line = 1 + u64::from(self.line_words) + blanking;
        // frame start + blanking + lines + frame end + idle
        1 + blanking + u64::from(self.lines) * line + 1 + u64::from(self.idle_words)
    }
}

/// 回放参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSourceConfig {
    /// 捕获文件路径
    pub path: PathBuf,
}

/// Sink 输出配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (hex dump + PNG 预览 + 统计)
    File,
    /// 终端 ANSI 预览
    Terminal,
}

impl ReceiverBlueprint {
    /// Lane skews of the synthetic source, padded with zeros to the lane count
    pub fn lane_skews(&self) -> Vec<usize> {
        let lanes = self.receiver.aligner.num_lanes as usize;
        match &self.source {
            SourceConfig::Synthetic(synthetic) => {
                let mut skews = synthetic.lane_skews.clone();
                skews.resize(lanes.max(skews.len()), 0);
                skews
            }
            SourceConfig::Trace(_) => vec![0; lanes],
        }
    }
}
