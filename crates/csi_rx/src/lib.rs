//! # CSI-2 Receive Core
//!
//! 周期步进的 CSI-2 接收流水线模型。
//!
//! 负责：
//! - 多 lane 偏斜校正 (`WordAligner`)
//! - 同步事件后的首部捕获 (`PacketCapture`)
//! - 抽样预览图像捕获 (`ImageCapture`)
//!
//! 每一级都只根据当前寄存器和当前输入计算下一状态，再统一提交。
//!
//! ## 使用示例
//!
//! ```ignore
//! use csi_rx::Receiver;
//!
//! let mut receiver = Receiver::new(ReceiverConfig::default())?;
//!
//! while let Some(sample) = source.next_sample() {
//!     receiver.step(sample);
//! }
//! let snapshot = receiver.snapshot();
//! ```

mod aligner;
mod image_capture;
mod packet_capture;
mod receiver;

pub use aligner::{AlignerOutput, TriggerOutcome, WordAligner};
pub use image_capture::{ImageCapture, ImageStep, PixelWrite, FRAME_START_ROW};
pub use packet_capture::{CaptureStep, PacketCapture};
pub use receiver::Receiver;

// Re-export contracts types
pub use contracts::{AlignedWord, CaptureSnapshot, CombinedSample, ReceiverConfig, ReceiverStats};
