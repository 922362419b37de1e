//! Receiver configuration contracts shared across crates.
//!
//! All values are construction-time only; nothing here is mutable while the
//! receiver is stepping.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::LaneGeometry;

/// Receiver configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReceiverConfig {
    /// Lane deskew configuration
    #[serde(default)]
    #[validate(nested)]
    pub aligner: AlignerConfig,

    /// Raw packet capture configuration
    #[serde(default)]
    #[validate(nested)]
    pub packet: PacketCaptureConfig,

    /// Decimated image capture configuration
    #[serde(default)]
    #[validate(nested)]
    pub image: ImageCaptureConfig,
}

/// WordAligner configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AlignerConfig {
    /// Bits per lane per cycle
    #[validate(range(min = 1, max = 64))]
    pub lane_width: u32,

    /// Number of lanes
    #[validate(range(min = 1, max = 32))]
    pub num_lanes: u32,

    /// History window size; must exceed the worst skew by at least 2
    #[validate(range(min = 2, max = 64))]
    pub depth: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            lane_width: 8,
            num_lanes: 4,
            depth: 3,
        }
    }
}

impl AlignerConfig {
    pub fn geometry(&self) -> LaneGeometry {
        LaneGeometry::new(self.lane_width, self.num_lanes)
    }

    /// Largest inter-lane skew (cycles) the window can repair
    pub fn max_skew(&self) -> usize {
        self.depth.saturating_sub(2)
    }
}

/// PacketCapture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PacketCaptureConfig {
    /// Words kept after each synchronization event
    #[validate(range(min = 1, max = 1048576))]
    pub depth: usize,
}

impl Default for PacketCaptureConfig {
    fn default() -> Self {
        Self { depth: 1024 }
    }
}

/// ImageCapture configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImageCaptureConfig {
    /// Keep one word in every `subsample_x` along a line
    #[validate(range(min = 1))]
    pub subsample_x: u32,

    /// Keep one line in every `subsample_y`
    #[validate(range(min = 1))]
    pub subsample_y: u32,

    /// FrameBuffer width in pixels
    #[validate(range(min = 1, max = 4096))]
    pub out_width: u32,

    /// FrameBuffer height in pixels
    #[validate(range(min = 1, max = 4096))]
    pub out_height: u32,
}

impl Default for ImageCaptureConfig {
    fn default() -> Self {
        Self {
            subsample_x: 5,
            subsample_y: 9,
            out_width: 96,
            out_height: 108,
        }
    }
}

impl ImageCaptureConfig {
    /// Number of 16-bit samples in the FrameBuffer
    pub fn frame_len(&self) -> usize {
        self.out_width as usize * self.out_height as usize
    }
}
