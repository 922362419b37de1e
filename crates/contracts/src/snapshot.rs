//! CaptureSnapshot - Receiver output for external readers
//!
//! Immutable copies of the capture buffers plus run counters.

use serde::{Deserialize, Serialize};

/// Running counters of a receiver
///
/// Every counter is monotonic for the lifetime of a receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverStats {
    /// Cycles stepped
    pub cycles: u64,

    /// Aligned words whose lanes all carried their marker
    pub markers_aligned: u64,

    /// Pointer sets committed by the aligner
    pub realignments: u64,

    /// Triggers whose pointer set was discarded
    pub realignments_rejected: u64,

    /// Packet capture restarts (one per qualifying strobe)
    pub capture_restarts: u64,

    /// Words written into the capture buffer
    pub packet_words_captured: u64,

    /// Words past the head of a burst that were not kept
    pub packet_words_dropped: u64,

    /// Frame start packets seen
    pub frame_starts: u64,

    /// RAW10 pixel-data bursts seen
    pub pixel_bursts: u64,

    /// Strobed packets of any other type
    pub other_packets: u64,

    /// Samples written into the frame buffer
    pub pixels_written: u64,

    /// Decimation hits that fell outside the frame buffer
    pub pixels_suppressed: u64,
}

impl ReceiverStats {
    /// Counter increase since an earlier reading
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            cycles: self.cycles.saturating_sub(earlier.cycles),
            markers_aligned: self.markers_aligned.saturating_sub(earlier.markers_aligned),
            realignments: self.realignments.saturating_sub(earlier.realignments),
            realignments_rejected: self
                .realignments_rejected
                .saturating_sub(earlier.realignments_rejected),
            capture_restarts: self.capture_restarts.saturating_sub(earlier.capture_restarts),
            packet_words_captured: self
                .packet_words_captured
                .saturating_sub(earlier.packet_words_captured),
            packet_words_dropped: self
                .packet_words_dropped
                .saturating_sub(earlier.packet_words_dropped),
            frame_starts: self.frame_starts.saturating_sub(earlier.frame_starts),
            pixel_bursts: self.pixel_bursts.saturating_sub(earlier.pixel_bursts),
            other_packets: self.other_packets.saturating_sub(earlier.other_packets),
            pixels_written: self.pixels_written.saturating_sub(earlier.pixels_written),
            pixels_suppressed: self.pixels_suppressed.saturating_sub(earlier.pixels_suppressed),
        }
    }
}

/// Copy of the FrameBuffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub width: u32,
    pub height: u32,
    /// Row-major 16-bit samples, `width * height` entries
    pub pixels: Vec<u16>,
}

impl FrameSnapshot {
    /// Sample at `(x, y)`, `None` outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// One row of samples
    pub fn row(&self, y: u32) -> Option<&[u16]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.width as usize;
        self.pixels.get(start..start + self.width as usize)
    }
}

/// Point-in-time copy of both capture buffers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSnapshot {
    /// Snapshot sequence number (monotonically increasing)
    pub sequence: u64,

    /// Receiver cycle at which the copy was taken
    pub cycle: u64,

    /// Width of the packet words in bits
    pub data_width: u32,

    /// CaptureBuffer contents
    pub packet: Vec<u64>,

    /// FrameBuffer contents
    pub frame: FrameSnapshot,

    /// Counters at the time of the copy
    pub stats: ReceiverStats,
}
