//! Head capture of the aligned word stream.

use contracts::{AlignedWord, PacketCaptureConfig};
use tracing::instrument;

/// What one capture step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStep {
    /// Buffer index written this cycle
    pub written: Option<usize>,
    /// The strobe restarted the write cursor
    pub restarted: bool,
}

/// Keeps the first `depth` words following each strobe
///
/// The write address is the registered cursor, so the strobed word lands at
/// the old cursor position (if still inside the buffer) and the words after
/// it fill indices `0..depth`. The cursor starts parked at `depth`: nothing is
/// kept before the first strobe.
#[derive(Debug, Clone)]
pub struct PacketCapture {
    buffer: Vec<u64>,
    write_ptr: usize,
}

impl PacketCapture {
    pub fn new(config: &PacketCaptureConfig) -> Self {
        Self {
            buffer: vec![0; config.depth],
            write_ptr: config.depth,
        }
    }

    /// CaptureBuffer contents
    #[inline]
    pub fn buffer(&self) -> &[u64] {
        &self.buffer
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.buffer.len()
    }

    /// Registered write cursor (may exceed `depth`)
    #[inline]
    pub fn write_ptr(&self) -> usize {
        self.write_ptr
    }

    /// Capture buffer is full until the next strobe
    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.write_ptr >= self.buffer.len()
    }

    #[instrument(level = "trace", name = "packet_capture_step", skip(self))]
    pub fn step(&mut self, word: AlignedWord, strobe: bool) -> CaptureStep {
        let written = (self.write_ptr < self.buffer.len()).then_some(self.write_ptr);
        let next_ptr = if strobe {
            0
        } else {
            self.write_ptr.saturating_add(1)
        };

        if let Some(index) = written {
            self.buffer[index] = word.data;
        }
        self.write_ptr = next_ptr;

        CaptureStep {
            written,
            restarted: strobe,
        }
    }
}
