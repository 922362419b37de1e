//! Synthetic CSI-2 frame source
//!
//! 生成已对齐的 CSI-2 帧流，用于无物理层环境的仿真与测试。

use contracts::{
    CombinedSample, LaneGeometry, LaneSource, PacketType, SyntheticSourceConfig,
};
use tracing::debug;

/// Payload word carrying its origin: frame in bits 16..23, line in 8..15,
/// word index in 0..7
pub fn payload_word(frame: u32, line: u32, word: u32) -> u64 {
    (u64::from(frame & 0xFF) << 16) | (u64::from(line & 0xFF) << 8) | u64::from(word & 0xFF)
}

/// Where a cycle falls inside one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    FrameStart,
    LineHeader,
    Payload { line: u32, word: u32 },
    FrameEnd,
    Idle,
}

/// Aligned frame generator
///
/// Every lane carries its marker on the same cycle; wrap in
/// [`SkewedLanes`](crate::SkewedLanes) to model physical skew.
///
/// Frame layout: frame start, blanking, `lines` x (RAW10 header, payload,
/// blanking), frame end, inter-frame idle.
#[derive(Debug, Clone)]
pub struct FrameGenerator {
    geometry: LaneGeometry,
    config: SyntheticSourceConfig,
    frame: u32,
    offset: u64,
}

impl FrameGenerator {
    pub fn new(geometry: LaneGeometry, config: SyntheticSourceConfig) -> Self {
        debug!(
            frames = config.frames,
            lines = config.lines,
            line_words = config.line_words,
            cycles_per_frame = config.cycles_per_frame(),
            "frame generator created"
        );
        Self {
            geometry,
            config,
            frame: 0,
            offset: 0,
        }
    }

    /// Total cycles this generator produces
    pub fn total_cycles(&self) -> u64 {
        u64::from(self.config.frames) * self.config.cycles_per_frame()
    }

    /// RAW10 header word count: payload bytes per line
    fn line_byte_count(&self) -> u16 {
        let bytes = u64::from(self.config.line_words) * u64::from(self.geometry.data_width() / 8);
        u16::try_from(bytes).unwrap_or(u16::MAX)
    }

    fn slot(&self, offset: u64) -> Slot {
        let blanking = u64::from(self.config.blanking_words);
        let line_len = 1 + u64::from(self.config.line_words) + blanking;
        let lines_start = 1 + blanking;
        let lines_end = lines_start + u64::from(self.config.lines) * line_len;

        match offset {
            0 => Slot::FrameStart,
            o if o < lines_start => Slot::Idle,
            o if o < lines_end => {
                let rel = o - lines_start;
                let line = (rel / line_len) as u32;
                match rel % line_len {
                    0 => Slot::LineHeader,
                    pos if pos <= u64::from(self.config.line_words) => Slot::Payload {
                        line,
                        word: (pos - 1) as u32,
                    },
                    _ => Slot::Idle,
                }
            }
            o if o == lines_end => Slot::FrameEnd,
            _ => Slot::Idle,
        }
    }

    fn sample(&self, slot: Slot) -> CombinedSample {
        let marker = self.geometry.sync_mask();
        let mask = self.geometry.data_mask();
        match slot {
            Slot::FrameStart => CombinedSample::new(PacketType::FrameStart.header_word(0) & mask, marker),
            Slot::LineHeader => CombinedSample::new(
                PacketType::Raw10.header_word(self.line_byte_count()) & mask,
                marker,
            ),
            Slot::Payload { line, word } => {
                CombinedSample::new(payload_word(self.frame, line, word) & mask, 0)
            }
            Slot::FrameEnd => CombinedSample::new(PacketType::FrameEnd.header_word(0) & mask, marker),
            Slot::Idle => CombinedSample::default(),
        }
    }
}

impl LaneSource for FrameGenerator {
    fn geometry(&self) -> LaneGeometry {
        self.geometry
    }

    fn next_sample(&mut self) -> Option<CombinedSample> {
        if self.frame >= self.config.frames {
            return None;
        }

        let sample = self.sample(self.slot(self.offset));
        self.offset += 1;
        if self.offset >= self.config.cycles_per_frame() {
            self.offset = 0;
            self.frame += 1;
        }
        Some(sample)
    }
}
