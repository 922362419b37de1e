//! Lane geometry and the per-cycle values that flow between stages.
//!
//! Lane `i` occupies bits `[i * lane_width, (i + 1) * lane_width)` of a data
//! word and bit `i` of a sync vector.

use serde::{Deserialize, Serialize};

/// Widest aligned word that fits the `u64` carrier.
pub const MAX_DATA_WIDTH: u32 = 64;

/// Most lanes a `u32` sync vector can describe.
pub const MAX_LANES: u32 = 32;

/// Physical layout of the multi-lane word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaneGeometry {
    /// Bits delivered by one lane per cycle
    pub lane_width: u32,
    /// Number of parallel lanes
    pub num_lanes: u32,
}

impl Default for LaneGeometry {
    fn default() -> Self {
        Self {
            lane_width: 8,
            num_lanes: 4,
        }
    }
}

impl LaneGeometry {
    /// Create a geometry; callers are expected to have validated the ranges.
    pub const fn new(lane_width: u32, num_lanes: u32) -> Self {
        Self {
            lane_width,
            num_lanes,
        }
    }

    /// Total bits in one aligned word
    #[inline]
    pub fn data_width(&self) -> u32 {
        self.lane_width * self.num_lanes
    }

    /// Whether the geometry fits the `u64` / `u32` carriers
    pub fn is_representable(&self) -> bool {
        self.lane_width > 0
            && self.num_lanes > 0
            && self.num_lanes <= MAX_LANES
            && self.data_width() <= MAX_DATA_WIDTH
    }

    /// Mask selecting one lane's bits at offset zero
    #[inline]
    pub fn lane_mask(&self) -> u64 {
        low_bits(self.lane_width)
    }

    /// Mask selecting every data bit of the word
    #[inline]
    pub fn data_mask(&self) -> u64 {
        low_bits(self.data_width())
    }

    /// Mask selecting every lane's sync bit
    #[inline]
    pub fn sync_mask(&self) -> u32 {
        if self.num_lanes >= MAX_LANES {
            u32::MAX
        } else {
            (1u32 << self.num_lanes) - 1
        }
    }

    /// Extract lane `lane` from a data word
    #[inline]
    pub fn lane_slice(&self, data: u64, lane: u32) -> u64 {
        (data >> (lane * self.lane_width)) & self.lane_mask()
    }

    /// Return `data` with lane `lane` replaced by `value`
    #[inline]
    pub fn with_lane(&self, data: u64, lane: u32, value: u64) -> u64 {
        let shift = lane * self.lane_width;
        let mask = self.lane_mask() << shift;
        (data & !mask) | ((value & self.lane_mask()) << shift)
    }

    /// Iterate lane indices
    pub fn lanes(&self) -> std::ops::Range<u32> {
        0..self.num_lanes
    }
}

fn low_bits(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// One lane's output for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneSample {
    /// `lane_width` data bits
    pub data: u64,
    /// Lane detected its synchronization marker on this cycle
    pub sync: bool,
}

/// All lanes' data and sync bits for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedSample {
    /// Concatenated lane data, lane 0 in the low bits
    pub data: u64,
    /// Per-lane sync bits, lane 0 in bit 0
    pub sync: u32,
}

impl CombinedSample {
    pub const fn new(data: u64, sync: u32) -> Self {
        Self { data, sync }
    }

    /// Build a combined sample from per-lane samples
    pub fn from_lanes(geometry: &LaneGeometry, lanes: &[LaneSample]) -> Self {
        lanes
            .iter()
            .zip(geometry.lanes())
            .fold(Self::default(), |acc, (sample, lane)| Self {
                data: geometry.with_lane(acc.data, lane, sample.data),
                sync: acc.sync | (u32::from(sample.sync) << lane),
            })
    }

    /// Split out one lane
    #[inline]
    pub fn lane(&self, geometry: &LaneGeometry, lane: u32) -> LaneSample {
        LaneSample {
            data: geometry.lane_slice(self.data, lane),
            sync: self.lane_sync(lane),
        }
    }

    /// Sync bit of one lane
    #[inline]
    pub fn lane_sync(&self, lane: u32) -> bool {
        (self.sync >> lane) & 1 == 1
    }

    /// Any lane saw a marker this cycle
    #[inline]
    pub fn has_marker(&self) -> bool {
        self.sync != 0
    }
}

/// WordAligner output for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedWord {
    /// Skew-corrected word
    pub data: u64,
    /// Every lane's marker lines up on this word
    pub valid: bool,
}
