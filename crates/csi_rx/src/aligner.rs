//! Lane deskew.
//!
//! History is a delay line of the last `depth` combined samples held in a
//! fixed ring; slot 0 is the newest entry. Every lane reads its slice of the
//! output word from the slot its pointer selects.

use std::fmt;

use contracts::{
    AlignedWord, AlignerConfig, CombinedSample, ContractError, LaneGeometry, MAX_LANES,
};
use ringbuf::{traits::*, HeapRb};
use tracing::instrument;

const POINTER_SLOTS: usize = MAX_LANES as usize;

/// What a settled marker did to the lane pointers this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// No settled marker
    Idle,
    /// Every lane matched inside the window; pointers replaced
    Committed,
    /// Lanes without a marker in the window kept their pointer; the rest moved
    Partial,
    /// A lane's match sat in the oldest slot; pointers kept
    Rejected,
}

/// One aligner step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignerOutput {
    pub word: AlignedWord,
    pub trigger: TriggerOutcome,
}

/// Multi-lane word aligner
pub struct WordAligner {
    geometry: LaneGeometry,
    depth: usize,
    history: HeapRb<CombinedSample>,
    pointers: [usize; POINTER_SLOTS],
}

impl fmt::Debug for WordAligner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordAligner")
            .field("geometry", &self.geometry)
            .field("depth", &self.depth)
            .field("pointers", &self.pointers())
            .finish()
    }
}

impl WordAligner {
    /// Create an aligner with zero-filled history and all pointers at slot 0
    pub fn new(config: &AlignerConfig) -> Result<Self, ContractError> {
        let geometry = config.geometry();
        if !geometry.is_representable() {
            return Err(ContractError::config_validation(
                "receiver.aligner",
                format!(
                    "{} lanes of {} bits do not fit a 64-bit word",
                    geometry.num_lanes, geometry.lane_width
                ),
            ));
        }
        if config.depth < 2 {
            return Err(ContractError::config_validation(
                "receiver.aligner.depth",
                "history depth must be at least 2",
            ));
        }

        let mut history = HeapRb::new(config.depth);
        for _ in 0..config.depth {
            history.push_overwrite(CombinedSample::default());
        }

        Ok(Self {
            geometry,
            depth: config.depth,
            history,
            pointers: [0; POINTER_SLOTS],
        })
    }

    #[inline]
    pub fn geometry(&self) -> LaneGeometry {
        self.geometry
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Current lane pointers, one per lane
    pub fn pointers(&self) -> &[usize] {
        &self.pointers[..self.geometry.num_lanes as usize]
    }

    /// History entry `slot` cycles old (0 = newest)
    pub fn history_slot(&self, slot: usize) -> Option<CombinedSample> {
        self.history.iter().rev().nth(slot).copied()
    }

    /// A marker has reached the settled slot `depth - 2`
    pub fn trigger(&self) -> bool {
        self.history_slot(self.depth - 2)
            .is_some_and(|sample| sample.has_marker())
    }

    /// Advance one cycle
    ///
    /// Output and pointer update are both computed from the registers as they
    /// stood before `sample` arrived; the new sample and new pointers are
    /// committed together afterwards.
    #[instrument(
        level = "trace",
        name = "word_aligner_step",
        skip(self),
        fields(data = sample.data, sync = sample.sync)
    )]
    pub fn step(&mut self, sample: CombinedSample) -> AlignerOutput {
        let word = self.output_word();
        let (trigger, pointers) = self.evaluate_trigger();

        self.history.push_overwrite(CombinedSample::new(
            sample.data & self.geometry.data_mask(),
            sample.sync & self.geometry.sync_mask(),
        ));
        if let Some(pointers) = pointers {
            self.pointers = pointers;
        }

        AlignerOutput { word, trigger }
    }

    fn output_word(&self) -> AlignedWord {
        let g = self.geometry;
        g.lanes().fold(
            AlignedWord {
                data: 0,
                valid: true,
            },
            |acc, lane| {
                let source = self
                    .history_slot(self.pointers[lane as usize])
                    .unwrap_or_default();
                AlignedWord {
                    data: g.with_lane(acc.data, lane, g.lane_slice(source.data, lane)),
                    valid: acc.valid && source.lane_sync(lane),
                }
            },
        )
    }

    /// Pointer set selected by a settled marker, if it may be committed
    ///
    /// Slots are scanned newest to oldest and every match overwrites, so the
    /// oldest matching slot of a lane wins. A lane with no marker anywhere in
    /// the window keeps its pointer. A match in the oldest slot yields `depth`,
    /// which no lane pointer may hold; that trigger belongs to an event the
    /// pointers already follow, so the set is discarded whole.
    fn evaluate_trigger(&self) -> (TriggerOutcome, Option<[usize; POINTER_SLOTS]>) {
        if !self.trigger() {
            return (TriggerOutcome::Idle, None);
        }

        let lanes = self.geometry.num_lanes as usize;
        let mut candidates = [None::<usize>; POINTER_SLOTS];
        for (slot, sample) in self.history.iter().rev().enumerate() {
            for (lane, candidate) in candidates.iter_mut().enumerate().take(lanes) {
                if sample.lane_sync(lane as u32) {
                    *candidate = Some(slot + 1);
                }
            }
        }

        let mut pointers = self.pointers;
        let mut held = false;
        for (lane, candidate) in candidates.iter().enumerate().take(lanes) {
            match candidate {
                Some(pointer) if *pointer < self.depth => pointers[lane] = *pointer,
                Some(_) => return (TriggerOutcome::Rejected, None),
                None => held = true,
            }
        }

        let outcome = if held {
            TriggerOutcome::Partial
        } else {
            TriggerOutcome::Committed
        };
        (outcome, Some(pointers))
    }
}
