//! Receiver - lock-step composition of the three stages.

use contracts::{
    AlignedWord, CaptureSnapshot, CombinedSample, ContractError, FrameSnapshot, LaneSource,
    PacketType, ReceiverConfig, ReceiverStats,
};
use tracing::instrument;
use validator::Validate;

use crate::aligner::{TriggerOutcome, WordAligner};
use crate::image_capture::ImageCapture;
use crate::packet_capture::PacketCapture;

/// CSI-2 receive pipeline
///
/// Every aligned word reaches both captures in the same step; the aligned
/// word's `valid` bit is the strobe both captures qualify on.
#[derive(Debug)]
pub struct Receiver {
    config: ReceiverConfig,
    aligner: WordAligner,
    packet: PacketCapture,
    image: ImageCapture,
    stats: ReceiverStats,
    next_sequence: u64,
}

impl Receiver {
    /// Build a receiver from a validated configuration
    pub fn new(config: ReceiverConfig) -> Result<Self, ContractError> {
        config
            .validate()
            .map_err(|e| ContractError::config_validation("receiver", e.to_string()))?;

        let aligner = WordAligner::new(&config.aligner)?;
        let packet = PacketCapture::new(&config.packet);
        let image = ImageCapture::new(&config.image);

        tracing::debug!(
            lane_width = config.aligner.lane_width,
            num_lanes = config.aligner.num_lanes,
            depth = config.aligner.depth,
            depth_pkt = config.packet.depth,
            out_width = config.image.out_width,
            out_height = config.image.out_height,
            "receiver created"
        );

        Ok(Self {
            config,
            aligner,
            packet,
            image,
            stats: ReceiverStats::default(),
            next_sequence: 0,
        })
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn aligner(&self) -> &WordAligner {
        &self.aligner
    }

    pub fn packet_capture(&self) -> &PacketCapture {
        &self.packet
    }

    pub fn image_capture(&self) -> &ImageCapture {
        &self.image
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Cycles stepped so far
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.stats.cycles
    }

    /// Advance every stage by one cycle
    pub fn step(&mut self, sample: CombinedSample) -> AlignedWord {
        let aligned = self.aligner.step(sample);
        let word = aligned.word;
        let strobe = word.valid;

        let captured = self.packet.step(word, strobe);
        let imaged = self.image.step(word, strobe);

        let cycle = self.stats.cycles;
        let stats = &mut self.stats;
        stats.cycles += 1;

        match aligned.trigger {
            TriggerOutcome::Committed => {
                stats.realignments += 1;
                tracing::debug!(cycle, pointers = ?self.aligner.pointers(), "lane pointers realigned");
                metrics::counter!("csi_rx_realignments_total", "status" => "committed").increment(1);
            }
            TriggerOutcome::Partial => {
                stats.realignments += 1;
                tracing::debug!(
                    cycle,
                    pointers = ?self.aligner.pointers(),
                    "lane pointers realigned, unmarked lanes held"
                );
                metrics::counter!("csi_rx_realignments_total", "status" => "partial").increment(1);
            }
            TriggerOutcome::Rejected => {
                stats.realignments_rejected += 1;
                tracing::debug!(cycle, "settled marker outside window, pointers kept");
                metrics::counter!("csi_rx_realignments_total", "status" => "rejected").increment(1);
            }
            TriggerOutcome::Idle => {}
        }

        if strobe {
            stats.markers_aligned += 1;
            stats.capture_restarts += u64::from(captured.restarted);
        }
        match captured.written {
            Some(_) => stats.packet_words_captured += 1,
            // Only words after a restart count as dropped
            None if stats.capture_restarts > 0 => stats.packet_words_dropped += 1,
            None => {}
        }

        if imaged.write.is_some() {
            stats.pixels_written += 1;
        }
        if imaged.suppressed {
            stats.pixels_suppressed += 1;
        }
        match imaged.packet {
            Some(PacketType::FrameStart) => {
                stats.frame_starts += 1;
                tracing::debug!(cycle, frame = stats.frame_starts, "frame start");
                metrics::counter!("csi_rx_frame_starts_total").increment(1);
            }
            Some(PacketType::Raw10) => stats.pixel_bursts += 1,
            Some(other) => {
                stats.other_packets += 1;
                tracing::trace!(cycle, code = other.code(), "non-pixel packet");
            }
            None => {}
        }

        word
    }

    /// Step until `source` is exhausted or `max_cycles` more cycles have run
    ///
    /// Returns the number of cycles stepped.
    #[instrument(name = "receiver_run", skip(self, source))]
    pub fn run<S: LaneSource + ?Sized>(
        &mut self,
        source: &mut S,
        max_cycles: Option<u64>,
    ) -> Result<u64, ContractError> {
        self.check_source(&*source)?;

        let mut stepped = 0u64;
        while max_cycles.is_none_or(|limit| stepped < limit) {
            let Some(sample) = source.next_sample() else {
                break;
            };
            self.step(sample);
            stepped += 1;
        }
        Ok(stepped)
    }

    /// Reject a source whose lane layout differs from the aligner's
    pub fn check_source<S: LaneSource + ?Sized>(&self, source: &S) -> Result<(), ContractError> {
        let expected = self.aligner.geometry();
        let actual = source.geometry();
        if actual != expected {
            return Err(ContractError::geometry_mismatch(format!(
                "source delivers {} lanes of {} bits, receiver expects {} lanes of {} bits",
                actual.num_lanes, actual.lane_width, expected.num_lanes, expected.lane_width
            )));
        }
        Ok(())
    }

    /// Copy both capture buffers for an external reader
    pub fn snapshot(&mut self) -> CaptureSnapshot {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        CaptureSnapshot {
            sequence,
            cycle: self.stats.cycles,
            data_width: self.aligner.geometry().data_width(),
            packet: self.packet.buffer().to_vec(),
            frame: FrameSnapshot {
                width: self.image.width(),
                height: self.image.height(),
                pixels: self.image.frame().to_vec(),
            },
            stats: self.stats,
        }
    }
}
