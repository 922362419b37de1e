//! # Lane Sources
//!
//! Lane sample sources feeding the receiver.
//!
//! Responsibilities:
//! - Synthesize aligned CSI-2 frame streams (`FrameGenerator`)
//! - Inject per-lane skew (`SkewedLanes`)
//! - Replay and record text lane traces (`TraceSource`, `TraceWriter`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use lane_source::source_from_blueprint;
//!
//! let mut source = source_from_blueprint(&blueprint)?;
//! receiver.run(&mut source, None)?;
//! ```

mod generator;
mod skew;
mod trace;

use contracts::{ContractError, LaneSource, ReceiverBlueprint, SourceConfig};

// Re-exports
pub use generator::{payload_word, FrameGenerator};
pub use skew::SkewedLanes;
pub use trace::{TraceSource, TraceWriter};

/// Build the source a blueprint describes
///
/// A synthetic source is wrapped in [`SkewedLanes`] only when some lane has a
/// non-zero skew.
pub fn source_from_blueprint(
    blueprint: &ReceiverBlueprint,
) -> Result<Box<dyn LaneSource>, ContractError> {
    let aligner = &blueprint.receiver.aligner;
    let geometry = aligner.geometry();

    match &blueprint.source {
        SourceConfig::Synthetic(synthetic) => {
            let generator = FrameGenerator::new(geometry, synthetic.clone());
            let skews = blueprint.lane_skews();
            if skews.iter().all(|s| *s == 0) {
                Ok(Box::new(generator))
            } else {
                Ok(Box::new(SkewedLanes::new(
                    generator,
                    skews,
                    aligner.max_skew(),
                )?))
            }
        }
        SourceConfig::Trace(trace) => Ok(Box::new(TraceSource::open(&trace.path, geometry)?)),
    }
}
