//! LaneSource trait - Lane sample source abstraction
//!
//! Decouples the receiver from whatever produces lane samples: a physical
//! layer, a synthetic generator or a recorded trace.

use crate::{CombinedSample, LaneGeometry};

/// Per-cycle lane sample source
///
/// Contract: each lane's sync bit is set on exactly the cycles its physical
/// layer detected a synchronization pattern, and the skew between lanes'
/// assertions stays within `depth - 2` cycles of the receiving aligner.
///
/// # Example
///
/// ```ignore
/// let mut source: Box<dyn LaneSource> = make_source();
/// while let Some(sample) = source.next_sample() {
///     receiver.step(sample);
/// }
/// ```
pub trait LaneSource: Send {
    /// Layout of the samples this source produces
    fn geometry(&self) -> LaneGeometry;

    /// Next cycle's sample, `None` once the source is exhausted
    fn next_sample(&mut self) -> Option<CombinedSample>;
}

impl<S: LaneSource + ?Sized> LaneSource for Box<S> {
    fn geometry(&self) -> LaneGeometry {
        (**self).geometry()
    }

    fn next_sample(&mut self) -> Option<CombinedSample> {
        (**self).next_sample()
    }
}
