//! Per-lane skew injection
//!
//! 为每条 lane 单独施加固定延迟，模拟物理层引入的 lane 间偏斜。

use std::collections::VecDeque;

use contracts::{CombinedSample, ContractError, LaneGeometry, LaneSource};
use tracing::debug;

/// Delays each lane of an inner source by a fixed number of cycles
///
/// Lane data and its sync bit travel together. Delayed lanes read zero until
/// their first sample arrives; once the inner source ends, the delay lines are
/// flushed with zero input so every inner sample comes out on every lane.
pub struct SkewedLanes<S> {
    inner: S,
    skews: Vec<usize>,
    /// Recent inner samples, front = newest
    delay: VecDeque<CombinedSample>,
    /// Remaining flush cycles after the inner source ended
    flush: Option<usize>,
}

impl<S: LaneSource> SkewedLanes<S> {
    /// Wrap `inner`, delaying lane `i` by `skews[i]` cycles
    ///
    /// # Errors
    /// Fails when `skews` does not name one delay per lane, or when a delay
    /// exceeds `max_skew`.
    pub fn new(inner: S, skews: Vec<usize>, max_skew: usize) -> Result<Self, ContractError> {
        let lanes = inner.geometry().num_lanes as usize;
        if skews.len() != lanes {
            return Err(ContractError::config_validation(
                "source.lane_skews",
                format!("expected {lanes} skews, got {}", skews.len()),
            ));
        }
        if let Some((lane, skew)) = skews.iter().enumerate().find(|(_, s)| **s > max_skew) {
            return Err(ContractError::config_validation(
                format!("source.lane_skews[{lane}]"),
                format!("skew {skew} exceeds the recoverable maximum {max_skew}"),
            ));
        }

        let window = skews.iter().copied().max().unwrap_or(0) + 1;
        debug!(?skews, "lane skew injection enabled");

        Ok(Self {
            inner,
            skews,
            delay: VecDeque::from(vec![CombinedSample::default(); window]),
            flush: None,
        })
    }

    pub fn skews(&self) -> &[usize] {
        &self.skews
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: LaneSource> LaneSource for SkewedLanes<S> {
    fn geometry(&self) -> LaneGeometry {
        self.inner.geometry()
    }

    fn next_sample(&mut self) -> Option<CombinedSample> {
        let incoming = if let Some(remaining) = self.flush.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
            CombinedSample::default()
        } else if let Some(sample) = self.inner.next_sample() {
            sample
        } else {
            let remaining = self.skews.iter().copied().max().unwrap_or(0);
            if remaining == 0 {
                self.flush = Some(0);
                return None;
            }
            self.flush = Some(remaining - 1);
            CombinedSample::default()
        };

        self.delay.pop_back();
        self.delay.push_front(incoming);

        let g = self.inner.geometry();
        let sample = g.lanes().fold(CombinedSample::default(), |acc, lane| {
            let source = self.delay[self.skews[lane as usize]];
            CombinedSample::new(
                g.with_lane(acc.data, lane, g.lane_slice(source.data, lane)),
                acc.sync | (source.sync & (1 << lane)),
            )
        });
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{payload_word, FrameGenerator};
    use contracts::SyntheticSourceConfig;
    use rand::Rng;

    struct Counter {
        next: u64,
        end: u64,
    }

    impl LaneSource for Counter {
        fn geometry(&self) -> LaneGeometry {
            LaneGeometry::new(8, 2)
        }

        fn next_sample(&mut self) -> Option<CombinedSample> {
            (self.next < self.end).then(|| {
                let v = self.next;
                self.next += 1;
                CombinedSample::new(v << 8 | v, if v == 1 { 0b11 } else { 0 })
            })
        }
    }

    #[test]
    fn test_rejects_wrong_skew_count_and_excess_skew() {
        let counter = || Counter { next: 0, end: 4 };
        assert!(SkewedLanes::new(counter(), vec![0], 1).is_err());
        assert!(SkewedLanes::new(counter(), vec![0, 2], 1).is_err());
        assert!(SkewedLanes::new(counter(), vec![0, 1], 1).is_ok());
    }

    #[test]
    fn test_lane_delay_and_flush() {
        let mut skewed = SkewedLanes::new(Counter { next: 1, end: 4 }, vec![0, 2], 2).unwrap();
        let out: Vec<CombinedSample> = std::iter::from_fn(|| skewed.next_sample()).collect();
        // Lane 1 trails lane 0 by two cycles; two flush cycles at the end
        assert_eq!(
            out,
            vec![
                CombinedSample::new(0x0001, 0b01),
                CombinedSample::new(0x0002, 0),
                CombinedSample::new(0x0103, 0b10),
                CombinedSample::new(0x0200, 0),
                CombinedSample::new(0x0300, 0),
            ]
        );
    }

    #[test]
    fn test_random_skews_preserve_each_lane() {
        let mut rng = rand::rng();
        let g = LaneGeometry::default();
        let config = SyntheticSourceConfig {
            frames: 1,
            lines: 3,
            line_words: 6,
            blanking_words: 2,
            idle_words: 4,
            lane_skews: Vec::new(),
        };
        let clean: Vec<CombinedSample> = {
            let mut generator = FrameGenerator::new(g, config.clone());
            std::iter::from_fn(|| generator.next_sample()).collect()
        };

        for _ in 0..20 {
            let skews: Vec<usize> = (0..4).map(|_| rng.random_range(0..=3)).collect();
            let mut skewed =
                SkewedLanes::new(FrameGenerator::new(g, config.clone()), skews.clone(), 3).unwrap();
            let out: Vec<CombinedSample> = std::iter::from_fn(|| skewed.next_sample()).collect();
            assert_eq!(out.len(), clean.len() + skews.iter().max().unwrap());

            for lane in g.lanes() {
                let delay = skews[lane as usize];
                for (t, sample) in clean.iter().enumerate() {
                    let shifted = out[t + delay];
                    assert_eq!(shifted.lane(&g, lane), sample.lane(&g, lane));
                }
            }
        }
        assert_eq!(clean[4].data, payload_word(0, 0, 0));
    }
}
