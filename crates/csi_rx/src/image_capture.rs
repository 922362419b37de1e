//! Decimating image capture.
//!
//! Pixel bursts are recognized from the packet-type byte of the strobed
//! header word. Payload words are kept one in `subsample_x` along a burst and
//! one burst in `subsample_y`; the low 16 bits of each kept word are written
//! raw into the FrameBuffer.

use contracts::{AlignedWord, ImageCaptureConfig, PacketType};
use tracing::instrument;

/// Row register value after a frame start; the next pixel burst rolls it to 0
pub const FRAME_START_ROW: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ImageRegs {
    subx_ctr: u32,
    suby_ctr: u32,
    out_x: u32,
    out_y: u32,
    /// Always equals `subx_ctr == 0`
    x_hit: bool,
    /// Loaded at each pixel burst start
    y_hit: bool,
    is_pixels: bool,
}

impl Default for ImageRegs {
    fn default() -> Self {
        Self {
            subx_ctr: 0,
            suby_ctr: 0,
            out_x: 0,
            out_y: 0,
            x_hit: true,
            y_hit: false,
            is_pixels: false,
        }
    }
}

/// FrameBuffer write port request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWrite {
    pub x: u32,
    pub y: u32,
    pub value: u16,
}

/// What one image capture step did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageStep {
    /// Sample written this cycle
    pub write: Option<PixelWrite>,
    /// A decimation hit fell outside the buffer
    pub suppressed: bool,
    /// Packet type of a strobed word
    pub packet: Option<PacketType>,
}

/// Decimated preview writer
#[derive(Debug, Clone)]
pub struct ImageCapture {
    config: ImageCaptureConfig,
    regs: ImageRegs,
    frame: Vec<u16>,
}

impl ImageCapture {
    pub fn new(config: &ImageCaptureConfig) -> Self {
        let config = ImageCaptureConfig {
            subsample_x: config.subsample_x.max(1),
            subsample_y: config.subsample_y.max(1),
            ..*config
        };
        Self {
            config,
            regs: ImageRegs::default(),
            frame: vec![0; config.frame_len()],
        }
    }

    /// FrameBuffer contents, row-major
    #[inline]
    pub fn frame(&self) -> &[u16] {
        &self.frame
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.config.out_width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.config.out_height
    }

    /// Current `(out_x, out_y)` write coordinate
    pub fn position(&self) -> (u32, u32) {
        (self.regs.out_x, self.regs.out_y)
    }

    /// Current word is classified as pixel payload
    pub fn is_pixels(&self) -> bool {
        self.regs.is_pixels
    }

    #[instrument(level = "trace", name = "image_capture_step", skip(self))]
    pub fn step(&mut self, word: AlignedWord, strobe: bool) -> ImageStep {
        let regs = self.regs;
        let hit = regs.is_pixels && regs.x_hit && regs.y_hit;
        let in_range = regs.out_x < self.config.out_width && regs.out_y < self.config.out_height;

        let write = (hit && in_range).then(|| PixelWrite {
            x: regs.out_x,
            y: regs.out_y,
            value: (word.data & 0xFFFF) as u16,
        });

        let packet = strobe.then(|| PacketType::from_word(word.data));
        let next = self.next_regs(&regs, packet);

        if let Some(w) = write {
            let index = w.y as usize * self.config.out_width as usize + w.x as usize;
            self.frame[index] = w.value;
        }
        self.regs = next;

        ImageStep {
            write,
            suppressed: hit && !in_range,
            packet,
        }
    }

    fn next_regs(&self, regs: &ImageRegs, packet: Option<PacketType>) -> ImageRegs {
        let subx_ctr = (regs.subx_ctr + 1) % self.config.subsample_x;
        let mut next = ImageRegs {
            subx_ctr,
            out_x: regs.out_x.saturating_add(u32::from(regs.x_hit)),
            x_hit: subx_ctr == 0,
            ..*regs
        };

        match packet {
            Some(PacketType::Raw10) => {
                let row_hit = regs.suby_ctr == 0;
                next.is_pixels = true;
                next.subx_ctr = 0;
                next.x_hit = true;
                next.out_x = 0;
                next.y_hit = row_hit;
                if row_hit {
                    next.out_y = regs.out_y.wrapping_add(1);
                }
                next.suby_ctr = (regs.suby_ctr + 1) % self.config.subsample_y;
            }
            Some(PacketType::FrameStart) => {
                next.is_pixels = false;
                next.suby_ctr = 0;
                next.out_y = FRAME_START_ROW;
            }
            Some(_) => next.is_pixels = false,
            None => {}
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(sx: u32, sy: u32, w: u32, h: u32) -> ImageCapture {
        ImageCapture::new(&ImageCaptureConfig {
            subsample_x: sx,
            subsample_y: sy,
            out_width: w,
            out_height: h,
        })
    }

    fn plain(data: u64) -> AlignedWord {
        AlignedWord { data, valid: false }
    }

    fn header(kind: PacketType) -> AlignedWord {
        AlignedWord {
            data: kind.header_word(0),
            valid: true,
        }
    }

    /// Payload word for `(line, k)` that records its origin in the low 16 bits
    fn payload(line: u32, k: u32) -> u64 {
        0xDEAD_0000 | u64::from(line << 8 | k)
    }

    /// Frame start, then `lines` RAW10 bursts of `words` payload words
    fn feed_frame(cap: &mut ImageCapture, lines: u32, words: u32) -> Vec<PixelWrite> {
        let mut writes = Vec::new();
        cap.step(header(PacketType::FrameStart), true);
        for line in 0..lines {
            writes.extend(cap.step(header(PacketType::Raw10), true).write);
            for k in 0..words {
                writes.extend(cap.step(plain(payload(line, k)), false).write);
            }
        }
        writes
    }

    #[test]
    fn test_decimation_picks_one_sample_per_cell() {
        let mut cap = capture(5, 9, 4, 3);
        let writes = feed_frame(&mut cap, 27, 20);

        assert_eq!(writes.len(), 12);
        for w in &writes {
            assert!(w.x < 4 && w.y < 3);
            assert_eq!(w.value, (w.y * 9) as u16 * 256 + (w.x * 5) as u16);
        }
        for y in 0..3u32 {
            for x in 0..4u32 {
                let value = cap.frame()[(y * 4 + x) as usize];
                assert_eq!(value, payload(y * 9, x * 5) as u16, "pixel ({x}, {y})");
            }
        }
    }

    /// Preserved behavior: a frame start parks the row register one below
    /// zero and the first pixel burst rolls it over to row 0.
    #[test]
    fn test_frame_start_sentinel_rolls_over_to_row_zero() {
        let mut cap = capture(1, 1, 8, 8);
        cap.step(header(PacketType::FrameStart), true);
        assert_eq!(cap.position().1, FRAME_START_ROW);

        cap.step(header(PacketType::Raw10), true);
        assert_eq!(cap.position(), (0, 0));
        let step = cap.step(plain(0x1234), false);
        assert_eq!(step.write, Some(PixelWrite { x: 0, y: 0, value: 0x1234 }));
    }

    #[test]
    fn test_out_of_range_hits_never_write() {
        let mut cap = capture(1, 1, 2, 2);
        let mut suppressed = 0;
        cap.step(header(PacketType::FrameStart), true);
        for line in 0..4 {
            cap.step(header(PacketType::Raw10), true);
            for k in 0..6 {
                let step = cap.step(plain(payload(line, k)), false);
                if let Some(w) = step.write {
                    assert!(w.x < 2 && w.y < 2);
                }
                suppressed += usize::from(step.suppressed);
            }
        }
        assert_eq!(cap.frame(), &[0x0000, 0x0001, 0x0100, 0x0101]);
        // Lines 0-1: words 2..6; lines 2-3: all six
        assert_eq!(suppressed, 2 * 4 + 2 * 6);
    }

    #[test]
    fn test_non_pixel_packets_do_not_write() {
        let mut cap = capture(1, 1, 4, 4);
        cap.step(header(PacketType::FrameStart), true);
        cap.step(header(PacketType::Other(0x12)), true);
        for k in 0..4u32 {
            assert_eq!(cap.step(plain(u64::from(k) + 1), false).write, None);
        }
        assert!(!cap.is_pixels());
        assert!(cap.frame().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_frame_end_stops_pixel_writes() {
        let mut cap = capture(1, 1, 4, 4);
        cap.step(header(PacketType::FrameStart), true);
        cap.step(header(PacketType::Raw10), true);
        assert!(cap.step(plain(7), false).write.is_some());
        let step = cap.step(header(PacketType::FrameEnd), true);
        assert_eq!(step.packet, Some(PacketType::FrameEnd));
        assert!(!cap.is_pixels());
        assert_eq!(cap.step(plain(8), false).write, None);
    }

    #[test]
    fn test_stale_pixels_persist_across_frames() {
        let mut cap = capture(1, 1, 2, 2);
        feed_frame(&mut cap, 2, 2);
        assert_eq!(cap.frame(), &[0x0000, 0x0001, 0x0100, 0x0101]);

        // Second frame covers only row 0
        cap.step(header(PacketType::FrameStart), true);
        cap.step(header(PacketType::Raw10), true);
        cap.step(plain(0xAAAA), false);
        cap.step(plain(0xBBBB), false);
        assert_eq!(cap.frame(), &[0xAAAA, 0xBBBB, 0x0100, 0x0101]);
    }

    #[test]
    fn test_zero_subsample_is_clamped() {
        let mut cap = capture(0, 0, 2, 2);
        feed_frame(&mut cap, 1, 2);
        assert_eq!(&cap.frame()[..2], &[0x0000, 0x0001]);
    }
}
