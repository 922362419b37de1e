//! Buffer renderings for external readers
//!
//! 与接收端固件的 `packet` / `image` 命令输出保持一致。

use std::fmt::Write as _;
use std::path::Path;

use contracts::FrameSnapshot;

/// One zero-padded hexadecimal word per line
pub fn hex_dump(words: &[u64], data_width: u32) -> String {
    let digits = data_width.div_ceil(4).max(1) as usize;
    let mut out = String::with_capacity(words.len() * (digits + 1));
    for word in words {
        // Writing into a String cannot fail
        let _ = writeln!(out, "{word:0digits$x}");
    }
    out
}

/// Colour preview of a FrameBuffer read as GBRG row pairs
///
/// Each output pixel combines two vertically adjacent samples:
/// `r = top & 0xFF`, `g = (top >> 8) & 0xFF`, `b = (bottom >> 8) & 0xFF`.
/// The preview is `width x height / 2`; an unpaired last row is ignored and
/// samples missing from a short pixel buffer read as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BayerPreview {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl BayerPreview {
    pub fn from_frame(frame: &FrameSnapshot) -> Self {
        let width = frame.width;
        let height = frame.height / 2;
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);

        let sample = |x: u32, y: u32| -> u16 {
            let i = y as usize * width as usize + x as usize;
            frame.pixels.get(i).copied().unwrap_or(0)
        };
        for y in 0..height {
            for x in 0..width {
                let (t, b) = (sample(x, 2 * y), sample(x, 2 * y + 1));
                rgb.push((t & 0xFF) as u8);
                rgb.push((t >> 8) as u8);
                rgb.push((b >> 8) as u8);
            }
        }

        Self { width, height, rgb }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB8 pixels, row-major
    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    /// RGB of one preview pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]])
    }

    /// Write the preview as a PNG file
    pub fn save_png(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        image::save_buffer(
            path,
            &self.rgb,
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )
    }

    /// Terminal rendering: one 24-bit background-coloured cell per pixel
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for row in self.rgb.chunks_exact(self.width.max(1) as usize * 3) {
            for px in row.chunks_exact(3) {
                let _ = write!(out, "\x1b[48;2;{};{};{}m ", px[0], px[1], px[2]);
            }
            out.push_str("\x1b[0m\n");
        }
        out
    }
}
