//! Packet-type lookup
//!
//! Only the codes the image path needs are decoded; every other code is carried
//! through as `Other`.

use serde::{Deserialize, Serialize};

/// Bit offset of the packet-type byte inside an aligned header word.
pub const PACKET_TYPE_SHIFT: u32 = 24;

/// RAW10 packs four pixels into this many bytes.
pub const RAW10_GROUP_BYTES: u32 = 5;

/// Packet type carried in bits 24..31 of a header word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    /// Frame start short packet (0x00)
    FrameStart,
    /// Frame end short packet (0x01)
    FrameEnd,
    /// RAW10 pixel data long packet (0x2B)
    Raw10,
    /// Any other data type
    Other(u8),
}

impl PacketType {
    pub const FRAME_START_CODE: u8 = 0x00;
    pub const FRAME_END_CODE: u8 = 0x01;
    pub const RAW10_CODE: u8 = 0x2B;

    /// Look up a data-type code
    pub fn from_code(code: u8) -> Self {
        match code {
            Self::FRAME_START_CODE => Self::FrameStart,
            Self::FRAME_END_CODE => Self::FrameEnd,
            Self::RAW10_CODE => Self::Raw10,
            other => Self::Other(other),
        }
    }

    /// Extract the type byte from an aligned word
    #[inline]
    pub fn from_word(data: u64) -> Self {
        Self::from_code(((data >> PACKET_TYPE_SHIFT) & 0xFF) as u8)
    }

    /// Numeric data-type code
    pub fn code(self) -> u8 {
        match self {
            Self::FrameStart => Self::FRAME_START_CODE,
            Self::FrameEnd => Self::FRAME_END_CODE,
            Self::Raw10 => Self::RAW10_CODE,
            Self::Other(code) => code,
        }
    }

    /// Header word carrying this type, with `word_count` in the low 16 bits
    pub fn header_word(self, word_count: u16) -> u64 {
        (u64::from(self.code()) << PACKET_TYPE_SHIFT) | u64::from(word_count)
    }

    #[inline]
    pub fn is_pixel_data(self) -> bool {
        matches!(self, Self::Raw10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_round_trips_known_codes() {
        for code in [0x00u8, 0x01, 0x2B, 0x2A, 0xFF] {
            assert_eq!(PacketType::from_code(code).code(), code);
        }
        assert_eq!(PacketType::from_code(0x2A), PacketType::Other(0x2A));
    }

    #[test]
    fn test_type_comes_from_bits_24_to_31() {
        assert_eq!(PacketType::from_word(0x2B00_1234), PacketType::Raw10);
        assert_eq!(PacketType::from_word(0x0000_002B), PacketType::FrameStart);
        // Bits above 31 are not part of the type byte
        assert_eq!(PacketType::from_word(0xFF_2B00_0000), PacketType::Raw10);
    }

    #[test]
    fn test_header_word_layout() {
        let word = PacketType::Raw10.header_word(1315);
        assert_eq!(word, 0x2B00_0523);
        assert!(PacketType::from_word(word).is_pixel_data());
        assert!(!PacketType::FrameStart.is_pixel_data());
    }
}
