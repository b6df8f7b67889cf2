// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wire codec of the PLC link

/// Length of an outbound force frame
pub const FORCE_FRAME_LEN: usize = 4;

/// Length of an inbound status frame
pub const STATUS_FRAME_LEN: usize = 2;

const STATUS_WORD_ACTIVE: u16 = 0x0100;
const STATUS_WORD_INACTIVE: u16 = 0x0000;

/// Logging-enable signal decoded from a status word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSignal {
    /// The PLC asks for a logging session
    Active,
    /// The PLC asks to stop logging
    Inactive,
    /// Unrecognized or incomplete word; never changes logging state
    Unknown,
}

impl StatusSignal {
    /// Decode a status word
    pub fn from_word(word: u16) -> Self {
        match word {
            STATUS_WORD_ACTIVE => StatusSignal::Active,
            STATUS_WORD_INACTIVE => StatusSignal::Inactive,
            _ => StatusSignal::Unknown,
        }
    }

    /// Decode the bytes of one read
    ///
    /// Total: anything but exactly 2 bytes forming a recognized big-endian
    /// word decodes to [`StatusSignal::Unknown`].
    pub fn decode(bytes: &[u8]) -> Self {
        match bytes {
            [high, low] => Self::from_word(u16::from_be_bytes([*high, *low])),
            _ => StatusSignal::Unknown,
        }
    }
}

/// Encode a force value as a 4-byte big-endian IEEE-754 frame
pub fn encode_force(value: f32) -> [u8; FORCE_FRAME_LEN] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_recognized_words() {
        assert_eq!(StatusSignal::decode(&[0x01, 0x00]), StatusSignal::Active);
        assert_eq!(StatusSignal::decode(&[0x00, 0x00]), StatusSignal::Inactive);
        assert_eq!(StatusSignal::from_word(0x0100), StatusSignal::Active);
        assert_eq!(StatusSignal::from_word(0x0000), StatusSignal::Inactive);
    }

    #[test]
    fn test_decode_is_total() {
        for word in 0..=u16::MAX {
            let expected = match word {
                0x0100 => StatusSignal::Active,
                0x0000 => StatusSignal::Inactive,
                _ => StatusSignal::Unknown,
            };
            assert_eq!(StatusSignal::decode(&word.to_be_bytes()), expected);
        }
    }

    #[test]
    fn test_decode_short_and_long_reads() {
        assert_eq!(StatusSignal::decode(&[]), StatusSignal::Unknown);
        assert_eq!(StatusSignal::decode(&[0x01]), StatusSignal::Unknown);
        assert_eq!(StatusSignal::decode(&[0x00]), StatusSignal::Unknown);
        assert_eq!(
            StatusSignal::decode(&[0x01, 0x00, 0x00]),
            StatusSignal::Unknown
        );
    }

    #[test]
    fn test_encode_force_big_endian() {
        assert_eq!(encode_force(-0.5), [0xBF, 0x00, 0x00, 0x00]);
        assert_eq!(encode_force(1.0), [0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(encode_force(0.0), [0x00, 0x00, 0x00, 0x00]);
    }
}
