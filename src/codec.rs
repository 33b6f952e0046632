//! Register/float codec.
//!
//! Field devices expose IEEE-754 single-precision values as pairs of 16-bit
//! registers, but vendors disagree on which register carries the high half of
//! the float and on the byte order inside each register. [`ByteOrder`] names
//! the four conventions seen in the wild; the codec is pure and parameterized
//! per call, never global state.

use std::str::FromStr;

/// Word/byte packing convention for one float spread over two registers.
///
/// The first letter is the word order (Big: register 0 holds the high half),
/// the second the byte order within each register (Big: most significant byte
/// first). Command suffixes: `b`, `bb`, `l`, `lb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    BigBig,
    BigLittle,
    LittleBig,
    LittleLittle,
}

impl ByteOrder {
    pub const ALL: [Self; 4] = [Self::BigBig, Self::BigLittle, Self::LittleBig, Self::LittleLittle];

    /// Command-name suffix selecting this variant (`fc3b`, `fc3bb`, ...).
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::BigBig => "b",
            Self::BigLittle => "bb",
            Self::LittleBig => "l",
            Self::LittleLittle => "lb",
        }
    }

    const fn word0_high(self) -> bool {
        matches!(self, Self::BigBig | Self::BigLittle)
    }

    const fn swapped_bytes(self) -> bool {
        matches!(self, Self::BigLittle | Self::LittleLittle)
    }
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "b" => Ok(Self::BigBig),
            "bb" => Ok(Self::BigLittle),
            "l" => Ok(Self::LittleBig),
            "lb" => Ok(Self::LittleLittle),
            other => Err(format!("unknown byte order suffix: {other}")),
        }
    }
}

// The two bytes of one register in float order (most significant float byte
// first), honoring the in-word swap of the variant.
fn word_bytes(word: u16, swapped: bool) -> [u8; 2] {
    let b = word.to_be_bytes();
    if swapped {
        [b[1], b[0]]
    } else {
        b
    }
}

/// Decode consecutive register pairs into floats, in input order.
///
/// A trailing odd register is ignored; partial pairs cannot carry a value.
#[must_use]
pub fn decode_floats(registers: &[u16], order: ByteOrder) -> Vec<f32> {
    registers
        .chunks_exact(2)
        .map(|pair| {
            let (hi, lo) = if order.word0_high() {
                (pair[0], pair[1])
            } else {
                (pair[1], pair[0])
            };
            let h = word_bytes(hi, order.swapped_bytes());
            let l = word_bytes(lo, order.swapped_bytes());
            f32::from_be_bytes([h[0], h[1], l[0], l[1]])
        })
        .collect()
}

/// Encode one float into its register pair. Exact inverse of
/// [`decode_floats`] for every finite value and every variant.
#[must_use]
pub fn encode_float(value: f32, order: ByteOrder) -> [u16; 2] {
    let b = value.to_be_bytes();
    let assemble = |msb: u8, lsb: u8| {
        if order.swapped_bytes() {
            u16::from_be_bytes([lsb, msb])
        } else {
            u16::from_be_bytes([msb, lsb])
        }
    };
    let hi = assemble(b[0], b[1]);
    let lo = assemble(b[2], b[3]);
    if order.word0_high() {
        [hi, lo]
    } else {
        [lo, hi]
    }
}
