//! Addressable memory of the simulated device.
//!
//! Two independent word arrays (input and holding) back every register and
//! bit access. Bit addresses are derived, never stored: bit `a` lives in word
//! `a / 16` at position `a % 16`, and writing it must leave the other fifteen
//! bits of that word untouched.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MbconError;

const BITS_PER_REGISTER: u16 = 16;

/// Which of the two register areas an access targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    Input,
    Holding,
}

#[derive(Debug, Clone)]
pub struct DeviceMemory {
    input: Vec<u16>,
    holding: Vec<u16>,
}

impl DeviceMemory {
    /// Zero-filled memory of the given sizes (in registers).
    #[must_use]
    pub fn new(input_len: usize, holding_len: usize) -> Self {
        Self {
            input: vec![0; input_len],
            holding: vec![0; holding_len],
        }
    }

    /// Build memory from a parsed [`MemoryImage`], applying every preset
    /// block. Preset addresses outside the configured sizes are rejected.
    pub fn from_image(image: &MemoryImage) -> Result<Self, MbconError> {
        let mut mem = Self::new(image.input_len, image.holding_len);
        for preset in &image.preset {
            let mut addr = preset.addr;
            for &value in &preset.values {
                mem.set_register(preset.bank, addr, value)?;
                addr = addr.checked_add(1).ok_or(MbconError::AddressRange {
                    addr: u32::from(preset.addr),
                    len: preset.values.len() as u32,
                })?;
            }
        }
        Ok(mem)
    }

    /// Size of one register area, in words.
    #[must_use]
    pub fn len(&self, bank: Bank) -> usize {
        self.bank(bank).len()
    }

    fn bank(&self, bank: Bank) -> &[u16] {
        match bank {
            Bank::Input => &self.input,
            Bank::Holding => &self.holding,
        }
    }

    fn bank_mut(&mut self, bank: Bank) -> &mut [u16] {
        match bank {
            Bank::Input => &mut self.input,
            Bank::Holding => &mut self.holding,
        }
    }

    pub fn get_register(&self, bank: Bank, addr: u16) -> Result<u16, MbconError> {
        self.bank(bank)
            .get(usize::from(addr))
            .copied()
            .ok_or(MbconError::AddressRange {
                addr: u32::from(addr),
                len: 1,
            })
    }

    /// Contiguous read of `count` registers starting at `addr`.
    pub fn get_registers(&self, bank: Bank, addr: u16, count: u16) -> Result<Vec<u16>, MbconError> {
        let start = usize::from(addr);
        let end = start + usize::from(count);
        self.bank(bank)
            .get(start..end)
            .map(<[u16]>::to_vec)
            .ok_or(MbconError::AddressRange {
                addr: u32::from(addr),
                len: u32::from(count),
            })
    }

    /// Whole-word overwrite.
    pub fn set_register(&mut self, bank: Bank, addr: u16, value: u16) -> Result<(), MbconError> {
        let slot = self
            .bank_mut(bank)
            .get_mut(usize::from(addr))
            .ok_or(MbconError::AddressRange {
                addr: u32::from(addr),
                len: 1,
            })?;
        *slot = value;
        Ok(())
    }

    pub fn get_bit(&self, bank: Bank, addr: u16) -> Result<bool, MbconError> {
        let word = self.get_register(bank, addr / BITS_PER_REGISTER)?;
        Ok((word >> (addr % BITS_PER_REGISTER)) & 1 != 0)
    }

    /// Set or clear one bit, preserving the other fifteen bits of its word.
    pub fn set_bit(&mut self, bank: Bank, addr: u16, value: bool) -> Result<(), MbconError> {
        let word_addr = addr / BITS_PER_REGISTER;
        let mask = 1u16 << (addr % BITS_PER_REGISTER);
        let word = self.get_register(bank, word_addr)?;
        let word = if value { word | mask } else { word & !mask };
        self.set_register(bank, word_addr, word)
    }
}

/// TOML-loadable description of a simulated device's memory: area sizes plus
/// optional preset register blocks.
///
/// ```toml
/// input_len = 2000
/// holding_len = 2000
///
/// [[preset]]
/// bank = "holding"
/// addr = 100
/// values = [0x42c8, 0x0000]
/// ```
#[derive(Debug, Deserialize)]
pub struct MemoryImage {
    #[serde(default = "default_area_len")]
    pub input_len: usize,
    #[serde(default = "default_area_len")]
    pub holding_len: usize,
    #[serde(default)]
    pub preset: Vec<PresetBlock>,
}

#[derive(Debug, Deserialize)]
pub struct PresetBlock {
    pub bank: Bank,
    pub addr: u16,
    pub values: Vec<u16>,
}

// Size of the original reference simulator's register areas.
const fn default_area_len() -> usize {
    2000
}

/// Parse a memory image from TOML text.
pub fn parse_image(s: &str) -> Result<MemoryImage, MbconError> {
    toml::from_str(s).map_err(|e| MbconError::Image(e.to_string()))
}

/// Read and parse a memory image file.
pub fn load_image_file(path: impl AsRef<Path>) -> Result<MemoryImage, MbconError> {
    let s = std::fs::read_to_string(path)?;
    parse_image(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_register() {
        let mut mem = DeviceMemory::new(8, 8);
        mem.set_register(Bank::Holding, 3, 0xbeef).expect("set");
        assert_eq!(mem.get_register(Bank::Holding, 3).expect("get"), 0xbeef);
        // banks are independent
        assert_eq!(mem.get_register(Bank::Input, 3).expect("get"), 0);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut mem = DeviceMemory::new(4, 4);
        assert!(mem.get_register(Bank::Input, 4).is_err());
        assert!(mem.get_registers(Bank::Holding, 2, 3).is_err());
        assert!(mem.set_register(Bank::Holding, 100, 1).is_err());
        assert!(mem.get_bit(Bank::Holding, 64).is_err());
    }

    #[test]
    fn bit_write_preserves_siblings() {
        let mut mem = DeviceMemory::new(4, 4);
        mem.set_register(Bank::Holding, 1, 0b1010_0101_0110_1001).expect("set");
        for bit in 16..32u16 {
            let before = mem.get_register(Bank::Holding, 1).expect("get");
            mem.set_bit(Bank::Holding, bit, true).expect("set bit");
            mem.set_bit(Bank::Holding, bit, false).expect("clear bit");
            let after = mem.get_register(Bank::Holding, 1).expect("get");
            assert_eq!(before & !(1 << (bit % 16)), after & !(1 << (bit % 16)));
            assert_eq!(after & (1 << (bit % 16)), 0);
        }
    }

    #[test]
    fn bit_addressing_maps_into_words() {
        let mut mem = DeviceMemory::new(4, 4);
        mem.set_bit(Bank::Input, 17, true).expect("set bit");
        assert_eq!(mem.get_register(Bank::Input, 1).expect("get"), 0b10);
        assert!(mem.get_bit(Bank::Input, 17).expect("get bit"));
        assert!(!mem.get_bit(Bank::Input, 16).expect("get bit"));
    }

    #[test]
    fn image_presets_are_applied() {
        let image = parse_image(
            r#"
            input_len = 16
            holding_len = 16

            [[preset]]
            bank = "holding"
            addr = 4
            values = [17064, 0]

            [[preset]]
            bank = "input"
            addr = 0
            values = [1, 2, 3]
            "#,
        )
        .expect("parse");
        let mem = DeviceMemory::from_image(&image).expect("build");
        assert_eq!(mem.len(Bank::Input), 16);
        assert_eq!(mem.len(Bank::Holding), 16);
        assert_eq!(mem.get_registers(Bank::Holding, 4, 2).expect("get"), vec![17064, 0]);
        assert_eq!(mem.get_registers(Bank::Input, 0, 3).expect("get"), vec![1, 2, 3]);
    }

    #[test]
    fn image_preset_out_of_range_is_rejected() {
        let image = parse_image(
            r#"
            input_len = 4
            holding_len = 4

            [[preset]]
            bank = "input"
            addr = 3
            values = [1, 2]
            "#,
        )
        .expect("parse");
        assert!(DeviceMemory::from_image(&image).is_err());
    }

    #[test]
    fn image_defaults_match_reference_simulator() {
        let image = parse_image("").expect("parse");
        assert_eq!(image.input_len, 2000);
        assert_eq!(image.holding_len, 2000);
        assert!(image.preset.is_empty());
    }
}
