//! Transport seam between the command engine and a device.
//!
//! The wire protocol (framing, CRC, serial/TCP negotiation) lives behind this
//! trait; the engine only ever sees typed read/write primitives per function
//! code, addressed by a unit id. [`MemoryTransport`] is the in-process
//! implementation that makes this crate act as the device itself, answering
//! out of a [`DeviceMemory`].

use std::future::Future;

use crate::config::config as global_config;
use crate::error::MbconError;
use crate::memory::{Bank, DeviceMemory};

/// Typed Modbus-style primitives, one per supported function code.
///
/// Methods return `impl Future + Send` so implementations stay object-free
/// and the engine can be generic over the transport it owns.
pub trait Transport: Send {
    /// Read coils (function code 1).
    fn read_coils(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<bool>, MbconError>> + Send;

    /// Read discrete inputs (function code 2).
    fn read_discrete_inputs(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<bool>, MbconError>> + Send;

    /// Read holding registers (function code 3).
    fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, MbconError>> + Send;

    /// Read input registers (function code 4).
    fn read_input_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, MbconError>> + Send;

    /// Write a single coil (function code 5).
    fn write_single_coil(
        &mut self,
        unit_id: u8,
        address: u16,
        value: bool,
    ) -> impl Future<Output = Result<(), MbconError>> + Send;

    /// Write a single register (function code 6).
    fn write_single_register(
        &mut self,
        unit_id: u8,
        address: u16,
        value: u16,
    ) -> impl Future<Output = Result<(), MbconError>> + Send;

    /// Write multiple coils (function code 15).
    fn write_multiple_coils(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[bool],
    ) -> impl Future<Output = Result<(), MbconError>> + Send;

    /// Write multiple registers (function code 16).
    fn write_multiple_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = Result<(), MbconError>> + Send;

    /// Release the underlying connection. Called exactly once by the engine,
    /// on its terminal transition.
    fn close(&mut self) -> impl Future<Output = Result<(), MbconError>> + Send;
}

/// Device-simulation responder: a [`Transport`] answered entirely from local
/// [`DeviceMemory`].
///
/// The Modbus-style mapping follows the reference simulator: coils are the
/// bits of the holding area, discrete inputs the bits of the input area;
/// function codes 3/4 read holding/input words and all writes land in the
/// holding area.
pub struct MemoryTransport {
    memory: DeviceMemory,
    unit_id: u8,
}

impl MemoryTransport {
    #[must_use]
    pub fn new(memory: DeviceMemory, unit_id: u8) -> Self {
        Self { memory, unit_id }
    }

    /// Direct view of the simulated memory, bypassing the wire-level checks.
    #[must_use]
    pub fn memory(&self) -> &DeviceMemory {
        &self.memory
    }

    fn check_unit(&self, unit_id: u8) -> Result<(), MbconError> {
        if unit_id == self.unit_id {
            Ok(())
        } else {
            Err(MbconError::Transport(format!(
                "no response from unit {unit_id}"
            )))
        }
    }

    fn read_bit_block(&self, bank: Bank, address: u16, count: u16) -> Result<Vec<bool>, MbconError> {
        let mut bits = Vec::with_capacity(usize::from(count));
        for i in 0..count {
            let addr = address.checked_add(i).ok_or(MbconError::AddressRange {
                addr: u32::from(address),
                len: u32::from(count),
            })?;
            bits.push(self.memory.get_bit(bank, addr)?);
        }
        Ok(bits)
    }

    fn maybe_log(op: &str, address: u16, len: u16) {
        if global_config().log_frames {
            log::debug!("[sim {op}] addr={address} len={len}");
        }
    }
}

impl Transport for MemoryTransport {
    async fn read_coils(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, MbconError> {
        self.check_unit(unit_id)?;
        Self::maybe_log("read coils", address, count);
        self.read_bit_block(Bank::Holding, address, count)
    }

    async fn read_discrete_inputs(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, MbconError> {
        self.check_unit(unit_id)?;
        Self::maybe_log("read discrete inputs", address, count);
        self.read_bit_block(Bank::Input, address, count)
    }

    async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, MbconError> {
        self.check_unit(unit_id)?;
        Self::maybe_log("read holding", address, count);
        self.memory.get_registers(Bank::Holding, address, count)
    }

    async fn read_input_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, MbconError> {
        self.check_unit(unit_id)?;
        Self::maybe_log("read input", address, count);
        self.memory.get_registers(Bank::Input, address, count)
    }

    async fn write_single_coil(
        &mut self,
        unit_id: u8,
        address: u16,
        value: bool,
    ) -> Result<(), MbconError> {
        self.check_unit(unit_id)?;
        log::debug!("set coil {address} = {value}");
        self.memory.set_bit(Bank::Holding, address, value)
    }

    async fn write_single_register(
        &mut self,
        unit_id: u8,
        address: u16,
        value: u16,
    ) -> Result<(), MbconError> {
        self.check_unit(unit_id)?;
        log::debug!("set register {address} = {value}");
        self.memory.set_register(Bank::Holding, address, value)
    }

    async fn write_multiple_coils(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[bool],
    ) -> Result<(), MbconError> {
        self.check_unit(unit_id)?;
        Self::maybe_log("write coils", address, values.len() as u16);
        for (i, &value) in values.iter().enumerate() {
            let addr = address
                .checked_add(i as u16)
                .ok_or(MbconError::AddressRange {
                    addr: u32::from(address),
                    len: values.len() as u32,
                })?;
            self.memory.set_bit(Bank::Holding, addr, value)?;
        }
        Ok(())
    }

    async fn write_multiple_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), MbconError> {
        self.check_unit(unit_id)?;
        Self::maybe_log("write registers", address, values.len() as u16);
        for (i, &value) in values.iter().enumerate() {
            let addr = address
                .checked_add(i as u16)
                .ok_or(MbconError::AddressRange {
                    addr: u32::from(address),
                    len: values.len() as u32,
                })?;
            self.memory.set_register(Bank::Holding, addr, value)?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MbconError> {
        log::debug!("simulated device released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unit_mismatch_is_a_transport_error() {
        let mut t = MemoryTransport::new(DeviceMemory::new(8, 8), 1);
        let err = t.read_holding_registers(9, 0, 1).await.unwrap_err();
        assert!(matches!(err, MbconError::Transport(_)));
    }

    #[tokio::test]
    async fn write_then_read_registers() {
        let mut t = MemoryTransport::new(DeviceMemory::new(8, 8), 1);
        t.write_multiple_registers(1, 2, &[10, 20, 30]).await.expect("write");
        let words = t.read_holding_registers(1, 0, 6).await.expect("read");
        assert_eq!(words, vec![0, 0, 10, 20, 30, 0]);
        // the backing memory shows the same words without going over the wire
        assert_eq!(t.memory().get_register(Bank::Holding, 3).expect("peek"), 20);
    }

    #[tokio::test]
    async fn coils_overlay_holding_words() {
        let mut t = MemoryTransport::new(DeviceMemory::new(8, 8), 1);
        t.write_single_register(1, 0, 0xffff).await.expect("write");
        t.write_single_coil(1, 3, false).await.expect("coil");
        let coils = t.read_coils(1, 0, 8).await.expect("read");
        assert_eq!(coils, vec![true, true, true, false, true, true, true, true]);
        let word = t.read_holding_registers(1, 0, 1).await.expect("read");
        assert_eq!(word, vec![0xffff & !(1 << 3)]);
    }

    #[tokio::test]
    async fn discrete_inputs_come_from_input_area() {
        let mut mem = DeviceMemory::new(8, 8);
        mem.set_register(Bank::Input, 0, 0b101).expect("seed");
        let mut t = MemoryTransport::new(mem, 1);
        let bits = t.read_discrete_inputs(1, 0, 3).await.expect("read");
        assert_eq!(bits, vec![true, false, true]);
    }
}
