//! Register-level access to the platform
//!
//! The quirk engine never talks to hardware directly. Everything goes through
//! [`Platform`], which is implemented by the host backend, by
//! [`SimulatedPlatform`](super::sim::SimulatedPlatform) and by the mockall
//! generated `MockPlatform` in tests.
//!
//! None of the accessors can fail. A read against a device that does not
//! respond returns whatever the bus returns (all-ones by convention) and a
//! write to it is simply lost.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::superio;

/// A PCI function, addressed by bus/device/function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PciAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    /// Host/root bridge
    pub const ROOT_BRIDGE: Self = Self::new(0, 0, 0);
    /// AMD K8/K10 northbridge function 2 (DRAM controller)
    pub const AMD_DRAM: Self = Self::new(0, 24, 2);
    /// AMD K8/K10 northbridge function 3 (miscellaneous control)
    pub const AMD_MISC: Self = Self::new(0, 24, 3);
    /// Intel PCH SMBus function on the ISA bridge device
    pub const INTEL_SMBUS: Self = Self::new(0, 31, 4);

    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self { bus, device, function }
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{:x}", self.bus, self.device, self.function)
    }
}

/// Raw register access used by fingerprinting, rules and corrective actions
#[cfg_attr(test, mockall::automock)]
pub trait Platform {
    /// Read a byte from an I/O port
    fn inb(&mut self, port: u16) -> u8;

    /// Write a byte to an I/O port
    fn outb(&mut self, port: u16, value: u8);

    fn pci_read8(&mut self, addr: PciAddress, offset: u16) -> u8;
    fn pci_read16(&mut self, addr: PciAddress, offset: u16) -> u16;
    fn pci_read32(&mut self, addr: PciAddress, offset: u16) -> u32;

    fn pci_write8(&mut self, addr: PciAddress, offset: u16, value: u8);
    fn pci_write16(&mut self, addr: PciAddress, offset: u16, value: u16);
    fn pci_write32(&mut self, addr: PciAddress, offset: u16, value: u32);

    /// Busy-wait for at least `micros` microseconds
    fn usleep(&mut self, micros: u64);

    /// Write a Super-I/O register through the LPC index/data pair
    fn lpc_outb(&mut self, index: u8, value: u8) {
        self.outb(superio::INDEX_PORT, index);
        self.outb(superio::DATA_PORT, value);
    }

    /// Read a Super-I/O register through the LPC index/data pair
    fn lpc_inb(&mut self, index: u8) -> u8 {
        self.outb(superio::INDEX_PORT, index);
        self.inb(superio::DATA_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_address_display() {
        assert_eq!(PciAddress::ROOT_BRIDGE.to_string(), "00:00.0");
        assert_eq!(PciAddress::INTEL_SMBUS.to_string(), "00:1f.4");
        assert_eq!(PciAddress::AMD_MISC.to_string(), "00:18.3");
    }

    /// Minimal port-only backend that relies on the provided LPC helpers
    struct PortLog {
        writes: Vec<(u16, u8)>,
        data: u8,
    }

    impl Platform for PortLog {
        fn inb(&mut self, _port: u16) -> u8 {
            self.data
        }
        fn outb(&mut self, port: u16, value: u8) {
            self.writes.push((port, value));
        }
        fn pci_read8(&mut self, _: PciAddress, _: u16) -> u8 {
            0xFF
        }
        fn pci_read16(&mut self, _: PciAddress, _: u16) -> u16 {
            0xFFFF
        }
        fn pci_read32(&mut self, _: PciAddress, _: u16) -> u32 {
            0xFFFF_FFFF
        }
        fn pci_write8(&mut self, _: PciAddress, _: u16, _: u8) {}
        fn pci_write16(&mut self, _: PciAddress, _: u16, _: u16) {}
        fn pci_write32(&mut self, _: PciAddress, _: u16, _: u32) {}
        fn usleep(&mut self, _: u64) {}
    }

    #[test]
    fn test_lpc_helpers_use_index_then_data() {
        let mut p = PortLog { writes: Vec::new(), data: 0x5A };
        p.lpc_outb(0x07, 0x08);
        let v = p.lpc_inb(0xF1);
        assert_eq!(v, 0x5A);
        assert_eq!(p.writes, vec![(0x2E, 0x07), (0x2F, 0x08), (0x2E, 0xF1)]);
    }
}
