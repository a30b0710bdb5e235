//! Simulated platform and JSON platform fixtures
//!
//! [`SimulatedPlatform`] models just enough of a PC to run the quirk engine
//! off-target: a sparse PCI configuration space, a flat I/O port space and a
//! Super-I/O register file behind the 0x2E/0x2F index/data pair. Every access
//! is appended to an operation log so tests can assert exact register traffic.
//!
//! [`PlatformFixture`] is the on-disk form of a machine: the CPU signature,
//! the memory-controller classification and the config-space bytes the rules
//! consult. Fixtures are captured from real hardware with [`capture_fixture`]
//! and replayed through the simulator.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use hq_error::{QuirkError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cpuid::CpuSignature;
use super::platform::{PciAddress, Platform};
use crate::constants::{pci, superio};
use crate::quirks::fingerprint::ImcKind;

// ============================================================================
// Operation Log
// ============================================================================

/// One register access observed by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BusOp {
    PortRead { port: u16, value: u8 },
    PortWrite { port: u16, value: u8 },
    PciRead { addr: PciAddress, offset: u16, width: u8, value: u32 },
    PciWrite { addr: PciAddress, offset: u16, width: u8, value: u32 },
    Delay { micros: u64 },
}

impl BusOp {
    pub fn is_write(&self) -> bool {
        matches!(self, Self::PortWrite { .. } | Self::PciWrite { .. })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A run of consecutive config-space bytes starting at `offset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciRegion {
    pub address: PciAddress,
    pub offset: u16,
    pub bytes: Vec<u8>,
}

/// A single Super-I/O register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperIoRegister {
    pub index: u8,
    pub value: u8,
}

/// Serialized description of a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformFixture {
    pub cpu: CpuSignature,
    #[serde(default)]
    pub imc: ImcKind,
    #[serde(default)]
    pub pci: Vec<PciRegion>,
    #[serde(default)]
    pub superio: Vec<SuperIoRegister>,
}

impl PlatformFixture {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| QuirkError::file_read(path, e))?;
        let fixture: Self = serde_json::from_str(&data)?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Every PCI region must fit inside one function's config space
    pub fn validate(&self) -> Result<()> {
        for region in &self.pci {
            let end = usize::from(region.offset) + region.bytes.len();
            if end > pci::CONFIG_SPACE_SIZE {
                return Err(QuirkError::invalid_config(
                    "pci",
                    format!(
                        "region {} at {:#x} with {} bytes ends past config space ({:#x})",
                        region.address,
                        region.offset,
                        region.bytes.len(),
                        pci::CONFIG_SPACE_SIZE
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| QuirkError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Config-space windows the quirk rules and actions can touch
const CAPTURE_WINDOWS: &[(PciAddress, u16, u16)] = &[
    // IDs, subsystem IDs and the ALi L2 cache registers
    (PciAddress::ROOT_BRIDGE, 0x00, 0x50),
    (PciAddress::AMD_DRAM, 0x94, 0x04),
    (PciAddress::AMD_MISC, 0xE4, 0x04),
    (PciAddress::INTEL_SMBUS, 0x00, 0x08),
];

/// Record the registers the quirk rules consult into a fixture
///
/// Only plain config-space reads are issued. Functions whose vendor ID reads
/// back as all-ones are left out. Super-I/O registers are not captured since
/// reaching them requires entering configuration mode.
pub fn capture_fixture(platform: &mut dyn Platform, cpu: CpuSignature, imc: ImcKind) -> PlatformFixture {
    let mut regions = Vec::new();
    for &(address, offset, len) in CAPTURE_WINDOWS {
        if platform.pci_read16(address, pci::VENDOR_ID) == pci::ABSENT_U16 {
            debug!(%address, "Skipping absent function");
            continue;
        }
        let bytes = (offset..offset + len)
            .map(|o| platform.pci_read8(address, o))
            .collect();
        regions.push(PciRegion { address, offset, bytes });
    }

    PlatformFixture {
        cpu,
        imc,
        pci: regions,
        superio: Vec::new(),
    }
}

// ============================================================================
// Simulator
// ============================================================================

/// In-memory [`Platform`] with an operation log
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlatform {
    config: BTreeMap<(PciAddress, u16), u8>,
    ports: BTreeMap<u16, u8>,
    superio: BTreeMap<u8, u8>,
    superio_index: u8,
    ops: Vec<BusOp>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: &PlatformFixture) -> Self {
        let mut sim = Self::new();
        for region in &fixture.pci {
            sim.store(region.address, region.offset, &region.bytes);
        }
        for reg in &fixture.superio {
            sim.superio.insert(reg.index, reg.value);
        }
        sim
    }

    pub fn with_pci8(mut self, addr: PciAddress, offset: u16, value: u8) -> Self {
        self.store(addr, offset, &[value]);
        self
    }

    pub fn with_pci16(mut self, addr: PciAddress, offset: u16, value: u16) -> Self {
        self.store(addr, offset, &value.to_le_bytes());
        self
    }

    pub fn with_pci32(mut self, addr: PciAddress, offset: u16, value: u32) -> Self {
        self.store(addr, offset, &value.to_le_bytes());
        self
    }

    pub fn with_superio(mut self, index: u8, value: u8) -> Self {
        self.superio.insert(index, value);
        self
    }

    /// Identify the root bridge, the common starting point for most fixtures
    pub fn with_root_bridge(self, vid: u16, did: u16, sub_vid: u16, sub_did: u16) -> Self {
        self.with_pci16(PciAddress::ROOT_BRIDGE, pci::VENDOR_ID, vid)
            .with_pci16(PciAddress::ROOT_BRIDGE, pci::DEVICE_ID, did)
            .with_pci16(PciAddress::ROOT_BRIDGE, pci::SUBSYSTEM_VENDOR_ID, sub_vid)
            .with_pci16(PciAddress::ROOT_BRIDGE, pci::SUBSYSTEM_DEVICE_ID, sub_did)
    }

    /// Inspect config space without logging an access
    pub fn peek8(&self, addr: PciAddress, offset: u16) -> u8 {
        self.load(addr, offset, 1) as u8
    }

    pub fn peek16(&self, addr: PciAddress, offset: u16) -> u16 {
        self.load(addr, offset, 2) as u16
    }

    pub fn peek32(&self, addr: PciAddress, offset: u16) -> u32 {
        self.load(addr, offset, 4)
    }

    pub fn peek_superio(&self, index: u8) -> Option<u8> {
        self.superio.get(&index).copied()
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    pub fn writes(&self) -> impl Iterator<Item = &BusOp> {
        self.ops.iter().filter(|op| op.is_write())
    }

    /// Bytes that would land outside config space are dropped
    fn store(&mut self, addr: PciAddress, offset: u16, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            if let Some(at) = config_offset(offset, i) {
                self.config.insert((addr, at), *b);
            }
        }
    }

    /// Bytes outside config space read as absent
    fn load(&self, addr: PciAddress, offset: u16, width: u16) -> u32 {
        (0..usize::from(width)).rev().fold(0u32, |acc, i| {
            let byte = config_offset(offset, i)
                .and_then(|at| self.config.get(&(addr, at)).copied())
                .unwrap_or(pci::ABSENT_U8);
            (acc << 8) | u32::from(byte)
        })
    }

    fn read(&mut self, addr: PciAddress, offset: u16, width: u8) -> u32 {
        let value = self.load(addr, offset, u16::from(width));
        self.ops.push(BusOp::PciRead { addr, offset, width, value });
        value
    }

    fn write(&mut self, addr: PciAddress, offset: u16, width: u8, value: u32) {
        let bytes = value.to_le_bytes();
        self.store(addr, offset, &bytes[..usize::from(width)]);
        self.ops.push(BusOp::PciWrite { addr, offset, width, value });
    }
}

fn config_offset(base: u16, index: usize) -> Option<u16> {
    u16::try_from(index)
        .ok()
        .and_then(|i| base.checked_add(i))
        .filter(|at| usize::from(*at) < pci::CONFIG_SPACE_SIZE)
}

impl Platform for SimulatedPlatform {
    fn inb(&mut self, port: u16) -> u8 {
        let value = match port {
            superio::INDEX_PORT => self.superio_index,
            superio::DATA_PORT => self
                .superio
                .get(&self.superio_index)
                .copied()
                .unwrap_or(pci::ABSENT_U8),
            _ => self.ports.get(&port).copied().unwrap_or(pci::ABSENT_U8),
        };
        self.ops.push(BusOp::PortRead { port, value });
        value
    }

    fn outb(&mut self, port: u16, value: u8) {
        match port {
            superio::INDEX_PORT => self.superio_index = value,
            superio::DATA_PORT => {
                self.superio.insert(self.superio_index, value);
            }
            _ => {
                self.ports.insert(port, value);
            }
        }
        self.ops.push(BusOp::PortWrite { port, value });
    }

    fn pci_read8(&mut self, addr: PciAddress, offset: u16) -> u8 {
        self.read(addr, offset, 1) as u8
    }

    fn pci_read16(&mut self, addr: PciAddress, offset: u16) -> u16 {
        self.read(addr, offset, 2) as u16
    }

    fn pci_read32(&mut self, addr: PciAddress, offset: u16) -> u32 {
        self.read(addr, offset, 4)
    }

    fn pci_write8(&mut self, addr: PciAddress, offset: u16, value: u8) {
        self.write(addr, offset, 1, u32::from(value));
    }

    fn pci_write16(&mut self, addr: PciAddress, offset: u16, value: u16) {
        self.write(addr, offset, 2, u32::from(value));
    }

    fn pci_write32(&mut self, addr: PciAddress, offset: u16, value: u32) {
        self.write(addr, offset, 4, value);
    }

    fn usleep(&mut self, micros: u64) {
        self.ops.push(BusOp::Delay { micros });
    }
}
