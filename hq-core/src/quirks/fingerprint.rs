//! Platform fingerprint
//!
//! The identifying values the quirk rules are keyed on, read once before
//! evaluation and never modified afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use crate::constants::pci;
use crate::hw::{CpuSignature, PciAddress, Platform};

/// Memory-controller / platform classification
///
/// Produced by the memory-controller detection that runs before quirk
/// detection. Only [`ImcKind::IntelAdlN`] is consulted by a rule today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImcKind {
    #[default]
    Unknown,
    AmdK8,
    AmdK10,
    AmdZen,
    IntelSkl,
    IntelAdl,
    IntelAdlN,
    IntelRpl,
    IntelMtl,
}

impl ImcKind {
    pub const ALL: [ImcKind; 9] = [
        Self::Unknown,
        Self::AmdK8,
        Self::AmdK10,
        Self::AmdZen,
        Self::IntelSkl,
        Self::IntelAdl,
        Self::IntelAdlN,
        Self::IntelRpl,
        Self::IntelMtl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::AmdK8 => "amd_k8",
            Self::AmdK10 => "amd_k10",
            Self::AmdZen => "amd_zen",
            Self::IntelSkl => "intel_skl",
            Self::IntelAdl => "intel_adl",
            Self::IntelAdlN => "intel_adl_n",
            Self::IntelRpl => "intel_rpl",
            Self::IntelMtl => "intel_mtl",
        }
    }
}

impl fmt::Display for ImcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImcKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .find(|k| k.as_str() == wanted)
            .copied()
            .ok_or_else(|| format!("unknown memory controller kind '{}'", s))
    }
}

/// Everything the quirk rules are allowed to look at without touching
/// additional registers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fingerprint {
    pub root_vid: u16,
    pub root_did: u16,
    pub root_subsys_vid: u16,
    pub root_subsys_did: u16,
    pub cpu: CpuSignature,
    pub imc: ImcKind,
}

impl Fingerprint {
    /// Read the root bridge identity registers and combine them with the
    /// already decoded CPU signature and memory-controller classification
    ///
    /// No presence check is made: a missing root bridge reads as all-ones and
    /// simply fails to match any rule.
    ///
    /// The subsystem IDs are read on every run, not only after an i815 or
    /// Broadwell-DE root bridge match, so each acquisition is four reads.
    pub fn acquire(platform: &mut dyn Platform, cpu: CpuSignature, imc: ImcKind) -> Self {
        let root = PciAddress::ROOT_BRIDGE;
        let fp = Self {
            root_vid: platform.pci_read16(root, pci::VENDOR_ID),
            root_did: platform.pci_read16(root, pci::DEVICE_ID),
            root_subsys_vid: platform.pci_read16(root, pci::SUBSYSTEM_VENDOR_ID),
            root_subsys_did: platform.pci_read16(root, pci::SUBSYSTEM_DEVICE_ID),
            cpu,
            imc,
        };
        trace!(
            root = format!("{:04x}:{:04x}", fp.root_vid, fp.root_did),
            subsys = format!("{:04x}:{:04x}", fp.root_subsys_vid, fp.root_subsys_did),
            imc = %fp.imc,
            "Fingerprint acquired"
        );
        fp
    }

    pub fn root_is(&self, vid: u16, did: u16) -> bool {
        self.root_vid == vid && self.root_did == did
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{BusOp, SimulatedPlatform};

    #[test]
    fn test_acquire_reads_root_ids() {
        let mut sim = SimulatedPlatform::new().with_root_bridge(0x8086, 0x1130, 0x1043, 0x8027);
        let fp = Fingerprint::acquire(&mut sim, CpuSignature::default(), ImcKind::Unknown);

        assert!(fp.root_is(0x8086, 0x1130));
        assert_eq!(fp.root_subsys_vid, 0x1043);
        assert_eq!(fp.root_subsys_did, 0x8027);

        let offsets: Vec<u16> = sim
            .ops()
            .iter()
            .map(|op| match op {
                BusOp::PciRead { addr, offset, width: 2, .. } if *addr == PciAddress::ROOT_BRIDGE => *offset,
                other => panic!("unexpected access {:?}", other),
            })
            .collect();
        assert_eq!(offsets, vec![0x00, 0x02, 0x2C, 0x2E]);
    }

    #[test]
    fn test_acquire_absent_root_bridge() {
        let mut sim = SimulatedPlatform::new();
        let fp = Fingerprint::acquire(&mut sim, CpuSignature::default(), ImcKind::IntelAdlN);
        assert_eq!(fp.root_vid, 0xFFFF);
        assert_eq!(fp.root_did, 0xFFFF);
        assert_eq!(fp.imc, ImcKind::IntelAdlN);
        // Subsystem IDs are read even though no root bridge answered
        assert_eq!(sim.ops().len(), 4);
        assert_eq!((fp.root_subsys_vid, fp.root_subsys_did), (0xFFFF, 0xFFFF));
    }

    #[test]
    fn test_imc_kind_parse() {
        assert_eq!("intel_adl_n".parse::<ImcKind>(), Ok(ImcKind::IntelAdlN));
        assert_eq!("Intel-ADL-N".parse::<ImcKind>(), Ok(ImcKind::IntelAdlN));
        assert!("pentium".parse::<ImcKind>().is_err());
    }

    #[test]
    fn test_imc_kind_serde_matches_display() {
        for kind in ImcKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
