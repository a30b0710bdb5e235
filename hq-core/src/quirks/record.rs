//! Quirk record produced by detection
//!
//! The record is built once by [`evaluate`](super::engine::evaluate) and then
//! only read. `domains` accumulates across every matching rule while `id` and
//! `action` always describe the last matching rule in table order.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::actions::{CorrectiveAction, SystemState};
use crate::hw::Platform;

/// Known quirks, one per rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuirkId {
    #[default]
    None,
    AliAladdinV,
    AsusTusl2,
    SuperMicroX10sdvNoSmp,
    K8BStepNoTemp,
    K8RevFgTemp,
    AmdErrata319,
    AdlSmbusUnlock,
}

impl QuirkId {
    /// Human readable name for reports
    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AliAladdinV => "ALi Aladdin V external L2 cache",
            Self::AsusTusl2 => "ASUS TUSL2-C SMBus mux",
            Self::SuperMicroX10sdvNoSmp => "SuperMicro X10SDV SMP disabled",
            Self::K8BStepNoTemp => "AMD K8 B-stepping without thermal diode",
            Self::K8RevFgTemp => "AMD K8 rev F/G temperature sensor",
            Self::AmdErrata319 => "AMD K10 errata #319 thermal diode",
            Self::AdlSmbusUnlock => "Alder Lake-N SMBus unlock",
        }
    }
}

impl fmt::Display for QuirkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

bitflags! {
    /// Diagnostic subsystems affected by a matched quirk
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct QuirkDomains: u8 {
        /// Memory / cache size detection
        const MEM_SIZE = 1 << 0;
        /// SMBus (SPD) access
        const SMBUS = 1 << 1;
        /// Multiprocessor start-up
        const SMP = 1 << 2;
        /// Temperature reporting
        const TEMP = 1 << 3;
    }
}

/// Outcome of quirk detection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuirkRecord {
    pub id: QuirkId,
    pub domains: QuirkDomains,
    pub root_vid: u16,
    pub root_did: u16,
    pub action: Option<CorrectiveAction>,
}

impl QuirkRecord {
    /// Empty record for a platform whose root bridge reported `root_vid:root_did`
    pub fn empty(root_vid: u16, root_did: u16) -> Self {
        Self {
            root_vid,
            root_did,
            ..Self::default()
        }
    }

    /// No rule matched. This does not prove the platform is unaffected.
    pub fn is_empty(&self) -> bool {
        self.id == QuirkId::None && self.domains.is_empty()
    }

    pub fn affects(&self, domains: QuirkDomains) -> bool {
        self.domains.intersects(domains)
    }

    /// Whether the diagnostic may start application processors
    pub fn smp_allowed(&self) -> bool {
        !self.domains.contains(QuirkDomains::SMP)
    }

    /// Run the deferred corrective action, if the last matching rule left one
    ///
    /// Returns whether an action ran. Callers invoke this at most once.
    pub fn process(&self, platform: &mut dyn Platform, state: &mut SystemState) -> bool {
        match &self.action {
            Some(action) => {
                action.apply(platform, state);
                true
            }
            None => false,
        }
    }
}
