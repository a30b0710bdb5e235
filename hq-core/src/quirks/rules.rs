//! Quirk rule table
//!
//! Every rule is an independent predicate over the [`Fingerprint`]. A rule
//! may issue extra config reads, but only after its cheaper identity checks
//! pass. Rules never touch the record; they return a [`RuleMatch`] and the
//! engine decides how it is folded in.
//!
//! Please add a short comment naming the board or erratum for every rule.

use super::actions::{k8_select_temp_sensor, CorrectiveAction};
use super::fingerprint::{Fingerprint, ImcKind};
use super::record::{QuirkDomains, QuirkId};
use crate::constants::{amd, device, pci, vendor};
use crate::hw::{PciAddress, Platform};

/// Fix-up performed during evaluation instead of being deferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateFixup {
    /// Switch a K8 rev F/G part to its working temperature sensor
    K8SensorSelect,
}

impl ImmediateFixup {
    pub fn run(&self, platform: &mut dyn Platform) {
        match self {
            Self::K8SensorSelect => k8_select_temp_sensor(platform),
        }
    }
}

/// Partial update produced by a matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub id: QuirkId,
    pub domains: QuirkDomains,
    pub action: Option<CorrectiveAction>,
    pub immediate: Option<ImmediateFixup>,
}

impl RuleMatch {
    fn deferred(id: QuirkId, domains: QuirkDomains, action: CorrectiveAction) -> Self {
        Self { id, domains, action: Some(action), immediate: None }
    }
}

pub type RuleFn = fn(&Fingerprint, &mut dyn Platform) -> Option<RuleMatch>;

/// A named entry of the rule table
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: QuirkId,
    pub check: RuleFn,
}

/// Rules in evaluation order. Order matters: later matches replace the
/// identifier and action of earlier ones.
pub const RULES: [Rule; 7] = [
    Rule { id: QuirkId::AliAladdinV, check: ali_aladdin_v },
    Rule { id: QuirkId::AsusTusl2, check: asus_tusl2 },
    Rule { id: QuirkId::SuperMicroX10sdvNoSmp, check: supermicro_x10sdv },
    Rule { id: QuirkId::K8BStepNoTemp, check: amd_k8_bstep_notemp },
    Rule { id: QuirkId::K8RevFgTemp, check: amd_k8_revfg_temp },
    Rule { id: QuirkId::AmdErrata319, check: amd_k10_errata_319 },
    Rule { id: QuirkId::AdlSmbusUnlock, check: adl_n_smbus_unlock },
];

/// ALi Aladdin V (M1541). Socket 7 boards carry the L2 cache on the
/// motherboard; its size is only visible through chipset registers.
fn ali_aladdin_v(fp: &Fingerprint, _: &mut dyn Platform) -> Option<RuleMatch> {
    if !fp.root_is(vendor::ALI, device::ALI_M1541) {
        return None;
    }
    Some(RuleMatch::deferred(
        QuirkId::AliAladdinV,
        QuirkDomains::MEM_SIZE,
        CorrectiveAction::L2CacheProbe,
    ))
}

/// ASUS TUSL2-C (i815). The ASB100 ASIC muxes the SMBus; SPD is only
/// reachable once the mux is switched. DMI is unreliable on this board, so
/// detection uses the root bridge subsystem IDs.
fn asus_tusl2(fp: &Fingerprint, _: &mut dyn Platform) -> Option<RuleMatch> {
    if !fp.root_is(vendor::INTEL, device::INTEL_I815)
        || fp.root_subsys_vid != vendor::ASUS
        || fp.root_subsys_did != device::ASUS_TUSL2_C
    {
        return None;
    }
    Some(RuleMatch::deferred(
        QuirkId::AsusTusl2,
        QuirkDomains::SMBUS,
        CorrectiveAction::SmbusMuxSelect,
    ))
}

/// SuperMicro X10SDV (Xeon-D). Crashes with SMP enabled and no workaround is
/// known, so multiprocessor start-up is suppressed through the domain flag.
fn supermicro_x10sdv(fp: &Fingerprint, _: &mut dyn Platform) -> Option<RuleMatch> {
    if !fp.root_is(vendor::INTEL, device::INTEL_BROADWELL_DE) || fp.root_subsys_vid != vendor::SUPERMICRO {
        return None;
    }
    Some(RuleMatch {
        id: QuirkId::SuperMicroX10sdvNoSmp,
        domains: QuirkDomains::SMP,
        action: None,
        immediate: None,
    })
}

fn is_amd_k8_family(fp: &Fingerprint, extended_family: u8) -> bool {
    fp.cpu.is_amd_like() && fp.cpu.family == amd::FAMILY_K8 && fp.cpu.extended_family == extended_family
}

/// Early K8: the on-die diode of SH-B0/B3 does not work.
fn amd_k8_bstep_notemp(fp: &Fingerprint, _: &mut dyn Platform) -> Option<RuleMatch> {
    let cpu = &fp.cpu;
    if !is_amd_k8_family(fp, 0) || cpu.extended_model != 0 {
        return None;
    }
    let affected = (cpu.model == 4 && cpu.stepping == 0)  // SH-B0 ClawHammer
        || (cpu.model == 5 && cpu.stepping <= 1); // SH-B0/B3 SledgeHammer
    if !affected {
        return None;
    }
    Some(RuleMatch::deferred(
        QuirkId::K8BStepNoTemp,
        QuirkDomains::TEMP,
        CorrectiveAction::DisableTemperature,
    ))
}

/// Late K8 (rev F/G) may report through the wrong sensor. The sensor switch
/// is applied right away; the deferred action repeats it and adds the rev G
/// desktop offset.
fn amd_k8_revfg_temp(fp: &Fingerprint, _: &mut dyn Platform) -> Option<RuleMatch> {
    let cpu = &fp.cpu;
    if !is_amd_k8_family(fp, 0) || cpu.extended_model < 4 {
        return None;
    }
    Some(RuleMatch {
        id: QuirkId::K8RevFgTemp,
        domains: QuirkDomains::TEMP,
        action: Some(CorrectiveAction::K8RevFgTemperature {
            model: cpu.model,
            extended_model: cpu.extended_model,
            brand_id: cpu.k8_brand_id(),
        }),
        immediate: Some(ImmediateFixup::K8SensorSelect),
    })
}

/// K10 errata #319: inaccurate thermal diode on socket F / AM2+ parts.
/// Affected steppings: DR-BA/B2/B3, RB-C2 and HY-D0. AM3 (DDR3) is exempt.
fn amd_k10_errata_319(fp: &Fingerprint, platform: &mut dyn Platform) -> Option<RuleMatch> {
    let cpu = &fp.cpu;
    if !is_amd_k8_family(fp, 1) || cpu.extended_model != 0 {
        return None;
    }

    let socket_affected = match cpu.package_type() {
        0b0000 => true, // Socket F is DDR2 only, F2x94 is not read
        0b0001 => {
            // AM2+ and AM3 share a package type; F2x94[8] is set on DDR3 (AM3)
            let dct0_high = platform.pci_read32(PciAddress::AMD_DRAM, amd::DCT0_CONFIG_HIGH);
            (dct0_high >> amd::DCT_DDR3_BIT) & 1 == 0
        }
        _ => false,
    };
    if !socket_affected {
        return None;
    }

    let stepping_affected = cpu.model < 4                 // DR-BA, DR-B2, DR-B3
        || (cpu.model == 4 && cpu.stepping <= 2)            // RB-C2
        || cpu.model == 8; // HY-D0
    if !stepping_affected {
        return None;
    }

    Some(RuleMatch::deferred(
        QuirkId::AmdErrata319,
        QuirkDomains::TEMP,
        CorrectiveAction::DisableTemperature,
    ))
}

/// Alder Lake-N firmware may leave the SMBus function with I/O decoding off.
fn adl_n_smbus_unlock(fp: &Fingerprint, platform: &mut dyn Platform) -> Option<RuleMatch> {
    if fp.imc != ImcKind::IntelAdlN {
        return None;
    }
    if platform.pci_read16(PciAddress::INTEL_SMBUS, pci::DEVICE_ID) != device::ADL_N_SMBUS {
        return None;
    }
    Some(RuleMatch::deferred(
        QuirkId::AdlSmbusUnlock,
        QuirkDomains::SMBUS,
        CorrectiveAction::SmbusUnlock,
    ))
}
