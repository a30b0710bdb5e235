//! Quirk evaluation engine
//!
//! Runs every rule of [`RULES`] exactly once, in table order, and folds the
//! matches into a single [`QuirkRecord`]:
//!
//! - domains are OR-ed together and never cleared,
//! - the identifier and the corrective action are replaced by each match,
//!   so only the last matching rule's action is ever run by the caller,
//! - immediate fix-ups run inline as soon as their rule matches.
//!
//! The listed platforms are disjoint by era and vendor, so in practice at most
//! one rule matches. The overwrite is nevertheless kept exactly as described.

use tracing::{debug, info};

use super::fingerprint::{Fingerprint, ImcKind};
use super::record::QuirkRecord;
use super::rules::{RuleMatch, RULES};
use crate::hw::{CpuSignature, Platform};

/// Evaluate all rules against an already acquired fingerprint
pub fn evaluate(fingerprint: &Fingerprint, platform: &mut dyn Platform) -> QuirkRecord {
    let mut record = QuirkRecord::empty(fingerprint.root_vid, fingerprint.root_did);

    for rule in RULES.iter() {
        let Some(hit) = (rule.check)(fingerprint, platform) else {
            continue;
        };
        debug!(
            quirk = ?hit.id,
            domains = ?hit.domains,
            replaces = ?record.id,
            "Quirk rule matched"
        );
        if let Some(fixup) = hit.immediate {
            fixup.run(platform);
        }
        absorb(&mut record, hit);
    }

    info!(
        quirk = ?record.id,
        domains = ?record.domains,
        action = ?record.action,
        root = format!("{:04x}:{:04x}", record.root_vid, record.root_did),
        "Quirk detection complete"
    );
    record
}

fn absorb(record: &mut QuirkRecord, hit: RuleMatch) {
    record.domains |= hit.domains;
    record.id = hit.id;
    record.action = hit.action;
}

/// Read the fingerprint and evaluate all rules
///
/// This is the single entry point used at start-up, before any other
/// subsystem touches the same registers.
pub fn quirks_init(platform: &mut dyn Platform, cpu: CpuSignature, imc: ImcKind) -> QuirkRecord {
    let fingerprint = Fingerprint::acquire(platform, cpu, imc);
    evaluate(&fingerprint, platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{BusOp, PciAddress, SimulatedPlatform};
    use crate::quirks::actions::{CorrectiveAction, SystemState};
    use crate::quirks::record::{QuirkDomains, QuirkId};

    fn cpu(vendor: &str, family: u8, ext_family: u8, model: u8, ext_model: u8, stepping: u8) -> CpuSignature {
        CpuSignature {
            vendor: vendor.into(),
            family,
            extended_family: ext_family,
            model,
            extended_model: ext_model,
            stepping,
            extended_brand_id: 0,
        }
    }

    fn intel_core() -> CpuSignature {
        cpu("GenuineIntel", 6, 0, 0xE, 0xB, 0)
    }

    fn run(sim: &mut SimulatedPlatform, cpu: CpuSignature, imc: ImcKind) -> QuirkRecord {
        quirks_init(sim, cpu, imc)
    }

    // ------------------------------------------------------------------
    // One fingerprint per rule
    // ------------------------------------------------------------------

    #[test]
    fn test_ali_aladdin_v() {
        let mut sim = SimulatedPlatform::new().with_root_bridge(0x10B9, 0x1541, 0, 0);
        let record = run(&mut sim, cpu("GenuineIntel", 5, 0, 8, 0, 0), ImcKind::Unknown);
        assert_eq!(record.id, QuirkId::AliAladdinV);
        assert_eq!(record.domains, QuirkDomains::MEM_SIZE);
        assert_eq!(record.action, Some(CorrectiveAction::L2CacheProbe));
        assert_eq!((record.root_vid, record.root_did), (0x10B9, 0x1541));
    }

    #[test]
    fn test_asus_tusl2() {
        let mut sim = SimulatedPlatform::new().with_root_bridge(0x8086, 0x1130, 0x1043, 0x8027);
        let record = run(&mut sim, cpu("GenuineIntel", 6, 0, 0xB, 0, 1), ImcKind::Unknown);
        assert_eq!(record.id, QuirkId::AsusTusl2);
        assert_eq!(record.domains, QuirkDomains::SMBUS);
        assert_eq!(record.action, Some(CorrectiveAction::SmbusMuxSelect));
    }

    #[test]
    fn test_supermicro_x10sdv_has_no_action() {
        let mut sim = SimulatedPlatform::new().with_root_bridge(0x8086, 0x6F00, 0x15D9, 0x0859);
        let record = run(&mut sim, cpu("GenuineIntel", 6, 0, 6, 5, 3), ImcKind::Unknown);
        assert_eq!(record.id, QuirkId::SuperMicroX10sdvNoSmp);
        assert_eq!(record.domains, QuirkDomains::SMP);
        assert_eq!(record.action, None);
        assert!(!record.smp_allowed());

        let mut state = SystemState::default();
        assert!(!record.process(&mut sim, &mut state));
    }

    #[test]
    fn test_k8_bstep() {
        let mut sim = SimulatedPlatform::new();
        let record = run(&mut sim, cpu("AuthenticAMD", 0xF, 0, 4, 0, 0), ImcKind::AmdK8);
        assert_eq!(record.id, QuirkId::K8BStepNoTemp);
        assert_eq!(record.domains, QuirkDomains::TEMP);
        assert_eq!(record.action, Some(CorrectiveAction::DisableTemperature));
    }

    #[test]
    fn test_k8_revfg_runs_sensor_select_inline() {
        let mut sim = SimulatedPlatform::new().with_pci32(PciAddress::AMD_MISC, 0xE4, 0x0000_0000);
        let record = run(&mut sim, cpu("AuthenticAMD", 0xF, 0, 0xB, 6, 2), ImcKind::AmdK8);
        assert_eq!(record.id, QuirkId::K8RevFgTemp);
        assert_eq!(record.domains, QuirkDomains::TEMP);
        assert_eq!(
            record.action,
            Some(CorrectiveAction::K8RevFgTemperature { model: 0xB, extended_model: 6, brand_id: 0 })
        );
        // Sensor select already happened during evaluation
        assert_eq!(sim.peek8(PciAddress::AMD_MISC, 0xE4), 0x04);
    }

    #[test]
    fn test_amd_errata_319() {
        let mut sim = SimulatedPlatform::new();
        let record = run(&mut sim, cpu("AuthenticAMD", 0xF, 1, 2, 0, 3), ImcKind::AmdK10);
        assert_eq!(record.id, QuirkId::AmdErrata319);
        assert_eq!(record.domains, QuirkDomains::TEMP);
        assert_eq!(record.action, Some(CorrectiveAction::DisableTemperature));
    }

    #[test]
    fn test_adl_n_smbus_unlock() {
        let mut sim = SimulatedPlatform::new()
            .with_root_bridge(0x8086, 0x461C, 0x8086, 0x7270)
            .with_pci16(PciAddress::INTEL_SMBUS, 0x02, 0x54A3);
        let record = run(&mut sim, intel_core(), ImcKind::IntelAdlN);
        assert_eq!(record.id, QuirkId::AdlSmbusUnlock);
        assert_eq!(record.domains, QuirkDomains::SMBUS);
        assert_eq!(record.action, Some(CorrectiveAction::SmbusUnlock));
    }

    // ------------------------------------------------------------------
    // Accumulation policy
    // ------------------------------------------------------------------

    #[test]
    fn test_no_match_is_empty() {
        let mut sim = SimulatedPlatform::new().with_root_bridge(0x8086, 0x3E0F, 0x1462, 0x7B45);
        let record = run(&mut sim, intel_core(), ImcKind::IntelAdl);
        assert_eq!(record.id, QuirkId::None);
        assert!(record.domains.is_empty());
        assert_eq!(record.action, None);
        assert!(record.is_empty());
        // Nothing but the four root bridge identity reads
        assert_eq!(sim.ops().len(), 4);
        assert_eq!(sim.writes().count(), 0);
    }

    #[test]
    fn test_absent_root_bridge_matches_nothing() {
        let mut sim = SimulatedPlatform::new();
        let record = run(&mut sim, CpuSignature::default(), ImcKind::Unknown);
        assert!(record.is_empty());
        assert_eq!((record.root_vid, record.root_did), (0xFFFF, 0xFFFF));
    }

    #[test]
    fn test_two_matches_union_domains_last_action_wins() {
        // ALi root bridge combined with an early K8 signature
        let mut sim = SimulatedPlatform::new().with_root_bridge(0x10B9, 0x1541, 0, 0);
        let record = run(&mut sim, cpu("AuthenticAMD", 0xF, 0, 5, 0, 1), ImcKind::Unknown);

        assert_eq!(record.domains, QuirkDomains::MEM_SIZE | QuirkDomains::TEMP);
        assert_eq!(record.id, QuirkId::K8BStepNoTemp);
        assert_eq!(record.action, Some(CorrectiveAction::DisableTemperature));
    }

    #[test]
    fn test_dropped_action_still_reports_domains() {
        // X10SDV leaves no action; a later ADL-N match supplies one. SMP must
        // still be reported even though only the SMBus action survives.
        let mut sim = SimulatedPlatform::new()
            .with_root_bridge(0x8086, 0x6F00, 0x15D9, 0x0859)
            .with_pci16(PciAddress::INTEL_SMBUS, 0x02, 0x54A3)
            .with_pci16(PciAddress::INTEL_SMBUS, 0x04, 0x0000);
        let record = run(&mut sim, intel_core(), ImcKind::IntelAdlN);

        assert_eq!(record.domains, QuirkDomains::SMP | QuirkDomains::SMBUS);
        assert_eq!(record.id, QuirkId::AdlSmbusUnlock);
        assert_eq!(record.action, Some(CorrectiveAction::SmbusUnlock));
        assert!(!record.smp_allowed());

        let mut state = SystemState::default();
        assert!(record.process(&mut sim, &mut state));
        assert_eq!(sim.peek16(PciAddress::INTEL_SMBUS, 0x04), 0x0001);
    }

    #[test]
    fn test_later_match_replaces_earlier_action() {
        // ALi root bridge with a K8 rev F CPU: the L2 probe is superseded
        let fp = Fingerprint {
            root_vid: 0x10B9,
            root_did: 0x1541,
            cpu: cpu("AuthenticAMD", 0xF, 0, 0xF, 4, 2),
            ..Default::default()
        };
        let mut sim = SimulatedPlatform::new().with_pci32(PciAddress::AMD_MISC, 0xE4, 0x0011_0000);
        let record = evaluate(&fp, &mut sim);

        assert_eq!(record.id, QuirkId::K8RevFgTemp);
        assert_eq!(record.domains, QuirkDomains::MEM_SIZE | QuirkDomains::TEMP);
        assert!(matches!(record.action, Some(CorrectiveAction::K8RevFgTemperature { .. })));
        // Sensor already reporting: the inline fix-up only read the register
        assert_eq!(
            sim.ops(),
            &[BusOp::PciRead { addr: PciAddress::AMD_MISC, offset: 0xE4, width: 4, value: 0x0011_0000 }]
        );
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let fp = Fingerprint {
            root_vid: 0x8086,
            root_did: 0x1130,
            root_subsys_vid: 0x1043,
            root_subsys_did: 0x8027,
            ..Default::default()
        };
        let mut sim = SimulatedPlatform::new();
        let first = evaluate(&fp, &mut sim);
        let second = evaluate(&fp, &mut sim);
        assert_eq!(first, second);
        assert!(sim.ops().is_empty());
    }
}
