//! Corrective actions
//!
//! Each variant is a one-shot fix for one concrete platform. Actions never
//! report failure: a read from absent hardware comes back as all-ones, fails
//! the following bit test and no write is issued.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{ali, amd, intel, superio, ALI_L2_SIZES_KIB};
use crate::hw::{PciAddress, Platform};

/// State owned by other diagnostic subsystems that actions may adjust
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// External L2 cache size in KiB, 0 while unknown
    pub l2_cache_kib: u32,
    /// Whether CPU temperature is reported at all
    pub enable_temperature: bool,
    /// Added to every CPU temperature reading, in degrees Celsius
    pub cpu_temp_offset: f32,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            l2_cache_kib: 0,
            enable_temperature: true,
            cpu_temp_offset: 0.0,
        }
    }
}

/// Deferred fix attached to a matched quirk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectiveAction {
    /// Size the ALi M1541 external L2 cache from chipset registers
    L2CacheProbe,
    /// Route the ASB100 SMBus mux to the SPD channel
    SmbusMuxSelect,
    /// Turn temperature reporting off
    DisableTemperature,
    /// Select the working K8 rev F/G sensor and apply the rev G desktop offset
    K8RevFgTemperature {
        model: u8,
        extended_model: u8,
        brand_id: u8,
    },
    /// Enable I/O decoding on the PCH SMBus function
    SmbusUnlock,
}

impl CorrectiveAction {
    pub fn apply(&self, platform: &mut dyn Platform, state: &mut SystemState) {
        debug!(action = ?self, "Applying corrective action");
        match *self {
            Self::L2CacheProbe => probe_ali_l2_cache(platform, state),
            Self::SmbusMuxSelect => select_tusl2_smbus_mux(platform),
            Self::DisableTemperature => disable_temperature(state),
            Self::K8RevFgTemperature { model, extended_model, brand_id } => {
                k8_select_temp_sensor(platform);
                if k8_needs_desktop_offset(model, extended_model, brand_id) {
                    state.cpu_temp_offset = amd::REV_G_DESKTOP_OFFSET;
                    info!(offset = state.cpu_temp_offset, "K8 rev G desktop temperature offset applied");
                }
            }
            Self::SmbusUnlock => unlock_pch_smbus(platform),
        }
    }
}

fn probe_ali_l2_cache(platform: &mut dyn Platform, state: &mut SystemState) {
    if state.l2_cache_kib != 0 {
        return;
    }

    let root = PciAddress::ROOT_BRIDGE;
    if platform.pci_read8(root, ali::L2CC2) & ali::L2_ENABLED == 0 {
        debug!("ALi L2 cache disabled");
        return;
    }

    let code = (platform.pci_read8(root, ali::L2CC1) >> ali::L2_SIZE_SHIFT) & ali::L2_SIZE_MASK;
    if let Some(kib) = ALI_L2_SIZES_KIB[usize::from(code)] {
        state.l2_cache_kib = kib;
        info!(kib, "ALi L2 cache size detected");
    }
}

/// The two settle delays are required: the ASB100 does not latch the mode
/// change immediately.
fn select_tusl2_smbus_mux(platform: &mut dyn Platform) {
    platform.outb(superio::INDEX_PORT, superio::ENTER_CONFIG);
    platform.outb(superio::INDEX_PORT, superio::ENTER_CONFIG);
    platform.usleep(superio::SETTLE_US);

    platform.lpc_outb(superio::LDN_SELECT, superio::LDN_MUX);

    let mut mux = platform.lpc_inb(superio::MUX_CONTROL);
    mux &= !superio::MUX_CHANNEL_MASK;
    mux |= superio::MUX_CHANNEL_SPD;
    platform.lpc_outb(superio::MUX_CONTROL, mux);
    platform.usleep(superio::SETTLE_US);

    platform.outb(superio::INDEX_PORT, superio::EXIT_CONFIG);
}

fn disable_temperature(state: &mut SystemState) {
    state.enable_temperature = false;
    info!("CPU temperature reporting disabled");
}

/// Switch to the alternate sensor when F3xE4[23:16] reports nothing
pub(crate) fn k8_select_temp_sensor(platform: &mut dyn Platform) {
    let reg = platform.pci_read32(PciAddress::AMD_MISC, amd::TEMP_REG_K8);
    if (reg >> amd::TEMP_REPORT_SHIFT) & 0xFF == 0 {
        platform.pci_write8(
            PciAddress::AMD_MISC,
            amd::TEMP_REG_K8,
            (reg | amd::TEMP_SENSOR_SELECT) as u8,
        );
    }
}

/// Desktop rev G (extended model 6..=8) reads 21 degrees low. Mobile single
/// core (model 0xF, brand 7/9/C) and mobile dual core (model 0xB, brand > B)
/// parts are exempt.
fn k8_needs_desktop_offset(model: u8, extended_model: u8, brand_id: u8) -> bool {
    if !(6..9).contains(&extended_model) {
        return false;
    }
    if model == 0xF && matches!(brand_id, 0x7 | 0x9 | 0xC) {
        return false;
    }
    if model == 0xB && brand_id > 0xB {
        return false;
    }
    true
}

fn unlock_pch_smbus(platform: &mut dyn Platform) {
    let cmd = platform.pci_read16(PciAddress::INTEL_SMBUS, intel::SMBUS_COMMAND);
    if cmd & intel::SMBUS_IO_ENABLE == 0 {
        platform.pci_write16(
            PciAddress::INTEL_SMBUS,
            intel::SMBUS_COMMAND,
            cmd | intel::SMBUS_IO_ENABLE,
        );
        info!("PCH SMBus I/O decoding enabled");
    }
}
