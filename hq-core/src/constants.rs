//! Constants for hwquirks
//!
//! Centralizes every vendor ID, register offset and magic value the quirk
//! rules and corrective actions touch. Each value belongs to one specific
//! chipset or erratum; none of them are meant to be generalized.

/// PCI vendor IDs
pub mod vendor {
    pub const ALI: u16 = 0x10B9;
    pub const INTEL: u16 = 0x8086;
    pub const ASUS: u16 = 0x1043;
    pub const SUPERMICRO: u16 = 0x15D9;
}

/// Standard PCI configuration header offsets
pub mod pci {
    pub const VENDOR_ID: u16 = 0x00;
    pub const DEVICE_ID: u16 = 0x02;
    pub const SUBSYSTEM_VENDOR_ID: u16 = 0x2C;
    pub const SUBSYSTEM_DEVICE_ID: u16 = 0x2E;

    /// Value returned by a config read against a device that is not there
    pub const ABSENT_U8: u8 = 0xFF;
    pub const ABSENT_U16: u16 = 0xFFFF;

    /// Extended configuration space per function
    pub const CONFIG_SPACE_SIZE: usize = 0x1000;
}

/// Root bridge device IDs that identify a quirky board
pub mod device {
    /// ALi Aladdin V (M1541)
    pub const ALI_M1541: u16 = 0x1541;
    /// Intel i815
    pub const INTEL_I815: u16 = 0x1130;
    /// Broadwell-DE (Xeon-D)
    pub const INTEL_BROADWELL_DE: u16 = 0x6F00;
    /// ASUS TUSL2-C subsystem device ID
    pub const ASUS_TUSL2_C: u16 = 0x8027;
    /// Alder Lake-N SMBus function device ID
    pub const ADL_N_SMBUS: u16 = 0x54A3;
}

/// ALi M1541 L2 cache control registers (root bridge)
pub mod ali {
    /// L2CC-1: bits [3:2] hold the L2 size code
    pub const L2CC1: u16 = 0x41;
    /// L2CC-2: bit 0 set when the external L2 is enabled
    pub const L2CC2: u16 = 0x42;
    pub const L2_SIZE_SHIFT: u8 = 2;
    pub const L2_SIZE_MASK: u8 = 0x03;
    pub const L2_ENABLED: u8 = 0x01;
}

/// Winbond/ASUS ASB100 Super-I/O access used for the TUSL2-C SMBus mux
pub mod superio {
    /// Index (and mode) port
    pub const INDEX_PORT: u16 = 0x2E;
    /// Data port
    pub const DATA_PORT: u16 = 0x2F;
    /// Written twice to the index port to enter configuration mode
    pub const ENTER_CONFIG: u8 = 0x87;
    /// Written once to the index port to leave configuration mode
    pub const EXIT_CONFIG: u8 = 0xAA;
    /// Logical device select register
    pub const LDN_SELECT: u8 = 0x07;
    /// Logical device holding the mux control
    pub const LDN_MUX: u8 = 0x08;
    /// Mux control register
    pub const MUX_CONTROL: u8 = 0xF1;
    /// Bits [4:3] choose the SMBus channel
    pub const MUX_CHANNEL_MASK: u8 = 0x18;
    pub const MUX_CHANNEL_SPD: u8 = 0x10;
    /// Settle time around configuration mode changes, in microseconds
    pub const SETTLE_US: u64 = 200;
}

/// AMD K8/K10 northbridge registers
pub mod amd {
    /// F3xE4 thermtrip status / temperature control (K8)
    pub const TEMP_REG_K8: u16 = 0xE4;
    /// Bits [23:16] of F3xE4 read zero when the wrong sensor is selected
    pub const TEMP_REPORT_SHIFT: u32 = 16;
    /// F3xE4 bit 2: alternate sensor select
    pub const TEMP_SENSOR_SELECT: u32 = 0x04;
    /// Calibration offset for desktop rev G parts, in degrees Celsius
    pub const REV_G_DESKTOP_OFFSET: f32 = 21.0;
    /// F2x94 DRAM configuration high, DCT0
    pub const DCT0_CONFIG_HIGH: u16 = 0x94;
    /// F2x94 bit 8: DDR3 mode (socket AM3)
    pub const DCT_DDR3_BIT: u32 = 8;
    /// CPUID family shared by K8 and K10 before extended family is applied
    pub const FAMILY_K8: u8 = 0xF;
}

/// Intel PCH SMBus function registers
pub mod intel {
    /// SMBus PCI command register
    pub const SMBUS_COMMAND: u16 = 0x04;
    /// I/O space enable bit
    pub const SMBUS_IO_ENABLE: u16 = 0x0001;
}

/// L2 cache sizes (KiB) indexed by the ALi size code
pub const ALI_L2_SIZES_KIB: [Option<u32>; 4] = [Some(256), Some(512), Some(1024), None];
