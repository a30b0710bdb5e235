//! CPU identification fields consumed by the quirk rules
//!
//! Only the handful of fields the rules look at are kept. They are decoded
//! from raw CPUID registers so that a signature can come from the running
//! CPU, from a fixture file or be written out literally in a test.

use serde::{Deserialize, Serialize};

/// Decoded CPU identification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpuSignature {
    /// Vendor string from leaf 0 (e.g. "AuthenticAMD")
    pub vendor: String,
    /// Base family, leaf 1 EAX[11:8]
    pub family: u8,
    /// Extended family, leaf 1 EAX[27:20]
    pub extended_family: u8,
    /// Base model, leaf 1 EAX[7:4]
    pub model: u8,
    /// Extended model, leaf 1 EAX[19:16]
    pub extended_model: u8,
    /// Stepping, leaf 1 EAX[3:0]
    pub stepping: u8,
    /// Raw EBX of leaf 0x8000_0001 (brand ID and package type on AMD)
    #[serde(default)]
    pub extended_brand_id: u32,
}

impl CpuSignature {
    /// Decode leaf 0 vendor bytes, leaf 1 EAX and leaf 0x8000_0001 EBX
    pub fn decode(vendor: [u8; 12], leaf1_eax: u32, ext_leaf1_ebx: u32) -> Self {
        Self {
            vendor: String::from_utf8_lossy(&vendor)
                .trim_end_matches('\0')
                .to_string(),
            stepping: (leaf1_eax & 0xF) as u8,
            model: ((leaf1_eax >> 4) & 0xF) as u8,
            family: ((leaf1_eax >> 8) & 0xF) as u8,
            extended_model: ((leaf1_eax >> 16) & 0xF) as u8,
            extended_family: ((leaf1_eax >> 20) & 0xFF) as u8,
            extended_brand_id: ext_leaf1_ebx,
        }
    }

    /// First character of the vendor string, if any
    pub fn vendor_initial(&self) -> Option<char> {
        self.vendor.chars().next()
    }

    /// True for "AuthenticAMD" (and anything else starting with 'A')
    pub fn is_amd_like(&self) -> bool {
        self.vendor_initial() == Some('A')
    }

    /// K8 brand ID, EBX[13:9] of leaf 0x8000_0001
    pub fn k8_brand_id(&self) -> u8 {
        ((self.extended_brand_id >> 9) & 0x1F) as u8
    }

    /// K10 package type, EBX[31:28] of leaf 0x8000_0001
    pub fn package_type(&self) -> u8 {
        ((self.extended_brand_id >> 28) & 0x0F) as u8
    }
}
