//! hwquirks core library
//!
//! Detects hardware configurations that need special handling before a
//! bare-metal memory diagnostic starts, and carries the register-level fixes
//! for them.
//!
//! # Module Structure
//!
//! - `hw/` - register access trait, CPU identification, simulated platform
//! - `quirks/` - fingerprint, rule table, engine, record, corrective actions
//! - `constants` - vendor IDs, register offsets and magic values
//!
//! # Example
//!
//! ```
//! use hq_core::hw::{CpuSignature, SimulatedPlatform};
//! use hq_core::quirks::{quirks_init, ImcKind, QuirkDomains, QuirkId, SystemState};
//!
//! let mut platform = SimulatedPlatform::new().with_root_bridge(0x8086, 0x6F00, 0x15D9, 0x0859);
//! let record = quirks_init(&mut platform, CpuSignature::default(), ImcKind::Unknown);
//!
//! assert_eq!(record.id, QuirkId::SuperMicroX10sdvNoSmp);
//! assert!(record.affects(QuirkDomains::SMP));
//!
//! let mut state = SystemState::default();
//! assert!(!record.process(&mut platform, &mut state));
//! ```

pub mod constants;
pub mod hw;
pub mod quirks;

pub use hw::{CpuSignature, PciAddress, Platform, PlatformFixture, SimulatedPlatform};
pub use quirks::{
    evaluate, quirks_init, CorrectiveAction, Fingerprint, ImcKind, QuirkDomains, QuirkId,
    QuirkRecord, SystemState,
};

pub use hq_error::{QuirkError, Result};
