//! Hardware access modules
//!
//! Register access abstraction, CPU identification and the simulated platform
//! used to replay captured machines.

pub mod cpuid;
pub mod platform;
pub mod sim;

pub use cpuid::CpuSignature;
pub use platform::{PciAddress, Platform};
pub use sim::{capture_fixture, BusOp, PciRegion, PlatformFixture, SimulatedPlatform, SuperIoRegister};

#[cfg(test)]
pub use platform::MockPlatform;
