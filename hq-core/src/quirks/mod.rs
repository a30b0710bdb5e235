//! Hardware quirk detection
//!
//! - `fingerprint` - identifying values read before evaluation
//! - `rules` - the ordered table of quirk predicates
//! - `engine` - evaluation and the accumulation/overwrite policy
//! - `record` - the detection result handed to the rest of the program
//! - `actions` - corrective actions and the state they adjust

pub mod actions;
pub mod engine;
pub mod fingerprint;
pub mod record;
pub mod rules;

pub use actions::{CorrectiveAction, SystemState};
pub use engine::{evaluate, quirks_init};
pub use fingerprint::{Fingerprint, ImcKind};
pub use record::{QuirkDomains, QuirkId, QuirkRecord};
pub use rules::{ImmediateFixup, Rule, RuleMatch, RULES};
