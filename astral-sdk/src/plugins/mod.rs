//! Plugins shipped with the SDK.
//!
//! Proof-system plugins (device attestation, infrastructure witnesses) are
//! published separately; this module only carries the proof-system-agnostic
//! signed-fix plugin used by the command-line tool and in examples.

mod signed_fix;

pub use signed_fix::{SignedFixConfig, SignedFixPlugin};
