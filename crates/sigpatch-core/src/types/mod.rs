//! # Types
//!
//! Platform-agnostic types used throughout the patch engine.
//!
//! These types abstract away the Linux specifics, so the locator, resolver,
//! scanner, and session logic work with concepts like "process ID" and
//! "memory region" without touching `/proc` or `ptrace` directly.

pub mod address;
pub mod process;
pub mod signature;

// Re-export all public types
pub use address::Address;
pub use process::{MemoryRegion, ProcessId, ProcessRecord};
pub use signature::{PatchOutcome, Signature};
