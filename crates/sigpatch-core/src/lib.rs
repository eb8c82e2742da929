//! # sigpatch-core
//!
//! Process discovery, debug attach, and signature patching primitives.
//!
//! This crate implements the instrumentation pipeline behind the `sigpatch`
//! binary:
//!
//! - Locate a running process by executable name, retrying under a bounded
//!   timeout ([`locator`])
//! - Attach to it with the platform debug facility and service stop/exit
//!   notifications for it and, optionally, its descendants ([`session`])
//! - Resolve the mapped base and extent of a named module ([`maps`])
//! - Find a byte signature in that region and overwrite it in place,
//!   exactly once per session ([`scanner`])
//!
//! The stages compose in [`engine`] as a pipeline of typed results;
//! failures short-circuit with the phase that produced them.
//!
//! ## Concurrency model
//!
//! Single-threaded cooperative blocking. The supervising thread sleeps in
//! the platform wait primitive between events and performs all
//! resolution/patch work synchronously; there is no internal parallelism
//! and no polling.
//!
//! ## Platform Support
//!
//! - **Linux**: `ptrace` + `/proc` (see [`platform::linux`])

pub mod engine;
pub mod error;
pub mod locator;
pub mod maps;
pub mod platform;
pub mod scanner;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use engine::PatchRequest;
pub use error::{PatchError, Result};
pub use session::{DebugControl, DebugSession, TraceEvent};
pub use types::{Address, MemoryRegion, PatchOutcome, ProcessId, Signature};
