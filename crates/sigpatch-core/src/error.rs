//! # Error Types
//!
//! General error handling for the patch engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::ProcessId;

/// Main error type for patch engine operations
///
/// Every fatal condition in the pipeline maps to one variant here, so the
/// operator-facing message always names the phase that failed.
///
/// ## Error Categories
///
/// 1. **Discovery errors**: DiscoveryTimeout
/// 2. **Session errors**: AttachFailed
/// 3. **Resolution errors**: MappingNotFound
/// 4. **Patch errors**: SignatureNotFound, MemoryIo
/// 5. **Validation errors**: InvalidSignature, InvalidProcessId, CommandNameTooLong
/// 6. **Platform errors**: Ptrace (Linux-specific)
/// 7. **I/O errors**: Io (for file operations, etc.)
#[derive(Error, Debug)]
pub enum PatchError
{
    /// The process table never produced a matching entry
    ///
    /// Raised after the locator has scanned the process table `attempts`
    /// times without finding a process whose command name matches. The
    /// target application may not have started yet, or may run under a
    /// different executable name.
    #[error("No process named {name:?} found after {attempts} scan attempts")]
    DiscoveryTimeout
    {
        /// The command name that was searched for
        name: String,
        /// Number of full process table scans performed
        attempts: u32,
    },

    /// Failed to attach to the target process
    ///
    /// Attaching requires the caller to be privileged or to satisfy the
    /// kernel's ptrace scope policy (`/proc/sys/kernel/yama/ptrace_scope`).
    /// The string carries the underlying cause.
    #[error("Failed to attach to process: {0}")]
    AttachFailed(String),

    /// No mapped region matching the module name was found
    ///
    /// Either the module is not (yet) loaded into the target, the mapping
    /// listing could not be opened, or every matching line was malformed.
    #[error("No mapping for module {module:?} in process {pid}")]
    MappingNotFound
    {
        /// The process whose mapping listing was searched
        pid: ProcessId,
        /// The module substring that did not match
        module: String,
    },

    /// The byte pattern was not present in the resolved region
    ///
    /// Also raised when the module was already patched in a previous
    /// session: the replacement bytes do not match the pattern, so a second
    /// run reports this instead of re-patching.
    #[error("Signature not found in module {module:?}")]
    SignatureNotFound
    {
        /// The module that was scanned
        module: String,
    },

    /// Reading from or writing to the target's memory failed
    ///
    /// Covers short reads of the mapped region as well as failed debug
    /// writes. Reported once; the patch is never retried.
    #[error("Memory access failed: {0}")]
    MemoryIo(String),

    /// A signature violated its construction invariants
    ///
    /// Pattern and replacement must be non-empty, well-formed hex, and of
    /// equal length.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A value outside the platform's PID range was used as a process id
    #[error("Invalid process id: {0}")]
    InvalidProcessId(i64),

    /// A command name exceeded the accepted maximum length
    #[error("Command name of {0} bytes exceeds the maximum")]
    CommandNameTooLong(usize),

    /// Linux-specific ptrace error
    ///
    /// Wraps errno values reported by the ptrace and wait syscalls. Common
    /// cases: `ESRCH` (tracked process vanished), `EPERM` (ptrace scope
    /// restrictions), `ECHILD` (nothing left to wait for — handled by the
    /// event loop, not surfaced).
    #[cfg(target_os = "linux")]
    #[error("ptrace operation failed: {0}")]
    Ptrace(#[from] nix::Error),

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, PatchError>`
///
/// ```rust
/// use sigpatch_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, PatchError>;
