//! # Platform-Specific Debug Control Backends
//!
//! Each platform gets its own submodule implementing the
//! [`DebugControl`](crate::session::DebugControl) trait with that
//! platform's native debug facility:
//!
//! - **Linux**: `ptrace` + `/proc` (implemented)
//!   - See: [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//! - Other platforms would slot in here as additional cfg-gated modules.

#[cfg(target_os = "linux")]
pub mod linux;

use crate::error::Result;
use crate::session::DebugControl;

/// Create the debug control backend for the current platform
///
/// Returns a boxed trait object so the session can own whichever backend
/// the build produced.
///
/// ## Errors
///
/// Returns an attach-class error on platforms without a backend.
pub fn create_control() -> Result<Box<dyn DebugControl>>
{
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::PtraceControl::new()))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(crate::error::PatchError::AttachFailed(format!(
            "Debug control not implemented for platform: {}",
            std::env::consts::OS
        )))
    }
}
