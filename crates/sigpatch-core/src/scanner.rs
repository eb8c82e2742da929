//! # Signature Scanner & Patcher
//!
//! Reads a resolved memory region out of the target in one privileged
//! operation, searches the local copy for the signature pattern, and writes
//! the replacement back through the debug write primitive.
//!
//! Reading the whole region once and searching locally keeps the number of
//! privileged cross-process operations to two (one read, one write) and the
//! debug-stop guarantee makes the write atomic with respect to the target's
//! own execution.

use tracing::{debug, info, warn};

use crate::session::DebugControl;
use crate::types::{MemoryRegion, PatchOutcome, ProcessId, Signature};

/// Locate the first occurrence of `needle` in `haystack`
///
/// Contiguous byte equality, no wildcards, no alignment requirement.
/// Returns the offset of the first match, scanning from offset 0 upwards.
pub fn find_pattern(haystack: &[u8], needle: &[u8]) -> Option<usize>
{
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Scan a stopped target's region for the signature and patch it in place
///
/// The control handle is borrowed from the event loop for the duration of
/// this one attempt. The outcome is terminal — no retries:
///
/// - [`PatchOutcome::Applied`] with the absolute patch address on success
/// - [`PatchOutcome::SignatureNotFound`] when the pattern is absent (also
///   the case when the region was already patched)
/// - [`PatchOutcome::WriteFailed`] when the region read or the debug write
///   fails
pub fn scan_and_patch(
    control: &mut dyn DebugControl,
    pid: ProcessId,
    region: &MemoryRegion,
    signature: &Signature,
) -> PatchOutcome
{
    let buffer = match control.read_region(pid, region) {
        Ok(buffer) => buffer,
        Err(err) => {
            warn!(
                "Failed to read {}-{} from process {pid}: {err}",
                region.start, region.end
            );
            return PatchOutcome::WriteFailed;
        }
    };

    let offset = match find_pattern(&buffer, signature.pattern()) {
        Some(offset) => offset,
        None => {
            debug!(
                "Pattern not present in {} bytes at {}",
                buffer.len(),
                region.start
            );
            return PatchOutcome::SignatureNotFound;
        }
    };

    let address = region.start + offset as u64;
    if let Err(err) = control.write_memory(pid, address, signature.replacement()) {
        warn!("Failed to write replacement at {address} in process {pid}: {err}");
        return PatchOutcome::WriteFailed;
    }

    info!("Patched process {pid} at {address} (offset 0x{offset:x})");
    PatchOutcome::Applied(address)
}
