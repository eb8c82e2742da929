//! Process and memory region types.

use std::fmt;

use super::Address;
use crate::error::{PatchError, Result};

/// Longest command name accepted in a [`ProcessRecord`].
///
/// The kernel itself truncates `comm` to 15 bytes; this cap only applies to
/// records built from other sources.
pub const MAX_COMM_LEN: usize = 64;

/// Process identifier (PID)
///
/// A PID is a unique number assigned to each running process by the
/// operating system. On Linux, PIDs are positive 32-bit integers.
///
/// ## Why wrap it in a struct?
///
/// Using a newtype pattern (`struct ProcessId(i32)`) instead of a raw `i32`
/// provides:
/// - **Type safety**: Prevents accidentally passing a random number where a PID is expected
/// - **Validation**: The constructor rejects zero, negative, and out-of-range values
///
/// ## Example
///
/// ```rust
/// use sigpatch_core::types::ProcessId;
///
/// let pid = ProcessId::new(12345)?;
/// assert_eq!(pid.raw(), 12345);
/// assert!(ProcessId::new(0).is_err());
/// assert!(ProcessId::new(-1).is_err());
/// # Ok::<(), sigpatch_core::error::PatchError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(i32);

impl ProcessId
{
    /// Create a validated process id
    ///
    /// Accepts an `i64` so values read from ptrace event payloads (which
    /// arrive as a C `long`) can be validated without a lossy cast first.
    ///
    /// ## Errors
    ///
    /// Returns [`PatchError::InvalidProcessId`] if the value is not strictly
    /// positive or does not fit the platform's PID range.
    pub fn new(raw: i64) -> Result<Self>
    {
        match i32::try_from(raw) {
            Ok(value) if value >= 1 => Ok(ProcessId(value)),
            _ => Err(PatchError::InvalidProcessId(raw)),
        }
    }

    /// Parse a `/proc` directory entry name as a process id
    ///
    /// Non-numeric entries (`self`, `sys`, `net`, ...) and out-of-range
    /// values return `None`.
    pub fn from_proc_entry(name: &str) -> Option<Self>
    {
        name.parse::<i64>().ok().and_then(|raw| Self::new(raw).ok())
    }

    /// Get the raw PID value
    pub const fn raw(self) -> i32
    {
        self.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// One row of the process table: `{pid, command name}`
///
/// Produced transiently while scanning for the target process; never
/// persisted. The command name is the short executable name the kernel
/// reports in `/proc/<pid>/comm`, with the trailing newline already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord
{
    /// Process id of this entry.
    pub pid: ProcessId,
    /// Short command name, at most [`MAX_COMM_LEN`] bytes.
    pub comm: String,
}

impl ProcessRecord
{
    /// Create a record, validating the command name length
    ///
    /// ## Errors
    ///
    /// Returns [`PatchError::CommandNameTooLong`] when `comm` exceeds
    /// [`MAX_COMM_LEN`]. Over-long names are rejected, never truncated.
    pub fn new(pid: ProcessId, comm: &str) -> Result<Self>
    {
        if comm.len() > MAX_COMM_LEN {
            return Err(PatchError::CommandNameTooLong(comm.len()));
        }
        Ok(Self {
            pid,
            comm: comm.to_string(),
        })
    }
}

/// Memory region in a process
///
/// Represents one contiguous mapped range of the target process's virtual
/// address space, derived from a single line of its mapping listing.
///
/// ## Examples
///
/// ```
/// use sigpatch_core::types::{Address, MemoryRegion};
///
/// // The executable segment of a loaded shared object
/// let text = MemoryRegion::new(
///     Address::from(0xf320_0000),
///     Address::from(0xf3c0_0000),
///     "r-xp".to_string(),
///     Some("/opt/game/bin/engine.so".to_string()),
/// );
/// assert_eq!(text.size(), 0xa0_0000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion
{
    /// Start address of the memory region (inclusive)
    pub start: Address,

    /// End address of the memory region (exclusive)
    ///
    /// The region covers addresses from `start` (inclusive) to `end`
    /// (exclusive); its size is `end - start`.
    pub end: Address,

    /// Memory permissions as reported by the mapping listing
    ///
    /// Examples: `"r-xp"` (read, execute, private), `"rw-p"` (read, write,
    /// private).
    pub permissions: String,

    /// Optional backing label of the region
    ///
    /// A file path like `"/usr/lib/libc.so.6"`, or a pseudo-label such as
    /// `"[heap]"` or `"[stack]"`. Anonymous mappings have no label.
    pub name: Option<String>,
}

impl MemoryRegion
{
    /// Create a new memory region
    ///
    /// The mapping parser only produces regions with `start < end`; this
    /// constructor does not re-validate, and `size()` returns 0 for a
    /// degenerate range.
    pub fn new(start: Address, end: Address, permissions: String, name: Option<String>) -> Self
    {
        Self {
            start,
            end,
            permissions,
            name,
        }
    }

    /// Get the size of the memory region in bytes
    ///
    /// Returns `end - start`, or 0 if `end <= start` (using saturating
    /// subtraction to prevent underflow).
    pub fn size(&self) -> u64
    {
        self.end.value().saturating_sub(self.start.value())
    }

    /// Check if an address lies within this memory region
    ///
    /// ## Example
    ///
    /// ```rust
    /// use sigpatch_core::types::{Address, MemoryRegion};
    ///
    /// let region = MemoryRegion::new(
    ///     Address::from(0x1000),
    ///     Address::from(0x2000),
    ///     "r-xp".to_string(),
    ///     None,
    /// );
    ///
    /// assert!(region.contains(Address::from(0x1000))); // Start (inclusive)
    /// assert!(!region.contains(Address::from(0x2000))); // End (exclusive)
    /// ```
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }
}
