//! # Process Locator
//!
//! Finds the target process by scanning the live process table, retrying
//! under a bounded timeout.
//!
//! The process table itself sits behind the [`ProcessTable`] trait so the
//! retry logic can be exercised against a scripted table in tests; the real
//! implementation walks the numeric entries of `/proc`.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{PatchError, Result};
use crate::types::{ProcessId, ProcessRecord};

/// Read-only view of the live process table
///
/// One call produces one snapshot. Entries that cannot be read (the process
/// exited mid-scan, permission denied, malformed data) are skipped inside
/// the implementation, never surfaced as errors.
pub trait ProcessTable
{
    /// Take one snapshot of `{pid, command name}` for all visible processes.
    fn snapshot(&self) -> Vec<ProcessRecord>;
}

/// `/proc`-backed process table
///
/// Enumerates the numeric directories under the proc root and reads each
/// entry's `comm` file. The root is configurable so tests can point it at a
/// fabricated directory tree.
pub struct ProcFs
{
    root: PathBuf,
}

impl ProcFs
{
    /// Process table rooted at the system `/proc`
    pub fn new() -> Self
    {
        Self::with_root("/proc")
    }

    /// Process table rooted at an arbitrary directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self
    {
        Self { root: root.into() }
    }
}

impl Default for ProcFs
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl ProcessTable for ProcFs
{
    fn snapshot(&self) -> Vec<ProcessRecord>
    {
        let mut records = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Failed to read process table root: {err}");
                return records;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let pid = match name.to_str().and_then(ProcessId::from_proc_entry) {
                Some(pid) => pid,
                None => continue, // not a process directory
            };
            // Race: the process may exit between readdir and this read
            let raw = match fs::read_to_string(entry.path().join("comm")) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            let comm = raw.strip_suffix('\n').unwrap_or(&raw);
            if let Ok(record) = ProcessRecord::new(pid, comm) {
                records.push(record);
            }
        }
        records
    }
}

/// Find a process by exact command name, retrying up to `max_attempts` scans
///
/// Scans one snapshot per attempt and returns the first record whose command
/// name equals `name` (enumeration order decides ties between same-named
/// processes). Sleeps `retry_interval` between scans; there is no sleep
/// after the final failed scan.
///
/// ## Errors
///
/// Returns [`PatchError::DiscoveryTimeout`] once `max_attempts` scans have
/// all come up empty.
pub fn find_by_name(
    table: &dyn ProcessTable,
    name: &str,
    max_attempts: u32,
    retry_interval: Duration,
) -> Result<ProcessId>
{
    for attempt in 1..=max_attempts {
        if let Some(record) = table.snapshot().into_iter().find(|record| record.comm == name) {
            info!("Found process {:?} with PID {}", name, record.pid);
            return Ok(record.pid);
        }
        debug!("Scan {attempt}/{max_attempts}: no process named {name:?}");
        if attempt < max_attempts {
            thread::sleep(retry_interval);
        }
    }
    Err(PatchError::DiscoveryTimeout {
        name: name.to_string(),
        attempts: max_attempts,
    })
}
