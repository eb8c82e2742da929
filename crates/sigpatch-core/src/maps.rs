//! # Memory Map Resolver
//!
//! Resolves the mapped base address and extent of a named module inside a
//! target process by parsing its mapping listing (`/proc/<pid>/maps`).
//!
//! A module usually appears as several mapped segments (text, rodata, data).
//! Only the first matching line is used; for an ELF shared object that is
//! the segment containing the code the signatures point into.

use std::fs::File;
use std::io::{BufRead, BufReader};

use tracing::debug;

use crate::error::{PatchError, Result};
use crate::types::{Address, MemoryRegion, ProcessId};

/// Resolve the first mapped region whose listing line mentions `module`
///
/// ## Errors
///
/// Returns [`PatchError::MappingNotFound`] when the listing cannot be opened
/// (process exited, permission denied) or contains no parseable line whose
/// text includes `module` as a substring.
pub fn resolve_module(pid: ProcessId, module: &str) -> Result<MemoryRegion>
{
    let path = format!("/proc/{pid}/maps");
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            debug!("Failed to open {path}: {err}");
            return Err(PatchError::MappingNotFound {
                pid,
                module: module.to_string(),
            });
        }
    };
    resolve_module_in(BufReader::new(file), pid, module)
}

/// Resolve a module against any line-oriented mapping listing
///
/// Separated from [`resolve_module`] so listings can be fed in as strings.
/// Unreadable and malformed lines are skipped, not treated as fatal.
pub fn resolve_module_in<R: BufRead>(reader: R, pid: ProcessId, module: &str) -> Result<MemoryRegion>
{
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => continue,
        };
        if !line.contains(module) {
            continue;
        }
        if let Some(region) = parse_maps_line(&line) {
            debug!(
                "Resolved module {module:?} in process {pid}: {}-{} {}",
                region.start, region.end, region.permissions
            );
            return Ok(region);
        }
        debug!("Skipping malformed mapping line: {line:?}");
    }
    Err(PatchError::MappingNotFound {
        pid,
        module: module.to_string(),
    })
}

/// Parse one mapping listing line into a region
///
/// Expected shape: `start-end perms offset dev inode [label]`, addresses in
/// hex. Returns `None` for anything that does not parse or violates the
/// `start < end` invariant.
fn parse_maps_line(line: &str) -> Option<MemoryRegion>
{
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let permissions = fields.next()?.to_string();

    let (start_text, end_text) = range.split_once('-')?;
    let start = u64::from_str_radix(start_text, 16).ok()?;
    let end = u64::from_str_radix(end_text, 16).ok()?;
    if start >= end {
        return None;
    }

    // offset, device, inode are not used
    let name = fields.nth(3).map(ToString::to_string);

    Some(MemoryRegion::new(
        Address::from(start),
        Address::from(end),
        permissions,
        name,
    ))
}
