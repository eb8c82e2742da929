//! # Linux Debug Control
//!
//! Linux backend built on `ptrace(2)` and the `/proc` filesystem.
//!
//! ## Division of labor
//!
//! - **ptrace**: attach, continue, trace options, event payloads, and the
//!   word-granular replacement write (`PTRACE_POKEDATA`)
//! - **waitpid**: the blocking wait for stop/exit notifications of any
//!   tracee
//! - **`/proc/<pid>/mem`**: bulk region reads — one positioned read
//!   instead of thousands of `PTRACE_PEEKDATA` round trips
//!
//! ## References
//!
//! - [ptrace(2) man page](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//! - [proc(5) man page](https://man7.org/linux/man-pages/man5/proc.5.html)

use std::fs::File;
use std::os::unix::fs::FileExt;

use libc::c_long;
use nix::errno::Errno;
use nix::sys::ptrace::{self, Event, Options};
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, trace};

use crate::error::{PatchError, Result};
use crate::session::{DebugControl, TraceEvent};
use crate::types::{Address, MemoryRegion, ProcessId};

const WORD_SIZE: usize = std::mem::size_of::<c_long>();

/// Debug control backend over `ptrace`
///
/// Stateless by itself: all session state (tracked pids, outstanding count)
/// lives in the [`DebugSession`](crate::session::DebugSession) that owns
/// this handle.
#[derive(Debug, Default)]
pub struct PtraceControl;

impl PtraceControl
{
    /// Create a new ptrace-backed control handle
    pub fn new() -> Self
    {
        Self
    }
}

fn to_pid(pid: ProcessId) -> Pid
{
    Pid::from_raw(pid.raw())
}

fn to_process_id(pid: Pid) -> Result<ProcessId>
{
    ProcessId::new(i64::from(pid.as_raw()))
}

/// Map one wait status onto a [`TraceEvent`]
///
/// Returns `None` for statuses the event loop has no use for
/// (`StillAlive`, `Continued`); the caller keeps waiting.
fn map_wait_status(status: WaitStatus) -> Result<Option<TraceEvent>>
{
    let event = match status {
        WaitStatus::Exited(pid, code) => Some(TraceEvent::Exited {
            pid: to_process_id(pid)?,
            status: code,
        }),
        // Death by signal is encoded as a negative status
        WaitStatus::Signaled(pid, signal, _core_dumped) => Some(TraceEvent::Exited {
            pid: to_process_id(pid)?,
            status: -(signal as i32),
        }),
        WaitStatus::PtraceEvent(pid, _signal, event) if is_spawn_event(event) => {
            Some(TraceEvent::SpawnedChild {
                pid: to_process_id(pid)?,
            })
        }
        WaitStatus::PtraceEvent(pid, signal, _event) => Some(TraceEvent::Stopped {
            pid: to_process_id(pid)?,
            signal: signal as i32,
        }),
        WaitStatus::Stopped(pid, signal) => Some(TraceEvent::Stopped {
            pid: to_process_id(pid)?,
            signal: signal as i32,
        }),
        WaitStatus::PtraceSyscall(pid) => Some(TraceEvent::Stopped {
            pid: to_process_id(pid)?,
            signal: Signal::SIGTRAP as i32,
        }),
        WaitStatus::Continued(_) | WaitStatus::StillAlive => None,
    };
    Ok(event)
}

fn is_spawn_event(event: i32) -> bool
{
    event == Event::PTRACE_EVENT_FORK as i32
        || event == Event::PTRACE_EVENT_VFORK as i32
        || event == Event::PTRACE_EVENT_CLONE as i32
}

impl DebugControl for PtraceControl
{
    fn attach(&mut self, pid: ProcessId) -> Result<()>
    {
        ptrace::attach(to_pid(pid))
            .map_err(|errno| PatchError::AttachFailed(format!("ptrace attach to {pid}: {errno}")))
    }

    fn resume(&mut self, pid: ProcessId) -> Result<()>
    {
        ptrace::cont(to_pid(pid), None)?;
        Ok(())
    }

    fn set_trace_options(&mut self, pid: ProcessId) -> Result<()>
    {
        let options =
            Options::PTRACE_O_TRACEFORK | Options::PTRACE_O_TRACEVFORK | Options::PTRACE_O_TRACECLONE;
        ptrace::setoptions(to_pid(pid), options)?;
        debug!("Enabled fork/vfork/clone tracking on {pid}");
        Ok(())
    }

    fn event_child(&mut self, pid: ProcessId) -> Result<ProcessId>
    {
        let raw = ptrace::getevent(to_pid(pid))?;
        ProcessId::new(i64::from(raw))
    }

    fn wait_next(&mut self) -> Result<TraceEvent>
    {
        loop {
            match waitpid(None, None) {
                Ok(status) => {
                    trace!("waitpid: {status:?}");
                    if let Some(event) = map_wait_status(status)? {
                        return Ok(event);
                    }
                }
                Err(Errno::ECHILD) => return Ok(TraceEvent::NoneRemaining),
                Err(errno) => return Err(errno.into()),
            }
        }
    }

    fn read_region(&mut self, pid: ProcessId, region: &MemoryRegion) -> Result<Vec<u8>>
    {
        let path = format!("/proc/{pid}/mem");
        let file = File::open(&path)
            .map_err(|err| PatchError::MemoryIo(format!("open {path}: {err}")))?;

        let size = usize::try_from(region.size()).map_err(|_| {
            PatchError::MemoryIo(format!("region {}-{} too large", region.start, region.end))
        })?;
        let mut buffer = vec![0_u8; size];
        file.read_exact_at(&mut buffer, region.start.value())
            .map_err(|err| PatchError::MemoryIo(format!("read {size} bytes at {}: {err}", region.start)))?;

        trace!("Read {size} bytes at {} from process {pid}", region.start);
        Ok(buffer)
    }

    fn write_memory(&mut self, pid: ProcessId, address: Address, bytes: &[u8]) -> Result<()>
    {
        let tracee = to_pid(pid);
        let mut offset = 0_usize;
        while offset < bytes.len() {
            let chunk = &bytes[offset..];
            let addr = (address + offset as u64).value() as usize as ptrace::AddressType;
            let word = if chunk.len() >= WORD_SIZE {
                let mut word = [0_u8; WORD_SIZE];
                word.copy_from_slice(&chunk[..WORD_SIZE]);
                c_long::from_ne_bytes(word)
            } else {
                // Trailing partial word: fold the new bytes into the
                // existing word so the bytes past the replacement survive.
                let mut word = ptrace::read(tracee, addr)?.to_ne_bytes();
                word[..chunk.len()].copy_from_slice(chunk);
                c_long::from_ne_bytes(word)
            };
            ptrace::write(tracee, addr, word)?;
            offset += WORD_SIZE.min(chunk.len());
        }
        debug!("Wrote {} bytes at {address} in process {pid}", bytes.len());
        Ok(())
    }
}
