//! # Patch Pipeline
//!
//! Composes the stages of one instrumentation run as an explicit pipeline
//! of typed results: locate the target process, attach a debug session,
//! resolve the module mapping on the target's first stop, scan and patch,
//! then keep the session running until every tracked process has exited.
//!
//! Failures short-circuit via early return; each fatal condition carries
//! the phase it belongs to in its type.

use std::process::Command;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{PatchError, Result};
use crate::locator::{self, ProcFs};
use crate::maps;
use crate::platform;
use crate::scanner;
use crate::session::DebugSession;
use crate::types::{Address, PatchOutcome, ProcessId, Signature};

/// Everything one patch attempt needs
#[derive(Debug, Clone)]
pub struct PatchRequest
{
    /// Executable name of the target process, matched exactly against the
    /// process table's command names.
    pub process_name: String,
    /// Module to patch, matched as a substring of the mapping label.
    pub module_name: String,
    /// Pattern and replacement bytes.
    pub signature: Signature,
    /// Number of process table scans before discovery gives up.
    pub max_attempts: u32,
    /// Pause between process table scans.
    pub retry_interval: Duration,
    /// Track fork/vfork/clone descendants of the target.
    pub follow_children: bool,
    /// Optional command line spawned before discovery (a launcher whose
    /// descendant is the target). Fire-and-forget; the spawned process is
    /// not supervised.
    pub launch: Option<Vec<String>>,
}

/// Run one full patch attempt
///
/// ## Errors
///
/// [`PatchError::DiscoveryTimeout`] when no matching process ever appears
/// (no patch attempt happened), or an I/O error from spawning the launch
/// command. Session-level failures are not errors here — they come back as
/// the non-`Applied` [`PatchOutcome`] variants.
pub fn run(request: &PatchRequest) -> Result<PatchOutcome>
{
    if let Some(command) = &request.launch {
        spawn_launcher(command)?;
    }

    let table = ProcFs::new();
    let pid = locator::find_by_name(
        &table,
        &request.process_name,
        request.max_attempts,
        request.retry_interval,
    )?;

    Ok(attempt(pid, request))
}

/// Attach to an already located target and patch it
///
/// Terminal per the contract: one attempt, no retries. Every failure past
/// discovery maps onto a [`PatchOutcome`] variant.
pub fn attempt(pid: ProcessId, request: &PatchRequest) -> PatchOutcome
{
    let control = match platform::create_control() {
        Ok(control) => control,
        Err(err) => {
            warn!("No debug backend available: {err}");
            return PatchOutcome::AttachFailed;
        }
    };

    let mut session = match DebugSession::attach(control, pid, request.follow_children) {
        Ok(session) => session,
        Err(err) => {
            warn!("{err}");
            return PatchOutcome::AttachFailed;
        }
    };

    let mut applied: Option<Address> = None;
    let result = session.run(|control, target| {
        let region = maps::resolve_module(target, &request.module_name)?;
        match scanner::scan_and_patch(control, target, &region, &request.signature) {
            PatchOutcome::Applied(address) => {
                applied = Some(address);
                Ok(())
            }
            PatchOutcome::SignatureNotFound => Err(PatchError::SignatureNotFound {
                module: request.module_name.clone(),
            }),
            _ => Err(PatchError::MemoryIo(format!(
                "patching module {:?} in process {target} failed",
                request.module_name
            ))),
        }
    });

    match result {
        Ok(()) => match applied {
            Some(address) => {
                info!("Session complete, patch applied at {address}");
                PatchOutcome::Applied(address)
            }
            None => {
                warn!("Target {pid} exited before it could be patched");
                PatchOutcome::AttachFailed
            }
        },
        Err(PatchError::MappingNotFound { .. }) => PatchOutcome::MappingNotFound,
        Err(PatchError::SignatureNotFound { .. }) => PatchOutcome::SignatureNotFound,
        Err(err) => {
            warn!("Session failed: {err}");
            PatchOutcome::WriteFailed
        }
    }
}

/// Spawn the launch collaborator, detached
///
/// The launcher's own lifetime is irrelevant; discovery finds whichever
/// descendant ends up carrying the target's executable name.
fn spawn_launcher(command: &[String]) -> Result<()>
{
    let program = command.first().ok_or_else(|| {
        PatchError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty launch command",
        ))
    })?;
    let child = Command::new(program).args(&command[1..]).spawn()?;
    info!("Launched {program:?} (PID {})", child.id());
    Ok(())
}
