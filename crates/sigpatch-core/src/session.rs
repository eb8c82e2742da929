//! # Debug Attach & Event Loop
//!
//! Owns the debug session against the target process and, optionally, its
//! descendants. The loop blocks on the backend's wait primitive, handles
//! one stop/exit notification at a time, and keeps every traced process
//! that is not the designated target running.
//!
//! ## State machine per tracked process
//!
//! `Running -> Stopped -> Running` (resumed) `-> Exited` (terminal).
//!
//! The supervising thread is descheduled while waiting; there is no polling
//! and no internal parallelism. All resolution/patch work happens
//! synchronously between receiving a stop and resuming the target.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::{PatchError, Result};
use crate::types::{Address, MemoryRegion, ProcessId};

/// One state change delivered by the wait primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent
{
    /// A traced process stopped with a signal.
    Stopped
    {
        /// The process that stopped.
        pid: ProcessId,
        /// Signal number that caused the stop.
        signal: i32,
    },
    /// A traced process reported a fork/vfork/clone event-stop. The new
    /// child's pid is retrieved separately via [`DebugControl::event_child`].
    SpawnedChild
    {
        /// The process that forked/cloned.
        pid: ProcessId,
    },
    /// A traced process exited or was killed.
    Exited
    {
        /// The process that exited.
        pid: ProcessId,
        /// Exit code; negative values encode death by signal.
        status: i32,
    },
    /// The wait primitive has no traced processes left to report on.
    NoneRemaining,
}

/// Control operations the event loop issues against traced processes
///
/// Platform backends implement this over the OS debug facility
/// (`ptrace`/`waitpid` on Linux); tests swap in scripted fakes. Only the
/// session owning the handle may call these — the scanner borrows it for
/// the duration of one patch attempt and never outlives it.
pub trait DebugControl
{
    /// Attach to a running process, making it a tracee.
    ///
    /// The target receives a stop notification shortly afterwards; the
    /// event loop picks it up via [`DebugControl::wait_next`].
    fn attach(&mut self, pid: ProcessId) -> Result<()>;

    /// Resume a stopped tracee.
    fn resume(&mut self, pid: ProcessId) -> Result<()>;

    /// Enable fork/vfork/clone event reporting on a stopped tracee.
    fn set_trace_options(&mut self, pid: ProcessId) -> Result<()>;

    /// Read the new child's pid from a pending spawn event on `pid`.
    fn event_child(&mut self, pid: ProcessId) -> Result<ProcessId>;

    /// Block until any traced process changes state.
    fn wait_next(&mut self) -> Result<TraceEvent>;

    /// Read an entire mapped region out of the target in one operation.
    fn read_region(&mut self, pid: ProcessId, region: &MemoryRegion) -> Result<Vec<u8>>;

    /// Write bytes into the target at an absolute address.
    ///
    /// The target must be stopped; the write is not observable half-done by
    /// the target because it cannot run in between.
    fn write_memory(&mut self, pid: ProcessId, address: Address, bytes: &[u8]) -> Result<()>;
}

/// A live debug session over one target and its tracked descendants
///
/// Created by [`DebugSession::attach`]; the session exclusively owns the
/// control backend and is the only component issuing control operations.
/// The outstanding-process count is a plain field mutated only by the event
/// loop.
pub struct DebugSession
{
    control: Box<dyn DebugControl>,
    target: ProcessId,
    tracked: HashSet<ProcessId>,
    outstanding: usize,
    follow_children: bool,
    patched: bool,
}

impl DebugSession
{
    /// Attach to `target` and begin a session
    ///
    /// With `follow_children` enabled, fork/vfork/clone descendants of the
    /// target are added to the session as they appear, so an arbitrary
    /// process tree can be followed without rescanning the process table.
    ///
    /// ## Errors
    ///
    /// Any backend failure is reported as [`PatchError::AttachFailed`];
    /// attach failures are fatal and never retried.
    pub fn attach(mut control: Box<dyn DebugControl>, target: ProcessId, follow_children: bool) -> Result<Self>
    {
        control
            .attach(target)
            .map_err(|err| PatchError::AttachFailed(format!("process {target}: {err}")))?;
        info!("Attached to process {target}");

        let mut tracked = HashSet::new();
        tracked.insert(target);
        Ok(Self {
            control,
            target,
            tracked,
            outstanding: 1,
            follow_children,
            patched: false,
        })
    }

    /// The designated target of this session
    pub fn target(&self) -> ProcessId
    {
        self.target
    }

    /// Number of traced processes that have not yet exited
    pub fn outstanding(&self) -> usize
    {
        self.outstanding
    }

    /// Run the event loop until every tracked process has exited
    ///
    /// `on_target_stopped` is invoked synchronously on the target's first
    /// stop, exactly once per session, with the control handle borrowed for
    /// the duration of the call. The target is resumed afterwards whether
    /// the callback succeeded or not; a callback error then ends the
    /// session.
    ///
    /// All other stop notifications — siblings, descendants, repeat stops
    /// of the target — are resumed unconditionally so no traced process
    /// stays frozen.
    ///
    /// ## Errors
    ///
    /// Only a callback error is propagated. A failing wait primitive is
    /// logged and treated as loop termination (nothing left to track).
    pub fn run<F>(&mut self, mut on_target_stopped: F) -> Result<()>
    where
        F: FnMut(&mut dyn DebugControl, ProcessId) -> Result<()>,
    {
        loop {
            let event = match self.control.wait_next() {
                Ok(event) => event,
                Err(err) => {
                    warn!("Wait failed, ending session: {err}");
                    return Ok(());
                }
            };
            match event {
                TraceEvent::NoneRemaining => {
                    debug!("No traced processes remaining");
                    return Ok(());
                }
                TraceEvent::Exited { pid, status } => {
                    if self.handle_exit(pid, status) {
                        return Ok(());
                    }
                }
                TraceEvent::SpawnedChild { pid } => {
                    if self.follow_children {
                        self.track_child(pid);
                    }
                    self.resume_quietly(pid);
                }
                TraceEvent::Stopped { pid, signal } => {
                    if pid == self.target && !self.patched {
                        debug!("Target {pid} stopped with signal {signal}");
                        self.patched = true;
                        if self.follow_children {
                            if let Err(err) = self.control.set_trace_options(pid) {
                                warn!("Failed to enable child tracking on {pid}: {err}");
                            }
                        }
                        let result = on_target_stopped(self.control.as_mut(), pid);
                        // Resume before propagating any callback error; the
                        // target must not stay frozen.
                        self.resume_quietly(pid);
                        result?;
                    } else {
                        self.resume_quietly(pid);
                    }
                }
            }
        }
    }

    /// Remove an exited process; true when none are left.
    fn handle_exit(&mut self, pid: ProcessId, status: i32) -> bool
    {
        if self.tracked.remove(&pid) {
            self.outstanding -= 1;
            debug!(
                "Process {pid} exited with status {status}, {} still tracked",
                self.outstanding
            );
            if self.outstanding == 0 {
                info!("All tracked processes have exited");
                return true;
            }
        } else {
            debug!("Ignoring exit of untracked process {pid}");
        }
        false
    }

    /// Register a freshly spawned child of a tracked process.
    fn track_child(&mut self, pid: ProcessId)
    {
        match self.control.event_child(pid) {
            Ok(child) => {
                if self.tracked.insert(child) {
                    self.outstanding += 1;
                    info!(
                        "Tracking child {child} spawned by {pid} ({} outstanding)",
                        self.outstanding
                    );
                    if let Err(err) = self.control.set_trace_options(child) {
                        warn!("Failed to enable child tracking on {child}: {err}");
                    }
                }
            }
            Err(err) => warn!("Failed to read child pid from event on {pid}: {err}"),
        }
    }

    /// Resume a tracee, demoting failure to a warning (it may have died).
    fn resume_quietly(&mut self, pid: ProcessId)
    {
        if let Err(err) = self.control.resume(pid) {
            warn!("Failed to resume process {pid}: {err}");
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    fn pid(raw: i64) -> ProcessId
    {
        ProcessId::new(raw).unwrap()
    }

    /// Operations recorded by the scripted backend, in call order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op
    {
        Attach(ProcessId),
        Resume(ProcessId),
        SetTraceOptions(ProcessId),
        EventChild(ProcessId),
        Callback(ProcessId),
    }

    #[derive(Default)]
    struct Script
    {
        events: VecDeque<Result<TraceEvent>>,
        ops: Vec<Op>,
        /// Child pid handed out for spawn events, keyed implicitly: one
        /// shared value is enough for these scenarios.
        child: Option<ProcessId>,
    }

    /// Scripted [`DebugControl`] with shared interior state so tests can
    /// inspect the recorded operations after the session consumed the box.
    #[derive(Clone)]
    struct ScriptedControl(Rc<RefCell<Script>>);

    impl ScriptedControl
    {
        fn new(events: Vec<TraceEvent>) -> Self
        {
            let script = Script {
                events: events.into_iter().map(Ok).collect(),
                ..Script::default()
            };
            Self(Rc::new(RefCell::new(script)))
        }

        fn with_child(self, child: ProcessId) -> Self
        {
            self.0.borrow_mut().child = Some(child);
            self
        }

        fn push_error(&self, err: PatchError)
        {
            self.0.borrow_mut().events.push_back(Err(err));
        }

        fn ops(&self) -> Vec<Op>
        {
            self.0.borrow().ops.clone()
        }
    }

    impl DebugControl for ScriptedControl
    {
        fn attach(&mut self, pid: ProcessId) -> Result<()>
        {
            self.0.borrow_mut().ops.push(Op::Attach(pid));
            Ok(())
        }

        fn resume(&mut self, pid: ProcessId) -> Result<()>
        {
            self.0.borrow_mut().ops.push(Op::Resume(pid));
            Ok(())
        }

        fn set_trace_options(&mut self, pid: ProcessId) -> Result<()>
        {
            self.0.borrow_mut().ops.push(Op::SetTraceOptions(pid));
            Ok(())
        }

        fn event_child(&mut self, pid: ProcessId) -> Result<ProcessId>
        {
            self.0.borrow_mut().ops.push(Op::EventChild(pid));
            let child = self.0.borrow().child;
            child.ok_or_else(|| PatchError::AttachFailed("no child scripted".to_string()))
        }

        fn wait_next(&mut self) -> Result<TraceEvent>
        {
            self.0
                .borrow_mut()
                .events
                .pop_front()
                .unwrap_or(Ok(TraceEvent::NoneRemaining))
        }

        fn read_region(&mut self, _pid: ProcessId, _region: &MemoryRegion) -> Result<Vec<u8>>
        {
            panic!("not used by session tests")
        }

        fn write_memory(&mut self, _pid: ProcessId, _address: Address, _bytes: &[u8]) -> Result<()>
        {
            panic!("not used by session tests")
        }
    }

    /// Attach a session and run it, recording callback invocations as ops.
    fn run_session(control: &ScriptedControl, target: ProcessId, follow: bool) -> (DebugSession, Result<()>)
    {
        let mut session = DebugSession::attach(Box::new(control.clone()), target, follow).unwrap();
        let handle = control.clone();
        let result = session.run(move |_ctl, pid| {
            handle.0.borrow_mut().ops.push(Op::Callback(pid));
            Ok(())
        });
        (session, result)
    }

    #[test]
    fn test_non_target_stop_is_passed_through()
    {
        let target = pid(100);
        let other = pid(200);
        let control = ScriptedControl::new(vec![
            TraceEvent::Stopped { pid: other, signal: 19 },
            TraceEvent::Stopped { pid: target, signal: 19 },
            TraceEvent::Exited { pid: target, status: 0 },
        ]);

        let (_, result) = run_session(&control, target, false);
        assert!(result.is_ok());

        let ops = control.ops();
        // The sibling is resumed immediately, before the target is ever
        // handled, and the callback fires only for the target.
        assert_eq!(
            ops,
            vec![
                Op::Attach(target),
                Op::Resume(other),
                Op::Callback(target),
                Op::Resume(target),
            ]
        );
    }

    #[test]
    fn test_target_is_patched_at_most_once()
    {
        let target = pid(100);
        let control = ScriptedControl::new(vec![
            TraceEvent::Stopped { pid: target, signal: 19 },
            TraceEvent::Stopped { pid: target, signal: 5 },
            TraceEvent::Stopped { pid: target, signal: 5 },
            TraceEvent::Exited { pid: target, status: 0 },
        ]);

        let (_, result) = run_session(&control, target, false);
        assert!(result.is_ok());

        let ops = control.ops();
        let callbacks = ops.iter().filter(|op| matches!(op, Op::Callback(_))).count();
        let resumes = ops.iter().filter(|op| matches!(op, Op::Resume(_))).count();
        assert_eq!(callbacks, 1);
        assert_eq!(resumes, 3); // every stop is resumed, patched or not
    }

    #[test]
    fn test_spawn_event_tracks_child_and_propagates_options()
    {
        let target = pid(100);
        let child = pid(101);
        let control = ScriptedControl::new(vec![
            TraceEvent::Stopped { pid: target, signal: 19 },
            TraceEvent::SpawnedChild { pid: target },
            TraceEvent::Stopped { pid: child, signal: 19 },
            TraceEvent::Exited { pid: target, status: 0 },
        ])
        .with_child(child);

        let (session, result) = run_session(&control, target, true);
        assert!(result.is_ok());

        // The child exits only after the scripted events run out, so it is
        // still outstanding when the loop ends.
        assert_eq!(session.outstanding(), 1);

        let ops = control.ops();
        assert!(ops.contains(&Op::EventChild(target)));
        assert!(ops.contains(&Op::SetTraceOptions(child)));
        assert!(ops.contains(&Op::Resume(child)));
    }

    #[test]
    fn test_loop_ends_when_outstanding_reaches_zero()
    {
        let target = pid(100);
        let child = pid(101);
        let control = ScriptedControl::new(vec![
            TraceEvent::Stopped { pid: target, signal: 19 },
            TraceEvent::SpawnedChild { pid: target },
            TraceEvent::Exited { pid: child, status: 0 },
            TraceEvent::Exited { pid: target, status: 0 },
        ])
        .with_child(child);

        let (session, result) = run_session(&control, target, true);
        assert!(result.is_ok());
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn test_untracked_exit_does_not_end_the_loop_early()
    {
        let target = pid(100);
        let stranger = pid(999);
        let control = ScriptedControl::new(vec![
            TraceEvent::Exited { pid: stranger, status: 0 },
            TraceEvent::Stopped { pid: target, signal: 19 },
            TraceEvent::Exited { pid: target, status: 0 },
        ]);

        let (session, result) = run_session(&control, target, false);
        assert!(result.is_ok());
        assert_eq!(session.outstanding(), 0);

        let callbacks = control.ops().iter().filter(|op| matches!(op, Op::Callback(_))).count();
        assert_eq!(callbacks, 1);
    }

    #[test]
    fn test_callback_error_resumes_target_then_propagates()
    {
        let target = pid(100);
        let control = ScriptedControl::new(vec![TraceEvent::Stopped { pid: target, signal: 19 }]);

        let mut session = DebugSession::attach(Box::new(control.clone()), target, false).unwrap();
        let result = session.run(|_ctl, _pid| {
            Err(PatchError::SignatureNotFound {
                module: "engine.so".to_string(),
            })
        });

        assert!(matches!(result, Err(PatchError::SignatureNotFound { .. })));
        // The target was resumed before the error surfaced
        assert!(control.ops().contains(&Op::Resume(target)));
    }

    #[test]
    fn test_wait_error_ends_session_cleanly()
    {
        let target = pid(100);
        let control = ScriptedControl::new(vec![TraceEvent::Stopped { pid: target, signal: 19 }]);
        control.push_error(PatchError::AttachFailed("spurious wait failure".to_string()));

        let (_, result) = run_session(&control, target, false);
        assert!(result.is_ok());
    }

    #[test]
    fn test_spawn_events_ignored_without_follow_children()
    {
        let target = pid(100);
        let control = ScriptedControl::new(vec![
            TraceEvent::SpawnedChild { pid: target },
            TraceEvent::Exited { pid: target, status: 0 },
        ]);

        let (session, result) = run_session(&control, target, false);
        assert!(result.is_ok());
        assert_eq!(session.outstanding(), 0);
        assert!(!control.ops().contains(&Op::EventChild(target)));
        // The reporting process is still resumed
        assert!(control.ops().contains(&Op::Resume(target)));
    }
}
