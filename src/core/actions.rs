/// Lifecycle actions against live entities
///
/// Container actions go through an async `ActionExecutor`, process signals
/// through the synchronous `SignalSender`.

use std::fmt;
use std::future::Future;
use std::sync::Mutex;

use sysinfo::{Pid, Signal, System};
use tracing::{info, warn};

use crate::core::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerAction {
    Pause,
    Unpause,
    Restart,
    Stop,
    Kill,
    Remove,
}

impl ContainerAction {
    pub const ALL: [ContainerAction; 6] = [
        ContainerAction::Pause,
        ContainerAction::Unpause,
        ContainerAction::Restart,
        ContainerAction::Stop,
        ContainerAction::Kill,
        ContainerAction::Remove,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ContainerAction::Pause => "PAUSE",
            ContainerAction::Unpause => "UNPAUSE",
            ContainerAction::Restart => "RESTART",
            ContainerAction::Stop => "STOP",
            ContainerAction::Kill => "KILL",
            ContainerAction::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Performs a confirmed action on one entity.
///
/// Acting on an entity that is already gone must fail with
/// `ActionError::NotFound`, never succeed quietly.
pub trait ActionExecutor {
    fn apply(&self, action: ContainerAction, entity: &str) -> impl Future<Output = Result<(), ActionError>>;
}

/// A signal offered in the kill dialog.
#[derive(Debug, Clone, Copy)]
pub struct SignalSpec {
    pub number: u32,
    pub name: &'static str,
    pub signal: Signal,
    pub description: &'static str,
}

pub const SIGTERM: u32 = 15;

/// Linux numbering.
pub const SIGNALS: &[SignalSpec] = &[
    SignalSpec { number: 1, name: "SIGHUP", signal: Signal::Hangup, description: "Hangup" },
    SignalSpec { number: 2, name: "SIGINT", signal: Signal::Interrupt, description: "Interrupt from keyboard" },
    SignalSpec { number: 3, name: "SIGQUIT", signal: Signal::Quit, description: "Quit from keyboard" },
    SignalSpec { number: 4, name: "SIGILL", signal: Signal::Illegal, description: "Illegal instruction" },
    SignalSpec { number: 5, name: "SIGTRAP", signal: Signal::Trap, description: "Trace/breakpoint trap" },
    SignalSpec { number: 6, name: "SIGABRT", signal: Signal::Abort, description: "Abort" },
    SignalSpec { number: 7, name: "SIGBUS", signal: Signal::Bus, description: "Bus error" },
    SignalSpec { number: 8, name: "SIGFPE", signal: Signal::FloatingPointException, description: "Floating point exception" },
    SignalSpec { number: 9, name: "SIGKILL", signal: Signal::Kill, description: "Kill" },
    SignalSpec { number: 10, name: "SIGUSR1", signal: Signal::User1, description: "User-defined signal 1" },
    SignalSpec { number: 11, name: "SIGSEGV", signal: Signal::Segv, description: "Invalid memory reference" },
    SignalSpec { number: 12, name: "SIGUSR2", signal: Signal::User2, description: "User-defined signal 2" },
    SignalSpec { number: 13, name: "SIGPIPE", signal: Signal::Pipe, description: "Broken pipe" },
    SignalSpec { number: 14, name: "SIGALRM", signal: Signal::Alarm, description: "Timer signal" },
    SignalSpec { number: 15, name: "SIGTERM", signal: Signal::Term, description: "Termination" },
    SignalSpec { number: 17, name: "SIGCHLD", signal: Signal::Child, description: "Child stopped or terminated" },
    SignalSpec { number: 18, name: "SIGCONT", signal: Signal::Continue, description: "Continue if stopped" },
    SignalSpec { number: 19, name: "SIGSTOP", signal: Signal::Stop, description: "Stop process" },
    SignalSpec { number: 20, name: "SIGTSTP", signal: Signal::TSTP, description: "Stop typed at terminal" },
    SignalSpec { number: 21, name: "SIGTTIN", signal: Signal::TTIN, description: "Terminal input for background process" },
    SignalSpec { number: 22, name: "SIGTTOU", signal: Signal::TTOU, description: "Terminal output for background process" },
    SignalSpec { number: 23, name: "SIGURG", signal: Signal::Urgent, description: "Urgent condition on socket" },
    SignalSpec { number: 24, name: "SIGXCPU", signal: Signal::XCPU, description: "CPU time limit exceeded" },
    SignalSpec { number: 25, name: "SIGXFSZ", signal: Signal::XFSZ, description: "File size limit exceeded" },
    SignalSpec { number: 26, name: "SIGVTALRM", signal: Signal::VirtualAlarm, description: "Virtual alarm clock" },
    SignalSpec { number: 27, name: "SIGPROF", signal: Signal::Profiling, description: "Profiling timer expired" },
    SignalSpec { number: 28, name: "SIGWINCH", signal: Signal::Winch, description: "Window resize signal" },
    SignalSpec { number: 29, name: "SIGIO", signal: Signal::IO, description: "I/O now possible" },
    SignalSpec { number: 30, name: "SIGPWR", signal: Signal::Power, description: "Power failure" },
    SignalSpec { number: 31, name: "SIGSYS", signal: Signal::Sys, description: "Bad system call" },
];

pub fn signal_by_number(number: u32) -> Option<&'static SignalSpec> {
    SIGNALS.iter().find(|s| s.number == number)
}

/// Delivers signals to processes and reports whether a pid is still alive.
#[cfg_attr(test, mockall::automock)]
pub trait SignalSender {
    fn send(&self, pid: u32, signal: Signal) -> Result<(), ActionError>;
    fn exists(&self, pid: u32) -> bool;
}

/// `SignalSender` backed by sysinfo's process table.
pub struct ProcessSignals {
    system: Mutex<System>,
}

impl Default for ProcessSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSignals {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl SignalSender for ProcessSignals {
    fn send(&self, pid: u32, signal: Signal) -> Result<(), ActionError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| ActionError::Failed("process table lock poisoned".into()))?;
        let target = Pid::from_u32(pid);
        if !system.refresh_process(target) {
            return Err(ActionError::NoSuchProcess(pid));
        }
        let process = system.process(target).ok_or(ActionError::NoSuchProcess(pid))?;

        match process.kill_with(signal) {
            Some(true) => {
                info!(pid, %signal, "signal sent");
                Ok(())
            }
            Some(false) => {
                warn!(pid, %signal, "signal delivery failed");
                Err(ActionError::Failed(format!("failed to send {} to pid {}", signal, pid)))
            }
            None => Err(ActionError::Failed(format!(
                "{} is not supported on this platform",
                signal
            ))),
        }
    }

    fn exists(&self, pid: u32) -> bool {
        match self.system.lock() {
            Ok(mut system) => system.refresh_process(Pid::from_u32(pid)),
            Err(_) => false,
        }
    }
}
