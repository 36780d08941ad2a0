//! Process metadata access. [ProcessQuery] is the contract the tracking core
//! consumes; [SystemProcessQuery] is the sysinfo-backed implementation used in
//! production. Resolution of one canonical process per executable name lives in
//! [resolver].

pub mod resolver;

use std::{
    ffi::OsStr,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use chrono::DateTime;
use sysinfo::{Pid, Process, ProcessesToUpdate, System};

/// Identity of one OS process as observed at resolution time. The core never owns
/// the process behind it: liveness must be re-checked through [ProcessQuery] on
/// every use, since the process can exit at any moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    /// Executable image name the process was enumerated under. For example 'iperf3'.
    pub image_name: Arc<str>,
}

/// Read-only process metadata source. Implementations are expected to answer from
/// fast, synchronous, local OS queries.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessQuery: Send {
    /// All live processes whose image name equals `name`.
    fn list_by_name(&self, name: &str) -> Vec<ProcessHandle>;

    /// Full path to the executable, if the OS reports one. Helper processes often
    /// report none.
    fn executable_path(&self, handle: &ProcessHandle) -> Option<PathBuf>;

    /// Creation moment in the fixed-width encoded form `yyyyMMddHHmmss[.ffffff]`
    /// (4-digit year, then 2-digit month/day/hour/minute/second, then optional
    /// fractional seconds down to microseconds).
    fn creation_timestamp(&self, handle: &ProcessHandle) -> Option<String>;

    /// Process id of the parent, if the process is alive and has one.
    fn parent_id(&self, handle: &ProcessHandle) -> Option<u32>;

    /// Looks a live process up by its id.
    fn find_by_pid(&self, pid: u32) -> Option<ProcessHandle>;

    /// Whether the process behind the handle is still running. Never cached.
    fn is_alive(&self, handle: &ProcessHandle) -> bool;

    /// Product name from the executable's version metadata, when available.
    fn product_name(&self, handle: &ProcessHandle) -> Option<String>;
}

/// [ProcessQuery] implementation backed by a [sysinfo::System] snapshot that is
/// refreshed on every call, so answers reflect the live process table.
pub struct SystemProcessQuery {
    system: Mutex<System>,
}

impl SystemProcessQuery {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }

    fn refreshed(&self) -> std::sync::MutexGuard<'_, System> {
        let mut system = self.system.lock().expect("process table lock poisoned");
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
    }
}

impl Default for SystemProcessQuery {
    fn default() -> Self {
        Self::new()
    }
}

fn to_handle(process: &Process) -> ProcessHandle {
    ProcessHandle {
        pid: process.pid().as_u32(),
        image_name: process.name().to_string_lossy().into(),
    }
}

impl ProcessQuery for SystemProcessQuery {
    fn list_by_name(&self, name: &str) -> Vec<ProcessHandle> {
        self.refreshed()
            .processes_by_exact_name(OsStr::new(name))
            .map(to_handle)
            .collect()
    }

    fn executable_path(&self, handle: &ProcessHandle) -> Option<PathBuf> {
        self.refreshed()
            .process(Pid::from_u32(handle.pid))
            .and_then(|p| p.exe())
            .map(|p| p.to_path_buf())
    }

    fn creation_timestamp(&self, handle: &ProcessHandle) -> Option<String> {
        let started = self
            .refreshed()
            .process(Pid::from_u32(handle.pid))
            .map(|p| p.start_time())?;
        let moment = DateTime::from_timestamp(started as i64, 0)?;
        Some(moment.format("%Y%m%d%H%M%S%.6f").to_string())
    }

    fn parent_id(&self, handle: &ProcessHandle) -> Option<u32> {
        self.refreshed()
            .process(Pid::from_u32(handle.pid))
            .and_then(|p| p.parent())
            .map(|pid| pid.as_u32())
    }

    fn find_by_pid(&self, pid: u32) -> Option<ProcessHandle> {
        self.refreshed().process(Pid::from_u32(pid)).map(to_handle)
    }

    fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.refreshed().process(Pid::from_u32(handle.pid)).is_some()
    }

    fn product_name(&self, _handle: &ProcessHandle) -> Option<String> {
        // sysinfo exposes no executable version metadata. Callers fall back to the
        // raw image name.
        None
    }
}
