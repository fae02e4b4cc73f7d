//! OS-specific signalling for spawned children.
//!
//! Children are started as leaders of their own process group (see
//! [`TokioSpawner`](crate::TokioSpawner)), so signalling the group also
//! reaches anything the tool forked, such as `npx` launching `node`.
//!
//! On Windows there are no process groups to signal; termination falls back
//! to `TerminateProcess` on the child itself.

use std::io;

/// Signal used for the first, polite termination attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KillSignal {
    /// SIGINT - interrupt (Ctrl+C equivalent)
    Int,
    /// SIGTERM - allows graceful shutdown
    #[default]
    Term,
    /// SIGKILL - immediate termination
    Kill,
}

#[cfg(unix)]
impl KillSignal {
    fn as_libc_signal(self) -> libc::c_int {
        match self {
            KillSignal::Int => libc::SIGINT,
            KillSignal::Term => libc::SIGTERM,
            KillSignal::Kill => libc::SIGKILL,
        }
    }
}

/// Send `signal` to the process group led by `pid`.
///
/// Falls back to signalling `pid` alone when it is not a group leader. A
/// process that is already gone is not an error.
#[cfg(unix)]
pub fn signal_process_group(pid: u32, signal: KillSignal) -> io::Result<()> {
    let pid = pid as libc::pid_t;
    let signal = signal.as_libc_signal();

    let pgid = unsafe { libc::getpgid(pid) };
    if pgid == -1 {
        return ignore_missing(io::Error::last_os_error());
    }

    let target_group = pgid == pid;
    let result = if target_group {
        unsafe { libc::killpg(pgid, signal) }
    } else {
        unsafe { libc::kill(pid, signal) }
    };
    if result == -1 {
        return ignore_missing(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn ignore_missing(err: io::Error) -> io::Result<()> {
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

/// Windows has no signal to deliver; the polite attempt is a no-op and the
/// forced kill does the work.
#[cfg(not(unix))]
pub fn signal_process_group(pid: u32, signal: KillSignal) -> io::Result<()> {
    if signal == KillSignal::Kill {
        return kill_process(pid);
    }
    Ok(())
}

/// Immediate, uncatchable termination of the group led by `pid`.
pub fn force_kill(pid: u32) -> io::Result<()> {
    signal_process_group(pid, KillSignal::Kill)
}

/// Check if a process (by PID) still exists. Unreaped zombies count as
/// running.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if result == 0 {
        return true;
    }
    // EPERM = exists but belongs to someone else
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(windows)]
pub fn is_process_running(pid: u32) -> bool {
    use winapi::um::minwinbase::STILL_ACTIVE;
    use winapi::um::processthreadsapi::{GetExitCodeProcess, OpenProcess};
    use winapi::um::winnt::PROCESS_QUERY_LIMITED_INFORMATION;

    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
    if handle.is_null() {
        return false;
    }
    let mut exit_code: u32 = 0;
    let result = unsafe { GetExitCodeProcess(handle, &mut exit_code) };
    unsafe { winapi::um::handleapi::CloseHandle(handle) };
    result != 0 && exit_code == STILL_ACTIVE
}

/// Kill a process by PID on Windows.
#[cfg(windows)]
pub fn kill_process(pid: u32) -> io::Result<()> {
    unsafe {
        let handle = winapi::um::processthreadsapi::OpenProcess(
            winapi::um::winnt::PROCESS_TERMINATE,
            0,
            pid,
        );
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        let success = winapi::um::processthreadsapi::TerminateProcess(handle, 1);
        let err = io::Error::last_os_error();
        winapi::um::handleapi::CloseHandle(handle);
        if success == 0 { Err(err) } else { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_PID: u32 = 2_000_000_000;

    #[test]
    fn default_signal_is_polite() {
        assert_eq!(KillSignal::default(), KillSignal::Term);
    }

    #[cfg(unix)]
    #[test]
    fn signalling_a_missing_process_is_ok() {
        assert!(signal_process_group(MISSING_PID, KillSignal::Term).is_ok());
        assert!(force_kill(MISSING_PID).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn running_checks() {
        assert!(is_process_running(std::process::id()));
        assert!(!is_process_running(MISSING_PID));
    }

    #[cfg(unix)]
    #[test]
    fn force_kill_terminates_group_leader() -> io::Result<()> {
        use std::os::unix::process::CommandExt;

        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()?;
        let pid = child.id();
        assert!(is_process_running(pid));

        force_kill(pid)?;
        let status = child.wait()?;
        assert!(!status.success());
        assert!(!is_process_running(pid));
        Ok(())
    }
}
