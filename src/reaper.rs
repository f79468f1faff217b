//! SIGCHLD handling: collect exited background children so they never linger
//! as zombies.

use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// Installs the reaper for the whole process. Foreground waits tolerate the
/// reaper winning the race (`ECHILD`).
pub fn install_child_reaper() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(reap_children),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGCHLD, &action) }?;
    tracing::debug!("SIGCHLD reaper installed");
    Ok(())
}

extern "C" fn reap_children(_: libc::c_int) {
    let saved = Errno::last_raw();
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => continue,
        }
    }
    Errno::set_raw(saved);
}
