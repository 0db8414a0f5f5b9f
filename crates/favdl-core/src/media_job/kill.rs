//! Forceful termination of a job's whole process tree.
//!
//! Downloaders shell out to transcoders, so killing only the direct child
//! leaves orphans. On Unix each job runs as the leader of its own process
//! group and the group is killed; on Windows `taskkill /T` walks the tree.

use std::process::Command;

/// Put the child in a fresh process group (Unix) before spawning.
pub(super) fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    {
        let _ = cmd;
    }
}

/// Kill the process tree rooted at `pid`. Best effort; the caller still
/// kills and reaps the direct child.
pub(super) fn kill_tree(pid: u32) {
    #[cfg(unix)]
    {
        let r = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
        if r != 0 {
            tracing::debug!(
                pid,
                error = %std::io::Error::last_os_error(),
                "killpg failed"
            );
        }
    }
    #[cfg(windows)]
    {
        let status = super::fetcher::background_command("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status();
        if let Err(e) = status {
            tracing::debug!(pid, "taskkill failed: {}", e);
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
    }
}
