//! Child process handling
//!
//! Spawning goes through the [`Spawner`] trait so tests can observe launch
//! order or inject failures. Termination is SIGTERM first, then a forced kill
//! once the grace period runs out.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use super::scenario::Role;

/// Launches benchmark processes
pub trait Spawner: Send + Sync {
    /// Start `program` with `args` for the given role
    fn spawn(&self, role: Role, program: &Path, args: &[String]) -> io::Result<Child>;
}

/// Spawns real child processes sharing the driver's standard streams
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, _role: Role, program: &Path, args: &[String]) -> io::Result<Child> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
    }
}

/// Exit code of a finished process
///
/// Signal deaths map to `128 + signo`, the shell convention.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// Stop a child and reap it
///
/// Already-exited children are only reaped. On Unix the child first gets
/// SIGTERM and `grace` to exit on its own.
pub async fn terminate(child: &mut Child, grace: Duration) -> io::Result<()> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }

    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: pid belongs to a child we have not reaped yet
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == 0 && !grace.is_zero() {
            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                status?;
                return Ok(());
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    tracing::debug!(pid = ?child.id(), "Grace period elapsed, killing");
    child.kill().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_passthrough() {
        let mut child = SystemSpawner
            .spawn(Role::Subscriber, Path::new("sh"), &sh("exit 7"))
            .unwrap();
        let status = child.wait().await.unwrap();
        assert_eq!(exit_code(status), 7);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_running_child() {
        let mut child = SystemSpawner
            .spawn(Role::Publisher, Path::new("sh"), &sh("exec sleep 30"))
            .unwrap();

        terminate(&mut child, Duration::from_millis(500)).await.unwrap();

        let status = child.try_wait().unwrap().expect("child should be reaped");
        assert_eq!(exit_code(status), 128 + libc::SIGTERM);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_escalates_when_sigterm_ignored() {
        let mut child = SystemSpawner
            .spawn(
                Role::Publisher,
                Path::new("sh"),
                &sh("trap '' TERM; while true; do sleep 1; done"),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        terminate(&mut child, Duration::from_millis(200)).await.unwrap();

        let status = child.try_wait().unwrap().unwrap();
        assert_eq!(exit_code(status), 128 + libc::SIGKILL);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_exited_child_is_noop() {
        let mut child = SystemSpawner
            .spawn(Role::Subscriber, Path::new("sh"), &sh("exit 0"))
            .unwrap();
        child.wait().await.unwrap();
        terminate(&mut child, Duration::from_millis(10)).await.unwrap();
    }
}
