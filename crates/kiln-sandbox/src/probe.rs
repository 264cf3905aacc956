use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

use kiln_platform::HostOs;

use crate::CommandEnvironment;
use crate::strategy::SANDBOX_EXEC;

/// A profile that allows everything, used to check that `sandbox-exec` works at all.
const PERMISSIVE_PROFILE: &str = "(version 1) (allow default)";

/// How long a helper may take to run a trivial command before it is considered broken.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Failed to run `{}`", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

/// Answers questions about the isolation capabilities of the current host.
pub trait HostProbe {
    /// The operating system family of the host.
    fn current_os(&self) -> HostOs;

    /// Whether actions can be run in Linux user, mount and network namespaces.
    fn supports_linux_namespace_sandbox(
        &self,
        env: &CommandEnvironment,
    ) -> Result<bool, ProbeError>;

    /// Whether actions can be run under `sandbox-exec`.
    fn supports_darwin_sandbox(&self) -> Result<bool, ProbeError>;
}

/// Probes the real host.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    os: HostOs,
    proc_root: PathBuf,
    /// An explicit `sandbox-exec` location, instead of searching the default path and `PATH`.
    sandbox_exec: Option<PathBuf>,
    timeout: Duration,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::with_os(HostOs::from_env())
    }
}

impl SystemProbe {
    /// Probe the real host, but report `os` as its operating system.
    pub fn with_os(os: HostOs) -> Self {
        Self {
            os,
            proc_root: PathBuf::from("/proc"),
            sandbox_exec: None,
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Give up on a helper that hasn't finished after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn find_sandbox_exec(&self) -> Option<PathBuf> {
        if let Some(sandbox_exec) = &self.sandbox_exec {
            return sandbox_exec.is_file().then(|| sandbox_exec.clone());
        }
        let default = PathBuf::from(SANDBOX_EXEC);
        if default.is_file() {
            return Some(default);
        }
        which::which("sandbox-exec").ok()
    }

    /// Whether the kernel lets unprivileged users create user namespaces.
    fn namespaces_enabled(&self) -> Result<bool, ProbeError> {
        if !self.proc_root.join("self/ns/user").exists() {
            debug!("Kernel does not expose user namespaces");
            return Ok(false);
        }

        // Debian and Ubuntu kernels gate unprivileged namespaces behind a sysctl.
        if let Some(value) =
            read_sysctl(&self.proc_root.join("sys/kernel/unprivileged_userns_clone"))?
        {
            if value == "0" {
                debug!("Unprivileged user namespaces are disabled (`unprivileged_userns_clone=0`)");
                return Ok(false);
            }
        }

        if let Some(value) = read_sysctl(&self.proc_root.join("sys/user/max_user_namespaces"))? {
            if value.parse::<u64>().is_ok_and(|max| max == 0) {
                debug!("User namespaces are disabled (`max_user_namespaces=0`)");
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl HostProbe for SystemProbe {
    fn current_os(&self) -> HostOs {
        self.os
    }

    fn supports_linux_namespace_sandbox(
        &self,
        env: &CommandEnvironment,
    ) -> Result<bool, ProbeError> {
        if !self.namespaces_enabled()? {
            return Ok(false);
        }

        let helper = env.directories().linux_sandbox();
        if !helper.is_file() {
            debug!("Linux sandbox helper not found at: `{}`", helper.display());
            return Ok(false);
        }

        let supported = runs_successfully(
            Command::new(&helper).arg("--").arg("/bin/true"),
            self.timeout,
        )?;
        debug!(
            "Linux sandbox helper `{}` {}",
            helper.display(),
            if supported { "works" } else { "failed to run a trivial command" }
        );
        Ok(supported)
    }

    fn supports_darwin_sandbox(&self) -> Result<bool, ProbeError> {
        let Some(sandbox_exec) = self.find_sandbox_exec() else {
            debug!("`sandbox-exec` not found");
            return Ok(false);
        };

        let supported = runs_successfully(
            Command::new(&sandbox_exec)
                .arg("-p")
                .arg(PERMISSIVE_PROFILE)
                .arg("/usr/bin/true"),
            self.timeout,
        )?;
        debug!(
            "`{}` {}",
            sandbox_exec.display(),
            if supported { "works" } else { "failed to run a trivial command" }
        );
        Ok(supported)
    }
}

/// Read a `/proc/sys` value, returning `None` if the kernel does not have it.
fn read_sysctl(path: &Path) -> Result<Option<String>, ProbeError> {
    match fs_err::read_to_string(path) {
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ProbeError::Io(err)),
    }
}

/// Run a command to completion with its output discarded.
///
/// A binary that disappeared between the existence check and the spawn counts as unsupported, as
/// does one that is still running after `timeout`, which is then killed.
fn runs_successfully(command: &mut Command, timeout: Duration) -> Result<bool, ProbeError> {
    let program = PathBuf::from(command.get_program());
    let spawned = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(ProbeError::Spawn { path: program, err }),
    };

    if let Some(status) = child.wait_timeout(timeout)? {
        return Ok(status.success());
    }

    debug!(
        "`{}` did not finish within {:?}, killing it",
        program.display(),
        timeout
    );
    child.kill()?;
    child.wait()?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use kiln_static::EnvVars;
    use tempfile::TempDir;

    use super::*;
    use crate::Directories;

    fn fake_proc() -> TempDir {
        let proc_root = tempfile::tempdir().unwrap();
        fs_err::create_dir_all(proc_root.path().join("self/ns")).unwrap();
        fs_err::write(proc_root.path().join("self/ns/user"), "").unwrap();
        fs_err::create_dir_all(proc_root.path().join("sys/kernel")).unwrap();
        fs_err::create_dir_all(proc_root.path().join("sys/user")).unwrap();
        proc_root
    }

    fn probe(proc_root: &Path) -> SystemProbe {
        SystemProbe {
            os: HostOs::Linux,
            proc_root: proc_root.to_path_buf(),
            sandbox_exec: None,
            timeout: PROBE_TIMEOUT,
        }
    }

    fn darwin_probe(sandbox_exec: &Path) -> SystemProbe {
        SystemProbe {
            os: HostOs::Darwin,
            proc_root: PathBuf::from("/proc"),
            sandbox_exec: Some(sandbox_exec.to_path_buf()),
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Write an executable shell script.
    #[cfg(unix)]
    fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        fs_err::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs_err::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// A command environment whose helper binaries live in `tools`.
    fn tools_env(tools: &Path) -> CommandEnvironment {
        CommandEnvironment::new(
            Directories::new("/opt/kiln", "/tmp/out", "/tmp/exec").with_embedded_tools(tools),
            "kiln",
        )
    }

    #[test]
    fn namespaces_missing() {
        let proc_root = tempfile::tempdir().unwrap();
        assert!(!probe(proc_root.path()).namespaces_enabled().unwrap());
    }

    #[test]
    fn namespaces_enabled_without_sysctls() {
        let proc_root = fake_proc();
        assert!(probe(proc_root.path()).namespaces_enabled().unwrap());
    }

    #[test]
    fn namespaces_disabled_by_unprivileged_clone() {
        let proc_root = fake_proc();
        fs_err::write(
            proc_root.path().join("sys/kernel/unprivileged_userns_clone"),
            "0\n",
        )
        .unwrap();
        assert!(!probe(proc_root.path()).namespaces_enabled().unwrap());

        fs_err::write(
            proc_root.path().join("sys/kernel/unprivileged_userns_clone"),
            "1\n",
        )
        .unwrap();
        assert!(probe(proc_root.path()).namespaces_enabled().unwrap());
    }

    #[test]
    fn namespaces_disabled_by_max_user_namespaces() {
        let proc_root = fake_proc();
        fs_err::write(proc_root.path().join("sys/user/max_user_namespaces"), "0\n").unwrap();
        assert!(!probe(proc_root.path()).namespaces_enabled().unwrap());

        fs_err::write(
            proc_root.path().join("sys/user/max_user_namespaces"),
            "63459\n",
        )
        .unwrap();
        assert!(probe(proc_root.path()).namespaces_enabled().unwrap());
    }

    #[test]
    fn unreadable_sysctl_is_an_error() {
        let proc_root = fake_proc();
        // A directory where a file is expected can't be read.
        fs_err::create_dir_all(proc_root.path().join("sys/user/max_user_namespaces")).unwrap();
        let err = probe(proc_root.path()).namespaces_enabled().unwrap_err();
        assert!(matches!(err, ProbeError::Io(_)), "{err:?}");
    }

    #[test]
    fn missing_helper_is_unsupported() {
        let proc_root = fake_proc();
        let tools = tempfile::tempdir().unwrap();
        temp_env::with_var_unset(EnvVars::KILN_LINUX_SANDBOX, || {
            let env = tools_env(tools.path());
            assert!(
                !probe(proc_root.path())
                    .supports_linux_namespace_sandbox(&env)
                    .unwrap()
            );
        });
    }

    #[test]
    #[cfg(unix)]
    fn working_helper_is_supported() {
        let proc_root = fake_proc();
        let tools = tempfile::tempdir().unwrap();
        write_script(
            &tools.path().join("linux-sandbox"),
            r#"[ "$1" = "--" ] && exec "$2""#,
        );
        temp_env::with_var_unset(EnvVars::KILN_LINUX_SANDBOX, || {
            let env = tools_env(tools.path());
            assert!(
                probe(proc_root.path())
                    .supports_linux_namespace_sandbox(&env)
                    .unwrap()
            );
        });
    }

    #[test]
    #[cfg(unix)]
    fn failing_helper_is_unsupported() {
        let proc_root = fake_proc();
        let tools = tempfile::tempdir().unwrap();
        write_script(&tools.path().join("linux-sandbox"), "exit 3");
        temp_env::with_var_unset(EnvVars::KILN_LINUX_SANDBOX, || {
            let env = tools_env(tools.path());
            assert!(
                !probe(proc_root.path())
                    .supports_linux_namespace_sandbox(&env)
                    .unwrap()
            );
        });
    }

    #[test]
    #[cfg(unix)]
    fn helper_override_is_probed() {
        let proc_root = fake_proc();
        let tools = tempfile::tempdir().unwrap();
        let helper = tools.path().join("custom-sandbox");
        write_script(&helper, r#"[ "$1" = "--" ] && exec "$2""#);
        temp_env::with_var(EnvVars::KILN_LINUX_SANDBOX, Some(&helper), || {
            let env = tools_env(tools.path());
            assert!(
                probe(proc_root.path())
                    .supports_linux_namespace_sandbox(&env)
                    .unwrap()
            );
        });
    }

    #[test]
    fn missing_sandbox_exec_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let probe = darwin_probe(&dir.path().join("sandbox-exec"));
        assert!(!probe.supports_darwin_sandbox().unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn working_sandbox_exec_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox_exec = dir.path().join("sandbox-exec");
        write_script(
            &sandbox_exec,
            r#"[ "$1" = "-p" ] && [ "$2" = "(version 1) (allow default)" ] && [ "$3" = "/usr/bin/true" ]"#,
        );
        assert!(darwin_probe(&sandbox_exec).supports_darwin_sandbox().unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn failing_sandbox_exec_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox_exec = dir.path().join("sandbox-exec");
        write_script(&sandbox_exec, "exit 71");
        assert!(!darwin_probe(&sandbox_exec).supports_darwin_sandbox().unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn hung_helper_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox_exec = dir.path().join("sandbox-exec");
        write_script(&sandbox_exec, "exec sleep 30");
        let probe = darwin_probe(&sandbox_exec).with_timeout(Duration::from_millis(200));
        assert!(!probe.supports_darwin_sandbox().unwrap());
    }

    #[test]
    fn missing_binary_does_not_run() {
        let mut command = Command::new("/nonexistent/kiln/linux-sandbox");
        assert!(!runs_successfully(&mut command, PROBE_TIMEOUT).unwrap());
    }

    #[test]
    fn reports_configured_os() {
        assert_eq!(SystemProbe::with_os(HostOs::FreeBsd).current_os(), HostOs::FreeBsd);
        assert_eq!(SystemProbe::default().current_os(), HostOs::from_env());
    }
}
