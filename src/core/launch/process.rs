// ─── Process Sink ───
// Hands a finished invocation to the OS. The core only ever asks a handle
// whether the game is still running.

use std::process::{Child, Command, Stdio};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::invocation::LaunchInvocation;
use crate::core::error::{LauncherError, LauncherResult};

pub trait ProcessHandle: Send + Sync {
    fn id(&self) -> Option<u32>;
    fn is_alive(&self) -> bool;
    fn kill(&self) -> LauncherResult<()>;
}

pub trait ProcessSink: Send + Sync {
    fn launch(&self, invocation: &LaunchInvocation) -> LauncherResult<Box<dyn ProcessHandle>>;
}

/// Spawns the runtime with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessSink;

impl ProcessSink for SystemProcessSink {
    fn launch(&self, invocation: &LaunchInvocation) -> LauncherResult<Box<dyn ProcessHandle>> {
        std::fs::create_dir_all(&invocation.working_directory)
            .map_err(|e| LauncherError::io(&invocation.working_directory, e))?;

        let mut cmd = Command::new(&invocation.runtime);
        cmd.args(invocation.command_line());
        cmd.current_dir(&invocation.working_directory);
        for (name, value) in &invocation.environment {
            cmd.env(name, prepend_env_path(name, value));
        }
        configure_platform_spawn(&mut cmd);
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        info!("Launching {} with {:?}", invocation.entry_point, invocation.runtime);
        debug!("Command: {}", invocation.display_command(None));

        let child = cmd
            .spawn()
            .map_err(|e| LauncherError::ProcessLaunch(e.to_string()))?;
        Ok(Box::new(ChildHandle {
            id: child.id(),
            child: Mutex::new(child),
        }))
    }
}

struct ChildHandle {
    id: u32,
    child: Mutex<Child>,
}

impl ProcessHandle for ChildHandle {
    fn id(&self) -> Option<u32> {
        Some(self.id)
    }

    fn is_alive(&self) -> bool {
        matches!(self.child.lock().try_wait(), Ok(None))
    }

    fn kill(&self) -> LauncherResult<()> {
        let mut child = self.child.lock();
        match child.try_wait() {
            Ok(Some(_)) => Ok(()),
            _ => child
                .kill()
                .map_err(|e| LauncherError::ProcessLaunch(e.to_string())),
        }
    }
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NEW_CONSOLE: u32 = 0x00000010;
        cmd.creation_flags(CREATE_NEW_CONSOLE);

        // Terminal session vars make LWJGL treat the game as a console app.
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
        cmd.env_remove("ConEmuANSI");
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// `value` in front of whatever the variable already holds.
fn prepend_env_path(var_name: &str, value: &str) -> String {
    let separator = if cfg!(target_os = "windows") { ";" } else { ":" };
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

// ── Recording sink ──────────────────────────────────────

/// Keeps every invocation instead of spawning anything.
#[derive(Debug, Default)]
pub struct RecordingProcessSink {
    launched: Mutex<Vec<LaunchInvocation>>,
}

impl RecordingProcessSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<LaunchInvocation> {
        self.launched.lock().clone()
    }
}

struct RecordedHandle {
    id: u32,
    alive: Mutex<bool>,
}

impl ProcessHandle for RecordedHandle {
    fn id(&self) -> Option<u32> {
        Some(self.id)
    }

    fn is_alive(&self) -> bool {
        *self.alive.lock()
    }

    fn kill(&self) -> LauncherResult<()> {
        *self.alive.lock() = false;
        Ok(())
    }
}

impl ProcessSink for RecordingProcessSink {
    fn launch(&self, invocation: &LaunchInvocation) -> LauncherResult<Box<dyn ProcessHandle>> {
        let mut launched = self.launched.lock();
        launched.push(invocation.clone());
        Ok(Box::new(RecordedHandle {
            id: launched.len() as u32,
            alive: Mutex::new(true),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn prepend_env_path_puts_new_value_first() {
        let merged = prepend_env_path("IFACE_CORE_SHOULD_NOT_EXIST", "/tmp/natives");
        assert_eq!(merged, "/tmp/natives");

        std::env::set_var("IFACE_CORE_TEST_PATH", "/usr/lib");
        let merged = prepend_env_path("IFACE_CORE_TEST_PATH", "/game/natives");
        let sep = if cfg!(target_os = "windows") { ";" } else { ":" };
        assert_eq!(merged, format!("/game/natives{}/usr/lib", sep));
        std::env::remove_var("IFACE_CORE_TEST_PATH");
    }

    #[test]
    fn recording_sink_keeps_invocations() {
        let sink = RecordingProcessSink::new();
        let invocation = LaunchInvocation {
            runtime: PathBuf::from("java"),
            entry_point: "Main".into(),
            search_path_entries: Vec::new(),
            runtime_flags: Vec::new(),
            application_args: Vec::new(),
            working_directory: PathBuf::from("/tmp"),
            environment: Vec::new(),
        };
        let handle = sink.launch(&invocation).unwrap();
        assert!(handle.is_alive());
        handle.kill().unwrap();
        assert!(!handle.is_alive());
        assert_eq!(sink.launched(), vec![invocation]);
    }

    #[cfg(unix)]
    #[test]
    fn spawn_failure_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let invocation = LaunchInvocation {
            runtime: dir.path().join("no-such-java"),
            entry_point: "Main".into(),
            search_path_entries: Vec::new(),
            runtime_flags: Vec::new(),
            application_args: Vec::new(),
            working_directory: dir.path().join("game"),
            environment: Vec::new(),
        };
        let err = SystemProcessSink.launch(&invocation).err().unwrap();
        assert!(matches!(err, LauncherError::ProcessLaunch(_)));
    }
}
