// src/miner/worker.rs
//! Worker subprocess handling
//!
//! Builds the worker command line from a profile, spawns the external
//! mining process with a piped stdout and offers best-effort termination.
//! A [`WorkerProcess`] lives independently of its caller until it is
//! terminated or exits on its own.

use crate::config::MinerConfig;
use crate::utils::error::MinerError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

/// Executable and working directory used to launch workers
///
/// The program is a whitespace-separated prefix so script forms like
/// `python poclbm.py` work the same as a packaged `poclbm.exe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLauncher {
    /// Program followed by any fixed leading arguments
    pub program: Vec<String>,
    /// Directory the worker is started in
    pub working_dir: PathBuf,
}

impl WorkerLauncher {
    /// Creates a launcher from explicit parts
    pub fn new(program: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        WorkerLauncher {
            program,
            working_dir: working_dir.into(),
        }
    }

    /// Creates a launcher from a command string such as `"python poclbm.py"`
    ///
    /// # Errors
    /// Returns `MinerError::ConfigError` if `command` is blank.
    pub fn from_command_line(command: &str, working_dir: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let program: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        if program.is_empty() {
            return Err(MinerError::ConfigError("Worker executable is empty".into()));
        }
        Ok(Self::new(program, working_dir))
    }

    /// Directory containing the running executable
    ///
    /// Falls back to the current directory when it can't be determined.
    pub fn default_working_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for WorkerLauncher {
    fn default() -> Self {
        Self::new(vec!["poclbm".to_string()], Self::default_working_dir())
    }
}

/// Fully built worker argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    args: Vec<String>,
}

impl WorkerCommand {
    /// Wraps an explicit argument vector; the first element is the program
    pub fn from_args(args: Vec<String>) -> Self {
        WorkerCommand { args }
    }

    /// Builds the command line for one profile
    ///
    /// `program... --user=U --pass=P -o HOST -p PORT -dN --verbose FLAGS...`
    ///
    /// Extra flags are split on whitespace and forwarded unvalidated.
    pub fn for_profile(launcher: &WorkerLauncher, config: &MinerConfig) -> Self {
        let mut args = launcher.program.clone();
        args.push(format!("--user={}", config.username));
        args.push(format!("--pass={}", config.password));
        args.push("-o".to_string());
        args.push(config.hostname.clone());
        args.push("-p".to_string());
        args.push(config.port.clone());
        args.push(format!("-d{}", config.device_index()));
        args.push("--verbose".to_string());
        args.extend(config.flags.split_whitespace().map(str::to_string));
        WorkerCommand { args }
    }

    /// Command that runs the official client as a JSON-RPC server for
    /// solo mining: `executable... -server`
    ///
    /// # Errors
    /// Returns `MinerError::ConfigError` if `executable` is blank.
    pub fn solo_server(executable: &str) -> Result<Self, MinerError> {
        let mut args: Vec<String> = executable.split_whitespace().map(str::to_string).collect();
        if args.is_empty() {
            return Err(MinerError::ConfigError("Bitcoin executable is not set".into()));
        }
        args.push("-server".to_string());
        Ok(WorkerCommand { args })
    }

    /// Full argument vector, program first
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program to execute
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Handle to one running worker subprocess
#[derive(Debug)]
pub struct WorkerProcess {
    child: Child,
    command: String,
}

impl WorkerProcess {
    /// Spawns the worker with a piped stdout
    ///
    /// # Errors
    /// Returns `MinerError::LaunchError` if the executable can't be spawned.
    pub fn start(command: &WorkerCommand, working_dir: &Path) -> Result<Self, MinerError> {
        Self::spawn(command, working_dir, Stdio::piped())
    }

    /// Spawns a process nobody reads from, such as the solo-mining client
    ///
    /// # Errors
    /// Returns `MinerError::LaunchError` if the executable can't be spawned.
    pub fn launch_detached(command: &WorkerCommand, working_dir: &Path) -> Result<Self, MinerError> {
        Self::spawn(command, working_dir, Stdio::null())
    }

    fn spawn(command: &WorkerCommand, working_dir: &Path, stdout: Stdio) -> Result<Self, MinerError> {
        let rendered = command.to_string();
        let launch_error = |source| MinerError::LaunchError {
            command: rendered.clone(),
            source,
        };

        let (program, rest) = command.args().split_first().ok_or_else(|| {
            launch_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command line",
            ))
        })?;

        let mut cmd = Command::new(program);
        cmd.args(rest)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::inherit());
        hide_console_window(&mut cmd);

        let child = cmd.spawn().map_err(launch_error)?;
        Ok(WorkerProcess {
            child,
            command: rendered,
        })
    }

    /// OS process id
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Rendered command line the worker was started with
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Takes the stdout pipe; returns `None` on the second call
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Exit status if the worker has already exited
    pub fn try_wait(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Asks the worker to stop
    ///
    /// Sends SIGTERM on Unix and kills the process elsewhere. A worker
    /// that already exited is not an error.
    ///
    /// # Errors
    /// Returns `MinerError::TerminationError` when the signal can't be
    /// delivered. Callers are expected to suppress it.
    pub fn terminate(&mut self) -> Result<(), MinerError> {
        if self.try_wait().is_some() {
            return Ok(());
        }
        self.signal_stop()
    }

    #[cfg(unix)]
    fn signal_stop(&mut self) -> Result<(), MinerError> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let pid = i32::try_from(self.child.id())
            .map_err(|e| MinerError::TerminationError(e.to_string()))?;
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(MinerError::TerminationError(e.to_string())),
        }
    }

    #[cfg(not(unix))]
    fn signal_stop(&mut self) -> Result<(), MinerError> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(MinerError::TerminationError(e.to_string())),
        }
    }

    /// Hands the child to a detached thread that waits for it to exit
    ///
    /// Keeps exited workers from lingering as zombies without ever
    /// blocking the caller.
    pub fn reap_in_background(mut self) {
        if self.try_wait().is_some() {
            return;
        }
        let spawned = std::thread::Builder::new()
            .name(format!("reap-{}", self.child.id()))
            .spawn(move || {
                let _ = self.child.wait();
            });
        if let Err(e) = spawned {
            log::debug!("Could not spawn reaper thread: {}", e);
        }
    }
}

#[cfg(windows)]
fn hide_console_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console_window(_cmd: &mut Command) {}
