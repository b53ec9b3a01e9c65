//! Subprocess execution
//!
//! Every external program (node, npm, yarn, python, pip, uv, unzip) is run
//! through [`run_command_sync`]. The asynchronous form is the same call moved
//! onto a fresh thread, with exactly one callback invoked on completion.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

/// `CREATE_NO_WINDOW` process creation flag.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Keep console windows from flashing up when started from a GUI host.
pub fn hide_console(command: &mut Command) {
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(windows))]
    let _ = command;
}

/// A command invocation: program, arguments, working directory and
/// environment additions.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
    extra_paths: Vec<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            extra_paths: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    /// Directories prepended to the inherited `PATH`, in order.
    pub fn prepend_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.extra_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Human-readable rendering used in logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the [`Command`] with environment and console settings applied.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let mut path_override = None;
        for (key, value) in &self.env {
            if key == "PATH" {
                path_override = Some(value.clone());
            } else {
                command.env(key, value);
            }
        }

        if !self.extra_paths.is_empty() || path_override.is_some() {
            let inherited = path_override
                .or_else(|| std::env::var_os("PATH"))
                .unwrap_or_default();
            let paths = self
                .extra_paths
                .iter()
                .cloned()
                .chain(std::env::split_paths(&inherited));
            match std::env::join_paths(paths) {
                Ok(joined) => {
                    command.env("PATH", joined);
                }
                Err(e) => tracing::warn!("Not extending PATH for {}: {}", self.display(), e),
            }
        }

        hide_console(&mut command);
        command
    }
}

/// Keep the valid UTF-8 runs of `bytes`, dropping undecodable sequences.
fn decode(bytes: &[u8]) -> String {
    let text: String = bytes.utf8_chunks().map(|chunk| chunk.valid()).collect();
    text.trim().to_string()
}

/// Run a command to completion and return its trimmed output.
///
/// Returns stdout, or stderr when stdout is empty. A non-zero exit returns
/// [`Error::CommandFailed`] carrying everything the process printed.
pub fn run_command_sync(command: &CommandLine) -> Result<String> {
    let rendered = command.display();
    tracing::debug!(command = %rendered, cwd = ?command.working_dir(), "Running command");

    let output = command
        .to_command()
        .stdin(Stdio::null())
        .output()
        .map_err(|source| Error::CommandSpawn {
            command: rendered.clone(),
            source,
        })?;

    let stdout = decode(&output.stdout);
    let stderr = decode(&output.stderr);

    if output.status.success() {
        return Ok(if stdout.is_empty() { stderr } else { stdout });
    }

    let combined = [stdout, stderr]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Err(Error::CommandFailed {
        command: rendered,
        output: combined,
    })
}

/// Run a command on a new thread, invoking exactly one of the callbacks
/// with the outcome.
pub fn run_command_async<S, E>(command: CommandLine, on_success: S, on_error: E) -> JoinHandle<()>
where
    S: FnOnce(String) + Send + 'static,
    E: FnOnce(Error) + Send + 'static,
{
    thread::spawn(move || match run_command_sync(&command) {
        Ok(output) => on_success(output),
        Err(e) => on_error(e),
    })
}

/// Shorthand for running `program args...` in an optional directory.
pub fn run_command_ex<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    cwd: Option<&Path>,
) -> Result<String> {
    let mut command = CommandLine::new(program).args(args);
    if let Some(cwd) = cwd {
        command = command.current_dir(cwd);
    }
    run_command_sync(&command)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_stdout_is_trimmed() {
        assert_eq!(run_command_sync(&sh("echo '  hello  '")).unwrap(), "hello");
    }

    #[test]
    fn test_stderr_used_when_stdout_empty() {
        let output = run_command_sync(&sh("echo 'Python 2.7.18' >&2")).unwrap();
        assert_eq!(output, "Python 2.7.18");
    }

    #[test]
    fn test_failure_carries_both_streams() {
        let err = run_command_sync(&sh("echo out; echo 'npm ERR! boom' >&2; exit 3")).unwrap_err();
        match err {
            Error::CommandFailed { command, output } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(output, "out\nnpm ERR! boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_spawn_failure() {
        let err = run_command_sync(&CommandLine::new("/nonexistent/lsp-utils-binary")).unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        let output = run_command_sync(&sh(r"printf 'ok\377'")).unwrap();
        assert_eq!(output, "ok");
    }

    #[test]
    fn test_literal_replacement_character_is_kept() {
        let mut bytes = "ok \u{FFFD} done".as_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(decode(&bytes), "ok \u{FFFD} done");
    }

    #[test]
    fn test_working_dir_and_env() {
        let temp = TempDir::new().unwrap();
        let command = sh("echo \"$(pwd) $GREETING\"")
            .current_dir(temp.path())
            .env("GREETING", "hi");
        let output = run_command_sync(&command).unwrap();
        assert!(output.ends_with(" hi"));
        let reported = PathBuf::from(output.trim_end_matches(" hi"));
        assert_eq!(
            reported.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_extra_paths_are_prepended() {
        let command = sh("echo $PATH").prepend_paths(["/opt/node/bin"]);
        let output = run_command_sync(&command).unwrap();
        assert!(output.starts_with("/opt/node/bin:"), "PATH was {output}");
    }

    #[test]
    fn test_async_invokes_success_once() {
        let (tx, rx) = mpsc::channel();
        let error_tx = tx.clone();
        let handle = run_command_async(
            sh("echo done"),
            move |output| tx.send(Ok(output)).unwrap(),
            move |e| error_tx.send(Err(e.to_string())).unwrap(),
        );
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), Ok("done".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_async_invokes_error_callback() {
        let (tx, rx) = mpsc::channel();
        let error_tx = tx.clone();
        run_command_async(
            sh("exit 1"),
            move |output| tx.send(Ok(output)).unwrap(),
            move |e| error_tx.send(Err(e.to_string())).unwrap(),
        )
        .join()
        .unwrap();
        assert!(rx.recv().unwrap().is_err());
    }

    #[test]
    fn test_run_command_ex() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "x").unwrap();
        let output = run_command_ex("ls", &["marker.txt"], Some(temp.path())).unwrap();
        assert_eq!(output, "marker.txt");
    }

    #[test]
    fn test_display() {
        let command = CommandLine::new("npm").args(["ci", "--omit=dev"]);
        assert_eq!(command.display(), "npm ci --omit=dev");
    }
}
