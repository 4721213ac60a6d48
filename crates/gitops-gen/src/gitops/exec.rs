//! Running `git` and `rm` in a working directory.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::Mutex;

use thiserror::Error;

use crate::sanitize::redact_repo_url;

/// Programs the driver is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Git,
    Rm,
}

impl CommandKind {
    pub fn program(self) -> &'static str {
        match self {
            CommandKind::Git => "git",
            CommandKind::Rm => "rm",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(CommandKind::Git),
            "rm" => Ok(CommandKind::Rm),
            other => Err(CommandError::Unsupported(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("unsupported command \"{0}\"")]
    Unsupported(String),

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: CommandKind,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and reported failure.
    #[error("{message}")]
    Failed { output: Vec<u8>, message: String },
}

impl CommandError {
    /// Output captured before the failure, empty when nothing ran.
    pub fn output(&self) -> &[u8] {
        match self {
            CommandError::Failed { output, .. } => output,
            _ => &[],
        }
    }
}

/// Runs a command in `dir` and returns its combined output.
pub trait CommandExecutor {
    fn execute(&self, dir: &Path, command: CommandKind, args: &[&str])
        -> Result<Vec<u8>, CommandError>;

    /// Like [`execute`](Self::execute) with the command given by name.
    fn run(&self, dir: &Path, command: &str, args: &[&str]) -> Result<Vec<u8>, CommandError> {
        let kind = command.parse()?;
        self.execute(dir, kind, args)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(
        &self,
        dir: &Path,
        command: CommandKind,
        args: &[&str],
    ) -> Result<Vec<u8>, CommandError> {
        (**self).execute(dir, command, args)
    }
}

/// [`CommandExecutor`] backed by real processes.
///
/// stdout and stderr are concatenated in that order.
#[derive(Debug, Default, Clone, Copy)]
pub struct CmdExecutor;

impl CmdExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for CmdExecutor {
    fn execute(
        &self,
        dir: &Path,
        command: CommandKind,
        args: &[&str],
    ) -> Result<Vec<u8>, CommandError> {
        tracing::debug!(
            command = %command,
            args = %display_args(args),
            dir = %dir.display(),
            "Running command"
        );

        let output = Command::new(command.program())
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| CommandError::Spawn { command, source: e })?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if output.status.success() {
            Ok(combined)
        } else {
            Err(CommandError::Failed {
                output: combined,
                message: output.status.to_string(),
            })
        }
    }
}

fn display_args(args: &[&str]) -> String {
    args.iter()
        .map(|arg| redact_repo_url(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One recorded call to a [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub dir: PathBuf,
    pub command: CommandKind,
    pub args: Vec<String>,
}

impl Execution {
    pub fn new(dir: impl Into<PathBuf>, command: CommandKind, args: &[&str]) -> Self {
        Self {
            dir: dir.into(),
            command,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug)]
enum Reply {
    Ok(Vec<u8>),
    Fail(Vec<u8>, String),
}

/// Test double that replays scripted replies in order and records every
/// call.
///
/// Once the script runs out every call succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Reply>>,
    executed: Mutex<Vec<Execution>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply.
    pub fn then_ok(self, output: impl Into<Vec<u8>>) -> Self {
        self.push(Reply::Ok(output.into()))
    }

    /// Queues a failing reply.
    pub fn then_fail(self, output: impl Into<Vec<u8>>, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(output.into(), message.into()))
    }

    fn push(self, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
        self
    }

    /// Every call made so far, oldest first.
    pub fn executed(&self) -> Vec<Execution> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(
        &self,
        dir: &Path,
        command: CommandKind,
        args: &[&str],
    ) -> Result<Vec<u8>, CommandError> {
        self.executed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Execution::new(dir, command, args));

        let reply = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match reply {
            Some(Reply::Ok(output)) => Ok(output),
            Some(Reply::Fail(output, message)) => Err(CommandError::Failed { output, message }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_command() {
        let err = ScriptedExecutor::new()
            .run(Path::new("/"), "curl", &["-s"])
            .unwrap_err();
        assert!(matches!(err, CommandError::Unsupported(ref name) if name == "curl"));
        assert_eq!(err.to_string(), "unsupported command \"curl\"");
    }

    #[test]
    fn test_scripted_replies_in_order() {
        let executor = ScriptedExecutor::new()
            .then_ok("first")
            .then_fail("second", "exit status: 1");

        assert_eq!(
            executor.execute(Path::new("/a"), CommandKind::Git, &["status"]).unwrap(),
            b"first"
        );
        let err = executor
            .execute(Path::new("/a"), CommandKind::Rm, &["-rf", "x"])
            .unwrap_err();
        assert_eq!(err.output(), b"second");
        assert_eq!(err.to_string(), "exit status: 1");
        assert!(executor
            .execute(Path::new("/a"), CommandKind::Git, &["log"])
            .unwrap()
            .is_empty());

        assert_eq!(
            executor.executed(),
            vec![
                Execution::new("/a", CommandKind::Git, &["status"]),
                Execution::new("/a", CommandKind::Rm, &["-rf", "x"]),
                Execution::new("/a", CommandKind::Git, &["log"]),
            ]
        );
    }

    #[test]
    fn test_display_args_redacts_remote() {
        assert_eq!(
            display_args(&["clone", "https://ghp_x@github.com/o/r", "r"]),
            "clone https://****@github.com/o/r r"
        );
    }

    #[test]
    fn test_cmd_executor_spawn_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = CmdExecutor::new()
            .execute(&dir.path().join("missing"), CommandKind::Git, &["status"])
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
