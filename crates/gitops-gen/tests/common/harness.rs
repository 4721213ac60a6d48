#![allow(dead_code)]

use std::path::Path;

use gitops_gen::gitops::{CommandError, CommandExecutor, CommandKind, Execution};
use gitops_gen::ScriptedExecutor;

pub const REMOTE: &str = "https://ghp_fj3492danj924@github.com/shop/gitops";

/// Replays scripted git replies but really deletes on `rm -rf`.
#[derive(Debug, Default)]
pub struct DiskRmExecutor {
    pub git: ScriptedExecutor,
}

impl DiskRmExecutor {
    pub fn new(git: ScriptedExecutor) -> Self {
        Self { git }
    }

    pub fn executed(&self) -> Vec<Execution> {
        self.git.executed()
    }
}

impl CommandExecutor for DiskRmExecutor {
    fn execute(
        &self,
        dir: &Path,
        command: CommandKind,
        args: &[&str],
    ) -> Result<Vec<u8>, CommandError> {
        // Record through the scripted executor so the sequence stays in one place.
        let output = self.git.execute(dir, command, args)?;
        if command == CommandKind::Rm {
            let target = dir.join(args.last().copied().unwrap_or_default());
            if target.exists() {
                std::fs::remove_dir_all(&target).map_err(|e| CommandError::Failed {
                    output: e.to_string().into_bytes(),
                    message: "exit status: 1".to_string(),
                })?;
            }
        }
        Ok(output)
    }
}

pub fn exec(dir: impl AsRef<Path>, command: CommandKind, args: &[&str]) -> Execution {
    Execution::new(dir.as_ref(), command, args)
}
