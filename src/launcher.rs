//! Child process launch.
//!
//! Starts the derived command with inherited standard streams, the extra
//! environment variables overlaid on the current environment, and waits for it
//! to finish.

use std::io;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

use crate::command::CommandSpec;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("invalid command: {0:?}")]
    EmptyCommand(String),
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

impl LaunchError {
    /// Exit status the CLI should terminate with.
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Failed { status, .. } => status
                .code()
                .and_then(|code| u8::try_from(code).ok())
                .filter(|code| *code != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

/// A child process ready to spawn, with the program name used in errors.
pub struct Prepared {
    pub command: Command,
    pub program: String,
}

/// Builds the child process for `spec` without starting it.
pub fn prepare(spec: &CommandSpec) -> Result<Prepared, LaunchError> {
    let (program, args) = spec
        .program_and_args()
        .ok_or_else(|| LaunchError::EmptyCommand(spec.base_command.clone()))?;
    let mut command = Command::new(program);
    command.args(args);
    if !spec.working_dir.is_empty() {
        command.current_dir(&spec.working_dir);
    }
    if !spec.env_vars.is_empty() {
        command.envs(&spec.env_vars);
    }
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    Ok(Prepared {
        command,
        program: program.to_string(),
    })
}

/// Runs `spec` to completion. A non-zero exit is an error.
pub async fn launch(spec: &CommandSpec) -> Result<(), LaunchError> {
    let Prepared {
        mut command,
        program,
    } = prepare(spec)?;
    info!(
        command = %spec.display_command(),
        cwd = %spec.working_dir,
        "launching"
    );
    let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
        program: program.clone(),
        source,
    })?;
    let status = child.wait().await.map_err(|source| LaunchError::Wait {
        program: program.clone(),
        source,
    })?;
    if status.success() {
        info!(%status, "process finished");
        Ok(())
    } else {
        warn!(%status, "process failed");
        Err(LaunchError::Failed { program, status })
    }
}
