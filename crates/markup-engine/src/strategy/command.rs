//! Rendering by piping content through an external executable.

use std::time::Instant;

use crate::descriptor::CommandSpec;
use crate::error::RenderError;
use crate::renderer::Strategy;

use super::process::{self, ProcessError};

/// Strategy that delegates conversion to an external command.
///
/// The content is written to the process's standard input and its standard
/// output is returned verbatim. Arguments come from the pre-split vector in
/// the [`CommandSpec`]; no shell is involved.
#[derive(Debug, Clone, Copy)]
pub struct CommandStrategy<'a> {
    spec: &'a CommandSpec,
}

impl<'a> CommandStrategy<'a> {
    #[must_use]
    pub fn new(spec: &'a CommandSpec) -> Self {
        Self { spec }
    }
}

impl Strategy for CommandStrategy<'_> {
    fn execute(&self, content: &str) -> Result<String, RenderError> {
        let program = self.spec.program();

        // Resolve before spawning so a missing tool fails without any I/O.
        let path = which::which(program).map_err(|e| {
            tracing::debug!(program, error = %e, "Command not resolvable");
            RenderError::CommandNotFound {
                program: program.to_owned(),
            }
        })?;

        tracing::debug!(
            program,
            path = %path.display(),
            bytes = content.len(),
            "Spawning renderer command"
        );
        let started = Instant::now();

        let execution = process::run(
            &path,
            self.spec.arguments(),
            content.as_bytes(),
            self.spec.timeout(),
        )
        .map_err(|e| match e {
            ProcessError::TimedOut(timeout) => {
                tracing::warn!(program, timeout_ms = timeout.as_millis(), "Renderer command timed out");
                RenderError::Timeout {
                    program: program.to_owned(),
                    timeout,
                }
            }
            ProcessError::Spawn(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                RenderError::CommandNotFound {
                    program: program.to_owned(),
                }
            }
            other => RenderError::rendering(format!("command '{program}': {other}")),
        })?;

        let elapsed_ms = started.elapsed().as_millis();

        if !execution.status.success() {
            let stderr = String::from_utf8_lossy(&execution.stderr).into_owned();
            let code = execution.status.code();
            tracing::warn!(
                program,
                exit_code = code.unwrap_or(-1),
                elapsed_ms,
                stderr = %stderr.trim_end(),
                "Renderer command failed"
            );
            return Err(RenderError::NonZeroExit {
                program: program.to_owned(),
                code,
                stderr,
            });
        }

        tracing::debug!(
            program,
            elapsed_ms,
            output_bytes = execution.stdout.len(),
            "Renderer command finished"
        );

        String::from_utf8(execution.stdout).map_err(|_| {
            RenderError::rendering(format!("command '{program}' produced non UTF-8 output"))
        })
    }
}
