//! Thin wrapper around `tokio::process::Command` for service CLIs.
//!
//! Captures stdout and stderr in full and hands back the exit code; callers
//! decide how a non-zero exit maps onto their own error type.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Rendered command line, for error messages.
    pub command: String,
    /// Exit code (`-1` when killed by a signal).
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true when the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs `program` with `args` to completion.
///
/// Only spawn failures surface as `Err`; a non-zero exit is reported through
/// [`CommandOutput::code`].
pub async fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
) -> std::io::Result<CommandOutput> {
    let command = render_command(program, args);
    debug!(command = %command, "Running external command");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let output = cmd.output().await?;
    let result = CommandOutput {
        command,
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };
    debug!(code = result.code, stdout_len = result.stdout.len(), "External command finished");
    Ok(result)
}

fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        if arg.contains(char::is_whitespace) {
            rendered.push('\'');
            rendered.push_str(arg);
            rendered.push('\'');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}
