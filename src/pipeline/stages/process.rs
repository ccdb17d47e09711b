// src/pipeline/stages/process.rs

//! Shell process plumbing shared by the `command`, `lint` and `bundle` stages.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::pipeline::fileset::SourceFile;

/// Captured result of one external process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Stderr (or stdout when stderr is empty) as text, for error messages.
    pub fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&self.stdout)
        } else {
            stderr
        };
        let text = text.trim();
        if text.is_empty() {
            format!("exited with code {}", self.code)
        } else {
            text.to_string()
        }
    }
}

/// Substitute `{path}`, `{source}` and `{mode}` in a command line.
pub fn expand_placeholders(cmd: &str, file: &SourceFile, ctx: &BuildContext) -> String {
    let source = file
        .origin
        .as_deref()
        .unwrap_or(file.path.as_path())
        .to_string_lossy()
        .into_owned();
    cmd.replace("{path}", &file.rel_str())
        .replace("{source}", &source)
        .replace("{mode}", ctx.mode().as_str())
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Shell command with the build mode exported and output captured. The
/// child is killed when its handle is dropped.
fn prepare(cmd: &str, dir: &Path, ctx: &BuildContext) -> Command {
    let mut command = shell_command(cmd);
    command
        .current_dir(dir)
        .env("ASSETFLOW_MODE", ctx.mode().as_str())
        .env("ASSETFLOW_SOURCEMAPS", flag(ctx.mode().sourcemaps()))
        .env("ASSETFLOW_MINIFY", flag(ctx.mode().minify()))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

fn to_output(output: std::process::Output) -> ProcessOutput {
    ProcessOutput {
        success: output.status.success(),
        code: output.status.code().unwrap_or(-1),
        stdout: output.stdout,
        stderr: output.stderr,
    }
}

/// Run `cmd` in `dir` with nothing on stdin.
pub async fn run_in_dir(cmd: &str, dir: &Path, ctx: &BuildContext) -> Result<ProcessOutput> {
    let mut command = prepare(cmd, dir, ctx);
    command.stdin(Stdio::null());

    debug!(cmd = %cmd, dir = ?dir, "spawning stage process");
    let output = command
        .output()
        .await
        .with_context(|| format!("running process `{cmd}`"))?;
    Ok(to_output(output))
}

/// Run `cmd` in the project root with `file`'s contents on stdin.
///
/// A process that cannot be spawned is an `Err`; a process that runs and
/// exits non-zero is a normal [`ProcessOutput`] with `success == false`.
/// The child is killed if the returned future is dropped.
pub async fn run_with_stdin(
    cmd: &str,
    file: &SourceFile,
    ctx: &BuildContext,
) -> Result<ProcessOutput> {
    let mut command = prepare(cmd, ctx.root(), ctx);
    command
        .env("ASSETFLOW_FILE", file.path.as_os_str())
        .stdin(Stdio::piped());

    debug!(cmd = %cmd, file = ?file.path, "spawning stage process");

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process `{cmd}`"))?;

    // Feed stdin from a separate task so a child that writes a lot before
    // reading everything cannot deadlock against us.
    let stdin_task = child.stdin.take().map(|mut stdin| {
        let input = file.contents.clone();
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(&input).await {
                // Commands that ignore stdin close it early.
                debug!(error = %err, "stage process closed stdin early");
            }
            drop(stdin);
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for process `{cmd}`"))?;

    if let Some(handle) = stdin_task {
        if let Err(err) = handle.await {
            warn!(error = %err, "stdin writer task panicked");
        }
    }

    Ok(to_output(output))
}

/// Quote `arg` for `sh -c`.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

fn flag(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

/// Replace the extension of `path`.
pub fn with_extension(path: &Path, extension: &str) -> std::path::PathBuf {
    path.with_extension(extension.trim_start_matches('.'))
}
