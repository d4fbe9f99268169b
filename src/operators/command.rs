// src/operators/command.rs

use std::process::Stdio;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as Process;
use tracing::{debug, info};

use super::{BoxFuture, Operator, TaskContext, Template};

/// Runs a shell command; a non-zero exit status is a failure.
///
/// The command line is itself a template, so `%Y%m%d` and friends expand to
/// the run's logical time.
pub struct Command {
    cmd: Template,
}

impl Command {
    pub fn new(cmd: Template) -> Self {
        Self { cmd }
    }
}

impl Operator for Command {
    fn kind(&self) -> &'static str {
        "command"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let cmd = ctx.render(&self.cmd);
            info!(task = %ctx.task, run_id = ctx.run_id, cmd = %cmd, "starting process");

            let mut child = Process::new("sh")
                .arg("-c")
                .arg(&cmd)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("spawning process for task '{}'", ctx.task))?;

            if let Some(stdout) = child.stdout.take() {
                tokio::spawn(forward_lines(ctx.task.clone(), "stdout", stdout));
            }
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(forward_lines(ctx.task.clone(), "stderr", stderr));
            }

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for process of task '{}'", ctx.task))?;

            let code = status.code().unwrap_or(-1);
            info!(task = %ctx.task, run_id = ctx.run_id, exit_code = code, "process exited");
            if !status.success() {
                bail!("command exited with code {}", code);
            }
            Ok(())
        })
    }
}

// Consume a pipe so the child never blocks on a full buffer.
async fn forward_lines<R>(task: String, stream: &'static str, pipe: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(task = %task, stream, "{}", line);
    }
}
