//! Child process execution with timeouts

use anyhow::{anyhow, Context, Result};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run a command to completion, feeding `stdin` if given.
///
/// The child is killed when `timeout` elapses.
pub(crate) async fn run_command(
    mut command: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<Output> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();
    debug!("Running {}", program);

    command
        .kill_on_drop(true)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to start {}", program))?;

    let pipe = child.stdin.take();
    let feed = async {
        if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
            pipe.write_all(input)
                .await
                .with_context(|| format!("Failed to write to {} stdin", program))?;
        }
        Ok::<_, anyhow::Error>(())
    };
    let wait = async {
        child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to run {}", program))
    };

    // Stdin is fed while output drains, both under the same deadline
    match tokio::time::timeout(timeout, async { tokio::try_join!(feed, wait) }).await {
        Ok(result) => result.map(|(_, output)| output),
        Err(_) => Err(anyhow!(
            "{} did not finish within {}s",
            program,
            timeout.as_secs()
        )),
    }
}

/// Trimmed stderr of a finished command
pub(crate) fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
