use futures::stream::{self, StreamExt};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::LinesStream;

use crate::runtime::build_log::BuildLogFilter;
use crate::runtime::error::RuntimeError;
use crate::runtime::runtime::BuildRequest;

pub(super) fn build_command_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "--progress=plain".to_string(),
        "-t".to_string(),
        request.tag.clone(),
        "-f".to_string(),
        request.dockerfile.clone(),
    ];

    if request.no_cache {
        args.push("--no-cache".to_string());
    }

    for (key, value) in &request.build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(request.context.clone());
    args
}

fn failure(message: String, filter: &BuildLogFilter) -> RuntimeError {
    let tail = filter.tail();
    error!("{}", message);
    for line in &tail {
        error!("  | {}", line);
    }

    RuntimeError::BuildFailure { message, tail }
}

/// Runs `docker build`, logging filtered progress. The process is killed
/// once `timeout` elapses.
pub(super) async fn build_image(request: &BuildRequest, timeout: Duration, throttle: Duration) -> Result<(), RuntimeError> {
    info!("Building image {} from {}", request.tag, request.dockerfile);

    let mut child = Command::new("docker")
        .args(build_command_args(request))
        .env("DOCKER_BUILDKIT", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RuntimeError::BuildFailure {
            message: format!("Cannot run docker build for {}: {}", request.tag, e),
            tail: vec![],
        })?;

    let mut filter = BuildLogFilter::new(throttle);

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        _ => return Err(failure(format!("docker build for {} has no output pipes", request.tag), &filter)),
    };

    let mut lines = stream::select(
        LinesStream::new(BufReader::new(stdout).lines()),
        LinesStream::new(BufReader::new(stderr).lines()),
    );

    let outcome = tokio::time::timeout(timeout, async {
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    if let Some(line) = filter.accept(&line, Instant::now()) {
                        info!("[{}] {}", request.tag, line);
                    }
                }
                Err(e) => debug!("Unreadable build output for {}: {}", request.tag, e),
            }
        }

        child.wait().await
    })
    .await;

    match outcome {
        Ok(Ok(status)) if status.success() => {
            info!("Image {} built", request.tag);
            Ok(())
        }
        Ok(Ok(status)) => Err(failure(format!("docker build for {} exited with {}", request.tag, status), &filter)),
        Ok(Err(e)) => Err(failure(format!("docker build for {} failed: {}", request.tag, e), &filter)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                debug!("Cannot kill docker build for {}: {}", request.tag, e);
            }
            Err(failure(format!("docker build for {} timed out after {:?}", request.tag, timeout), &filter))
        }
    }
}
