//! ripgrep バックエンド実装
//!
//! コンパイル済みの引数ベクタでripgrepを起動し、出力を回収します。

use super::{ExecutionOutput, SearchBackend};
use crate::error::{Result, SearchError};
use crate::types::CompiledInvocation;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// ripgrepバックエンド
#[derive(Debug, Default)]
pub struct RipgrepBackend;

impl RipgrepBackend {
    pub fn new() -> Self {
        Self
    }

    /// バイナリをPATHから解決する
    fn resolve_binary(program: &str) -> Result<PathBuf> {
        which::which(program).map_err(|e| {
            log::debug!("ripgrep binary '{}' not found: {}", program, e);
            SearchError::ToolNotFound {
                binary: program.to_string(),
            }
        })
    }

    /// 子プロセスを起動
    fn spawn(invocation: &CompiledInvocation) -> Result<Child> {
        let binary = Self::resolve_binary(&invocation.program)?;

        let mut cmd = Command::new(&binary);
        cmd.args(&invocation.tool_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("Executing ripgrep: {}", invocation.preview_text);

        cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SearchError::ToolNotFound {
                binary: invocation.program.clone(),
            },
            _ => SearchError::Io(e),
        })
    }

    /// ストリームを最後まで読むタスク
    fn drain<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stream) = stream {
                if let Err(e) = stream.read_to_end(&mut buf).await {
                    log::warn!("Error reading ripgrep output: {}", e);
                }
            }
            buf
        })
    }

    /// プロセスを確実に終了させる（kill後にwaitまで行う）
    async fn terminate(child: &mut Child, reason: &str) {
        log::info!("Terminating ripgrep process due to {}", reason);
        if let Err(e) = child.kill().await {
            log::warn!("Failed to kill ripgrep process: {}", e);
        }
    }

    async fn join_stderr(task: JoinHandle<Vec<u8>>) -> String {
        let bytes = task.await.unwrap_or_default();
        let stderr = String::from_utf8_lossy(&bytes).into_owned();
        if !stderr.trim().is_empty() {
            log::warn!("ripgrep stderr: {}", stderr.trim());
        }
        stderr
    }
}

#[async_trait]
impl SearchBackend for RipgrepBackend {
    async fn execute(
        &self,
        invocation: &CompiledInvocation,
        timeout: Duration,
        cancellation_token: CancellationToken,
    ) -> Result<ExecutionOutput> {
        let mut child = Self::spawn(invocation)?;
        let stdout_task = Self::drain(child.stdout.take());
        let stderr_task = Self::drain(child.stderr.take());

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = tokio::time::sleep(timeout) => {
                Self::terminate(&mut child, "timeout").await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(SearchError::Timeout { elapsed: timeout });
            }
            _ = cancellation_token.cancelled() => {
                Self::terminate(&mut child, "cancellation").await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(SearchError::Cancelled);
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = Self::join_stderr(stderr_task).await;

        log::debug!(
            "ripgrep exited with {} ({} bytes of output)",
            status,
            stdout.len()
        );

        ExecutionOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        }
        .into_checked()
    }

    async fn execute_streaming(
        &self,
        invocation: &CompiledInvocation,
        timeout: Duration,
        cancellation_token: CancellationToken,
        lines: mpsc::Sender<Vec<u8>>,
    ) -> Result<ExecutionOutput> {
        let mut child = Self::spawn(invocation)?;
        let stderr_task = Self::drain(child.stderr.take());
        let mut reader = child.stdout.take().map(BufReader::new);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut lines_processed = 0usize;
        while let Some(stdout) = reader.as_mut() {
            let mut line = Vec::new();
            tokio::select! {
                read = stdout.read_until(b'\n', &mut line) => {
                    if read? == 0 {
                        reader = None;
                        continue;
                    }
                }
                _ = &mut deadline => {
                    Self::terminate(&mut child, "timeout").await;
                    stderr_task.abort();
                    return Err(SearchError::Timeout { elapsed: timeout });
                }
                _ = cancellation_token.cancelled() => {
                    Self::terminate(&mut child, "cancellation").await;
                    stderr_task.abort();
                    return Err(SearchError::Cancelled);
                }
            }

            // 受信側が詰まっていてもタイムアウトとキャンセルは効く
            tokio::select! {
                sent = lines.send(line) => {
                    if sent.is_err() {
                        Self::terminate(&mut child, "receiver drop").await;
                        stderr_task.abort();
                        return Err(SearchError::Cancelled);
                    }
                    lines_processed += 1;
                }
                _ = &mut deadline => {
                    Self::terminate(&mut child, "timeout").await;
                    stderr_task.abort();
                    return Err(SearchError::Timeout { elapsed: timeout });
                }
                _ = cancellation_token.cancelled() => {
                    Self::terminate(&mut child, "cancellation").await;
                    stderr_task.abort();
                    return Err(SearchError::Cancelled);
                }
            }
        }

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = &mut deadline => {
                Self::terminate(&mut child, "timeout").await;
                stderr_task.abort();
                return Err(SearchError::Timeout { elapsed: timeout });
            }
            _ = cancellation_token.cancelled() => {
                Self::terminate(&mut child, "cancellation").await;
                stderr_task.abort();
                return Err(SearchError::Cancelled);
            }
        };
        let stderr = Self::join_stderr(stderr_task).await;

        log::debug!("ripgrep streamed {} lines, exited with {}", lines_processed, status);

        ExecutionOutput {
            stdout: Vec::new(),
            stderr,
            exit_code: status.code(),
        }
        .into_checked()
    }
}
