//! 検索バックエンドモジュール
//!
//! コンパイル済みの呼び出しを外部検索ツールで実行する抽象化レイヤーです。
//! プロセスはリクエストごとに起動・終了し、リクエスト間で保持しません。

use crate::error::{Result, SearchError};
use crate::types::CompiledInvocation;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod ripgrep;

pub use ripgrep::RipgrepBackend;

/// ripgrep: マッチあり
pub const EXIT_MATCHES: i32 = 0;
/// ripgrep: マッチなし（エラーではない）
pub const EXIT_NO_MATCHES: i32 = 1;

/// 外部ツールの実行結果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutput {
    /// 標準出力（ストリーミング実行時は空）
    pub stdout: Vec<u8>,
    /// 診断用の標準エラー出力
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ExecutionOutput {
    /// 終了コードを解釈する
    ///
    /// 0 と 1 は成功扱い、それ以外は `ExecutionFailed`
    pub fn into_checked(self) -> Result<Self> {
        match self.exit_code {
            Some(EXIT_MATCHES) | Some(EXIT_NO_MATCHES) => Ok(self),
            status => Err(SearchError::ExecutionFailed {
                status,
                stderr: self.stderr.trim().to_string(),
            }),
        }
    }

    pub fn has_matches(&self) -> bool {
        self.exit_code == Some(EXIT_MATCHES)
    }
}

/// 検索バックエンドの共通インターフェース
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// 呼び出しを実行し、標準出力をすべて取得する
    ///
    /// タイムアウトまたはキャンセル時はプロセスを終了させてからエラーを返す
    async fn execute(
        &self,
        invocation: &CompiledInvocation,
        timeout: Duration,
        cancellation_token: CancellationToken,
    ) -> Result<ExecutionOutput>;

    /// 呼び出しを実行し、標準出力を一行ずつ `lines` に送る
    ///
    /// 受信側がドロップされた場合はキャンセルとして扱う
    async fn execute_streaming(
        &self,
        invocation: &CompiledInvocation,
        timeout: Duration,
        cancellation_token: CancellationToken,
        lines: mpsc::Sender<Vec<u8>>,
    ) -> Result<ExecutionOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: Option<i32>) -> ExecutionOutput {
        ExecutionOutput {
            stdout: Vec::new(),
            stderr: "rg: regex parse error\n".to_string(),
            exit_code: code,
        }
    }

    #[test]
    fn test_exit_code_mapping() {
        assert!(output(Some(0)).into_checked().unwrap().has_matches());
        assert!(!output(Some(1)).into_checked().unwrap().has_matches());

        match output(Some(2)).into_checked() {
            Err(SearchError::ExecutionFailed { status, stderr }) => {
                assert_eq!(status, Some(2));
                assert_eq!(stderr, "rg: regex parse error");
            }
            other => panic!("Expected ExecutionFailed, got {:?}", other),
        }

        // シグナルで終了した場合
        assert!(matches!(
            output(None).into_checked(),
            Err(SearchError::ExecutionFailed { status: None, .. })
        ));
    }
}
