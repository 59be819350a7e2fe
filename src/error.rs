//! ライブラリ共通のエラー型
//!
//! 判定コア（`JudgeSession::process`）自体は失敗しない。ここに集約するのは
//! 設定ファイル・記録ファイル・テレメトリ送信など境界部分のエラーのみ。

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JudgeError>;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOMLとして解釈できない設定ファイル
    #[error("failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 値の範囲チェックに失敗した設定
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// 記録ファイルの壊れた行（行番号は1始まり）
    #[error("replay line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OSC error: {0}")]
    Osc(String),
}

impl From<rosc::OscError> for JudgeError {
    fn from(err: rosc::OscError) -> Self {
        Self::Osc(format!("{:?}", err))
    }
}
