//! ### English
//! Recoverable errors surfaced by the pacing API.
//!
//! Invariant breaches (frame-id ordering, ring overrun) are not represented here; they panic.
//!
//! ### 中文
//! 帧节奏 API 对外暴露的可恢复错误。
//!
//! 不变量被破坏（帧 ID 顺序、ring 越界）不在此表示，而是直接 panic。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacerError {
    /// ### English
    /// Another presenter currently holds the pacing context.
    ///
    /// ### 中文
    /// 另一个 presenter 正在占用该 pacing context。
    #[error("a presenter is already active on this pacing context")]
    PresenterActive,

    /// ### English
    /// A present targeted zero or several surfaces; exactly one is supported.
    ///
    /// ### 中文
    /// present 指定了 0 个或多个 surface；仅支持恰好一个。
    #[error("present must target exactly one surface, got {0}")]
    UnsupportedSurfaceCount(usize),

    #[error("frame statistics capacity must be a power of two of at least 2, got {0}")]
    InvalidCapacity(usize),

    #[error("failed to read pacer config {path:?}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse pacer config")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to spawn the present-wait thread")]
    SpawnWorker(#[source] io::Error),
}
