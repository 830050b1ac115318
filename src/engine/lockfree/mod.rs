//! ### English
//! Lock-free helpers shared by the pacer hot paths.
//!
//! ### 中文
//! 帧节奏器热路径共用的无锁辅助工具。
mod backoff;

pub(crate) use backoff::Backoff;
