//! ### English
//! Pacer configuration (TOML, every key optional).
//!
//! ```toml
//! render_ahead_limit = 1
//! stats_capacity = 2048
//! confirm_poll_timeout_ms = 50
//! throttle_timeout_ms = 500
//! ```
//!
//! ### 中文
//! 帧节奏器配置（TOML，所有键均可省略）。

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::error::PacerError;

/// ### English
/// Default ring capacity. Sized so the confirmation thread never lags the submitter by a full
/// revolution at any realistic display latency.
///
/// ### 中文
/// 默认 ring 容量；在任何现实的显示延迟下，确认线程都不会落后提交方一整圈。
pub const DEFAULT_STATS_CAPACITY: usize = 2048;

/// ### English
/// Default render-ahead limit: one frame in flight beyond the one being confirmed.
///
/// ### 中文
/// 默认预渲染上限。
pub const DEFAULT_RENDER_AHEAD_LIMIT: i8 = 1;

/// ### English
/// Bounded timeout used by the present-wait thread so it can observe shutdown requests.
///
/// ### 中文
/// present-wait 线程使用的有界超时，以便能及时观察到关闭请求。
pub const DEFAULT_CONFIRM_POLL_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacerConfig {
    /// ### English
    /// Frames allowed in flight. Negative disables throttling, `0` waits for the previous frame.
    ///
    /// ### 中文
    /// 允许在途的帧数。负数关闭节流，`0` 表示等待上一帧。
    pub render_ahead_limit: i8,
    /// ### English
    /// Ring buffer capacity (power of two).
    ///
    /// ### 中文
    /// ring buffer 容量（2 的幂）。
    pub stats_capacity: usize,
    pub confirm_poll_timeout_ms: u64,
    /// ### English
    /// Upper bound for the throttling wait inside `present`. `None` waits forever.
    ///
    /// ### 中文
    /// `present` 内部节流等待的上限；`None` 表示无限等待。
    pub throttle_timeout_ms: Option<u64>,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            render_ahead_limit: DEFAULT_RENDER_AHEAD_LIMIT,
            stats_capacity: DEFAULT_STATS_CAPACITY,
            confirm_poll_timeout_ms: DEFAULT_CONFIRM_POLL_TIMEOUT.as_millis() as u64,
            throttle_timeout_ms: None,
        }
    }
}

impl PacerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, PacerError> {
        let config: Self = toml::from_str(text)?;
        Ok(config)
    }

    /// ### English
    /// Loads a config file. A missing file is an error; use `PacerConfig::default()` to opt out.
    ///
    /// #### Parameters
    /// - `path`: TOML file to read.
    ///
    /// ### 中文
    /// 读取配置文件；文件不存在视为错误，如需默认配置请使用 `PacerConfig::default()`。
    ///
    /// #### 参数
    /// - `path`：要读取的 TOML 文件。
    pub fn load(path: &Path) -> Result<Self, PacerError> {
        let text = fs::read_to_string(path).map_err(|source| PacerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(?path, ?config, "loaded pacer config");
        Ok(config)
    }

    #[inline]
    pub fn confirm_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_timeout_ms.max(1))
    }

    #[inline]
    pub fn throttle_timeout(&self) -> Option<Duration> {
        self.throttle_timeout_ms.map(Duration::from_millis)
    }
}
