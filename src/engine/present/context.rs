//! ### English
//! Explicitly owned pacing context: carries the configuration and admits one presenter at a time.
//!
//! ### 中文
//! 显式持有的 pacing context：携带配置，并且同一时间只允许一个 presenter。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::config::PacerConfig;
use crate::engine::error::PacerError;

pub struct PacingContext {
    config: PacerConfig,
    /// ### English
    /// Set while a presenter (and therefore its stats ring) is alive.
    ///
    /// ### 中文
    /// 当某个 presenter（及其统计 ring）存活时置位。
    presenter_active: AtomicBool,
}

impl PacingContext {
    pub fn new(config: PacerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            presenter_active: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    #[inline]
    pub fn has_active_presenter(&self) -> bool {
        self.presenter_active.load(Ordering::Acquire)
    }

    /// ### English
    /// Claims the context for one presenter. Fails if another presenter holds it.
    ///
    /// ### 中文
    /// 为一个 presenter 占用该 context；若已被其它 presenter 占用则失败。
    pub(super) fn claim(self: &Arc<Self>) -> Result<ContextClaim, PacerError> {
        self.presenter_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PacerError::PresenterActive)?;
        Ok(ContextClaim {
            context: self.clone(),
        })
    }
}

/// ### English
/// Releases the context when dropped.
///
/// ### 中文
/// drop 时释放 context。
pub(super) struct ContextClaim {
    context: Arc<PacingContext>,
}

impl Drop for ContextClaim {
    fn drop(&mut self) {
        self.context
            .presenter_active
            .store(false, Ordering::Release);
    }
}
