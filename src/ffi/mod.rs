//! ### English
//! C ABI surface for `frame_pacer`.
//!
//! All exported symbols are `extern "C"` functions; structs are `#[repr(C)]`.
//! The embedder supplies its present and present-wait calls as function pointers plus one
//! `user_data` pointer; both callbacks may be invoked from the present-wait thread, so they must be
//! thread-safe.
//!
//! One presenter may exist per process through this surface. Its configuration is read once from
//! the TOML file named by `FRAME_PACER_CONFIG` (defaults when unset).
//!
//! ### 中文
//! `frame_pacer` 的 C ABI 接口层。
//!
//! 所有导出符号均为 `extern "C"` 函数；结构体使用 `#[repr(C)]`。
//! 宿主以函数指针加一个 `user_data` 指针的形式提供 present 与 present-wait 调用；
//! 两个回调都可能在 present-wait 线程中被调用，因此必须线程安全。
//!
//! 通过该接口每个进程只能存在一个 presenter。其配置在首次使用时从 `FRAME_PACER_CONFIG`
//! 指向的 TOML 文件读取（未设置时使用默认值）。

use std::env;
use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use tracing::warn;

use crate::engine::{
    ConfirmationWaiter, DeviceHandle, FrameRecord, FrameStatsReader, PacerConfig, PacingContext,
    PresentDescriptor, PresentOutcome, Presenter, QueueHandle, Submitter, SurfaceHandle,
    WaitOutcome, WaitTimeout,
};

mod abi;
mod presenter;
mod reader;

pub use presenter::{FRAME_PACER_ERROR_INVALID_HANDLE, FRAME_PACER_ERROR_REJECTED};

/// ### English
/// C ABI version for `frame_pacer`.
///
/// ### 中文
/// `frame_pacer` 的 C ABI 版本号。
const FRAME_PACER_ABI_VERSION: u32 = 1;

/// ### English
/// Environment variable naming the TOML config used by the C ABI.
///
/// ### 中文
/// 指定 C ABI 所用 TOML 配置的环境变量。
const FRAME_PACER_CONFIG_ENV: &str = "FRAME_PACER_CONFIG";

/// ### English
/// Wait callback return code meaning "timeout elapsed, frame not displayed yet".
/// Other non-negative codes mean confirmed; negative codes are errors.
///
/// ### 中文
/// 等待回调返回码：“超时，帧尚未显示”。其它非负值表示已确认；负值表示错误。
pub const FRAME_PACER_WAIT_TIMEOUT: i32 = 2;

/// ### English
/// Embedder present call. Returns the backend result code, passed back to the caller unchanged.
///
/// ### 中文
/// 宿主的 present 调用；返回后端结果码，原样回传给调用方。
pub type FramePacerSubmitFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    queue: u64,
    surface: u64,
    image_index: u32,
    present_id: u64,
) -> i32;

/// ### English
/// Embedder present-wait call. `timeout_ns == u64::MAX` means wait forever.
///
/// ### 中文
/// 宿主的 present-wait 调用；`timeout_ns == u64::MAX` 表示无限等待。
pub type FramePacerWaitFn = unsafe extern "C" fn(
    user_data: *mut c_void,
    device: u64,
    surface: u64,
    present_id: u64,
    timeout_ns: u64,
) -> i32;

#[repr(C)]
/// ### English
/// Callback table passed to `frame_pacer_create`.
///
/// ### 中文
/// 传给 `frame_pacer_create` 的回调表。
pub struct FramePacerCallbacks {
    pub user_data: *mut c_void,
    pub submit: Option<FramePacerSubmitFn>,
    pub wait_for_present: Option<FramePacerWaitFn>,
}

/// ### English
/// Opaque pacer handle owning the presenter and its present-wait thread.
///
/// ### 中文
/// 不透明的 pacer 句柄，持有 presenter 及其 present-wait 线程。
pub struct FramePacer {
    presenter: Presenter<CallbackSubmitter>,
}

/// ### English
/// Opaque telemetry reader handle.
///
/// ### 中文
/// 不透明的遥测读者句柄。
pub struct FramePacerReader {
    reader: FrameStatsReader,
}

#[repr(C)]
/// ### English
/// One completed frame record returned to the embedder.
///
/// ### 中文
/// 返回给宿主的单条已完成帧记录。
pub struct FramePacerFrameStats {
    pub frame_id: u64,
    pub frametime_micros: u32,
    pub latency_micros: u32,
    /// ### English
    /// Submission time, nanoseconds since the pacer was created.
    ///
    /// ### 中文
    /// 提交时间：自 pacer 创建以来的纳秒数。
    pub start_ns: u64,
    /// ### English
    /// Confirmation time, nanoseconds since the pacer was created.
    ///
    /// ### 中文
    /// 确认时间：自 pacer 创建以来的纳秒数。
    pub end_ns: u64,
}

impl FramePacerFrameStats {
    fn from_record(record: &FrameRecord, epoch: std::time::Instant) -> Self {
        let since = |at: std::time::Instant| {
            u64::try_from(at.saturating_duration_since(epoch).as_nanos()).unwrap_or(u64::MAX)
        };
        Self {
            frame_id: record.frame_id,
            frametime_micros: record.frametime_micros,
            latency_micros: record.latency_micros,
            start_ns: since(record.start),
            end_ns: since(record.end),
        }
    }
}

/// ### English
/// Embedder `user_data`, shared with the present-wait thread.
///
/// ### 中文
/// 宿主的 `user_data`，与 present-wait 线程共享。
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

// SAFETY: the C ABI contract requires the callbacks (and whatever `user_data` points to) to be
// callable from any thread.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

struct CallbackSubmitter {
    user_data: UserData,
    submit: FramePacerSubmitFn,
}

impl Submitter for CallbackSubmitter {
    fn submit(&mut self, queue: QueueHandle, descriptor: &PresentDescriptor) -> PresentOutcome {
        let surface = descriptor.surfaces.first().map_or(0, |s| s.0);
        let image_index = descriptor.image_indices.first().copied().unwrap_or(0);
        let present_id = descriptor.present_id().unwrap_or(0);
        let code = unsafe {
            (self.submit)(self.user_data.0, queue.0, surface, image_index, present_id)
        };
        PresentOutcome(code)
    }
}

struct CallbackWaiter {
    user_data: UserData,
    wait_for_present: FramePacerWaitFn,
}

impl ConfirmationWaiter for CallbackWaiter {
    fn wait_for_confirmation(
        &self,
        device: DeviceHandle,
        surface: SurfaceHandle,
        frame_id: u64,
        timeout: WaitTimeout,
    ) -> WaitOutcome {
        let code = unsafe {
            (self.wait_for_present)(
                self.user_data.0,
                device.0,
                surface.0,
                frame_id,
                timeout.as_nanos(),
            )
        };
        wait_outcome_from_code(code)
    }
}

#[inline]
fn wait_outcome_from_code(code: i32) -> WaitOutcome {
    match code {
        FRAME_PACER_WAIT_TIMEOUT => WaitOutcome::TimedOut,
        code if code >= 0 => WaitOutcome::Confirmed,
        code => WaitOutcome::Failed(code),
    }
}

/// ### English
/// Process-wide context backing the C ABI.
///
/// ### 中文
/// C ABI 使用的进程级 context。
static FFI_CONTEXT: LazyLock<Arc<PacingContext>> =
    LazyLock::new(|| PacingContext::new(load_ffi_config()));

fn load_ffi_config() -> PacerConfig {
    let Some(path) = env::var_os(FRAME_PACER_CONFIG_ENV).map(PathBuf::from) else {
        return PacerConfig::default();
    };
    match PacerConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            warn!(?path, error = %err, "ignoring unreadable pacer config");
            PacerConfig::default()
        }
    }
}
