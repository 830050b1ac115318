use std::ptr;
use std::sync::Arc;

use tracing::warn;

use super::{
    CallbackSubmitter, CallbackWaiter, FFI_CONTEXT, FramePacer, FramePacerCallbacks, UserData,
};
use crate::engine::{
    DeviceHandle, PacerError, PresentDescriptor, PresentOutcome, Presenter, QueueHandle,
    SurfaceHandle,
};

/// ### English
/// Result code returned by `frame_pacer_present` when the call itself is invalid
/// (NULL pacer).
///
/// ### 中文
/// 调用本身无效（pacer 为 NULL）时 `frame_pacer_present` 的返回码。
pub const FRAME_PACER_ERROR_INVALID_HANDLE: i32 = i32::MIN;

/// ### English
/// Result code returned by `frame_pacer_present` when the pacer rejects the present itself
/// (the backend was not called).
///
/// ### 中文
/// pacer 拒绝本次 present（未调用后端）时 `frame_pacer_present` 的返回码。
pub const FRAME_PACER_ERROR_REJECTED: i32 = i32::MIN + 1;

#[unsafe(no_mangle)]
/// ### English
/// Creates the process's pacer and starts its present-wait thread.
///
/// Returns NULL if a pacer already exists, a callback is missing or the thread cannot be spawned.
///
/// #### Parameters
/// - `callbacks`: Present and present-wait calls; copied, the pointer need not outlive the call.
/// - `render_ahead_limit`: Initial limit; negative disables throttling.
///
/// ### 中文
/// 创建进程内的 pacer 并启动其 present-wait 线程。
///
/// 若 pacer 已存在、缺少回调或线程创建失败，则返回 NULL。
///
/// #### 参数
/// - `callbacks`：present 与 present-wait 调用；会被拷贝，指针无需在调用后继续有效。
/// - `render_ahead_limit`：初始上限；负数表示关闭节流。
pub unsafe extern "C" fn frame_pacer_create(
    callbacks: *const FramePacerCallbacks,
    render_ahead_limit: i8,
) -> *mut FramePacer {
    if callbacks.is_null() {
        return ptr::null_mut();
    }
    let callbacks = unsafe { &*callbacks };
    let (Some(submit), Some(wait_for_present)) = (callbacks.submit, callbacks.wait_for_present)
    else {
        warn!("frame_pacer_create called without both callbacks");
        return ptr::null_mut();
    };

    let user_data = UserData(callbacks.user_data);
    let submitter = CallbackSubmitter { user_data, submit };
    let waiter = Arc::new(CallbackWaiter {
        user_data,
        wait_for_present,
    });

    match Presenter::new(&FFI_CONTEXT, submitter, waiter) {
        Ok(presenter) => {
            presenter.set_render_ahead_limit(render_ahead_limit);
            Box::into_raw(Box::new(FramePacer { presenter }))
        }
        Err(err) => {
            warn!(error = %err, "frame_pacer_create failed");
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a pacer created by `frame_pacer_create`.
///
/// Stops and joins the present-wait thread. Readers created from this pacer stay valid and simply
/// stop receiving records.
///
/// ### 中文
/// 销毁由 `frame_pacer_create` 创建的 pacer。
///
/// 会停止并 join present-wait 线程；由该 pacer 创建的读者仍然有效，只是不再收到新记录。
pub unsafe extern "C" fn frame_pacer_destroy(pacer: *mut FramePacer) {
    if pacer.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(pacer));
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Presents one image through the embedder's submit callback, pacing per the render-ahead limit.
///
/// Returns the submit callback's result code unchanged, `FRAME_PACER_ERROR_INVALID_HANDLE` for a
/// NULL pacer, or `FRAME_PACER_ERROR_REJECTED` if the pacer refused the present.
/// Concurrent calls are serialized; the limit setter and reader functions may run meanwhile.
///
/// ### 中文
/// 通过宿主的 submit 回调 present 一张图像，并按预渲染上限控制节奏。
///
/// 原样返回 submit 回调的结果码；pacer 为 NULL 时返回 `FRAME_PACER_ERROR_INVALID_HANDLE`；
/// pacer 拒绝本次 present 时返回 `FRAME_PACER_ERROR_REJECTED`。
/// 并发调用会被串行化；期间可以调用上限设置与读者函数。
pub unsafe extern "C" fn frame_pacer_present(
    pacer: *const FramePacer,
    queue: u64,
    device: u64,
    surface: u64,
    image_index: u32,
) -> i32 {
    if pacer.is_null() {
        return FRAME_PACER_ERROR_INVALID_HANDLE;
    }
    let pacer = unsafe { &*pacer };
    let descriptor = PresentDescriptor::single(SurfaceHandle(surface), image_index);
    present_result_code(pacer.presenter.present(
        QueueHandle(queue),
        &descriptor,
        DeviceHandle(device),
    ))
}

#[inline]
fn present_result_code(result: Result<PresentOutcome, PacerError>) -> i32 {
    match result {
        Ok(outcome) => outcome.0,
        Err(err) => {
            warn!(error = %err, "frame_pacer_present rejected");
            FRAME_PACER_ERROR_REJECTED
        }
    }
}

#[unsafe(no_mangle)]
/// ### English
/// Changes the render-ahead limit; takes effect on the next present. Callable from any thread.
///
/// ### 中文
/// 修改预渲染上限，在下一次 present 生效；可在任意线程调用。
pub unsafe extern "C" fn frame_pacer_set_render_ahead_limit(pacer: *const FramePacer, limit: i8) {
    if pacer.is_null() {
        return;
    }
    unsafe { (*pacer).presenter.set_render_ahead_limit(limit) };
}
