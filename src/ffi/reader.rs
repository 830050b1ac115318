use std::ptr;

use super::{FramePacer, FramePacerFrameStats, FramePacerReader};

#[unsafe(no_mangle)]
/// ### English
/// Creates a telemetry reader positioned at the pacer's newest confirmed frame.
///
/// The reader is independent from the pacer's lifetime and must be released with
/// `frame_pacer_reader_destroy`.
///
/// ### 中文
/// 创建遥测读者，初始位置为 pacer 最新确认的帧。
///
/// 读者生命周期独立于 pacer，必须通过 `frame_pacer_reader_destroy` 释放。
pub unsafe extern "C" fn frame_pacer_reader_create(
    pacer: *const FramePacer,
) -> *mut FramePacerReader {
    if pacer.is_null() {
        return ptr::null_mut();
    }
    let reader = unsafe { (*pacer).presenter.reader() };
    Box::into_raw(Box::new(FramePacerReader { reader }))
}

#[unsafe(no_mangle)]
/// ### English
/// Non-blocking poll for the next completed frame.
///
/// Returns `true` and fills `out` when a record was available. A reader handle belongs to one
/// thread at a time; create one reader per consuming thread.
///
/// ### 中文
/// 非阻塞地获取下一条已完成帧。
///
/// 有记录时填充 `out` 并返回 `true`。同一读者句柄同一时间只能由一个线程使用；
/// 每个消费线程应各自创建读者。
pub unsafe extern "C" fn frame_pacer_reader_next(
    reader: *mut FramePacerReader,
    out: *mut FramePacerFrameStats,
) -> bool {
    if reader.is_null() || out.is_null() {
        return false;
    }
    let reader = unsafe { &mut *reader };
    let Some(record) = reader.reader.next_record() else {
        return false;
    };
    let epoch = reader.reader.storage().epoch();
    unsafe { out.write(FramePacerFrameStats::from_record(&record, epoch)) };
    true
}

#[unsafe(no_mangle)]
/// ### English
/// Returns how many records this reader skipped because it fell a full ring behind.
///
/// ### 中文
/// 返回该读者因落后一整圈而跳过的记录数。
pub unsafe extern "C" fn frame_pacer_reader_dropped(reader: *const FramePacerReader) -> u64 {
    if reader.is_null() {
        return 0;
    }
    unsafe { (*reader).reader.dropped() }
}

#[unsafe(no_mangle)]
/// ### English
/// Destroys a reader created by `frame_pacer_reader_create`.
///
/// ### 中文
/// 销毁由 `frame_pacer_reader_create` 创建的读者。
pub unsafe extern "C" fn frame_pacer_reader_destroy(reader: *mut FramePacerReader) {
    if reader.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(reader));
    }
}
