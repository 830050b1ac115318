//! ### English
//! Telemetry cursor over `FrameStatsStorage`.
//!
//! ### 中文
//! `FrameStatsStorage` 上的遥测游标。

use std::sync::Arc;

use tracing::warn;

use super::{FrameRecord, FrameStatsStorage};

/// ### English
/// Yields each completed frame record once, oldest first, starting from the moment the reader was
/// created.
///
/// Underrun policy: if the reader falls a full ring revolution behind (or a slot is reused while
/// being copied), it skips to the oldest record whose slot can still be intact
/// (`last_started - capacity + 1`), counts the skipped records in `dropped()` and logs a warning.
/// Records newer than that are still delivered.
///
/// ### 中文
/// 从创建时刻起，按从旧到新的顺序逐一产出每条已完成的帧记录（每条仅一次）。
///
/// 下溢策略：若读者落后一整圈（或拷贝期间槽位被复用），跳到槽位仍可能完好的最旧记录
/// （`last_started - capacity + 1`），跳过的记录计入 `dropped()` 并记录一条警告；
/// 更新的记录仍会正常产出。
pub struct FrameStatsReader {
    storage: Arc<FrameStatsStorage>,
    /// ### English
    /// Last frame id handed out (or the confirmed id at creation).
    ///
    /// ### 中文
    /// 最近产出的帧 ID（或创建时的已确认 ID）。
    cursor: u64,
    dropped: u64,
}

impl FrameStatsReader {
    pub(super) fn new(storage: Arc<FrameStatsStorage>) -> Self {
        let cursor = storage.last_confirmed();
        Self {
            storage,
            cursor,
            dropped: 0,
        }
    }

    /// ### English
    /// Non-blocking poll for the next completed record.
    ///
    /// ### 中文
    /// 非阻塞地获取下一条已完成记录。
    pub fn next_record(&mut self) -> Option<FrameRecord> {
        let confirmed = self.storage.last_confirmed();
        while self.cursor < confirmed {
            if self.cursor + 1 < self.oldest_intact() {
                self.resync(confirmed);
                continue;
            }

            let frame_id = self.cursor + 1;
            if let Some(record) = self.storage.load_record(frame_id) {
                self.cursor = frame_id;
                return Some(record);
            }
            self.resync(confirmed);
        }
        None
    }

    /// ### English
    /// Number of completed records not yet consumed by this reader.
    ///
    /// ### 中文
    /// 本读者尚未消费的已完成记录数。
    #[inline]
    pub fn lag(&self, confirmed: u64) -> u64 {
        confirmed - self.cursor
    }

    #[inline]
    pub fn pending(&self) -> u64 {
        self.lag(self.storage.last_confirmed())
    }

    /// ### English
    /// Total records skipped because of underruns.
    ///
    /// ### 中文
    /// 因下溢而跳过的记录总数。
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    #[inline]
    pub fn storage(&self) -> &Arc<FrameStatsStorage> {
        &self.storage
    }

    /// ### English
    /// Oldest frame id whose slot has not been claimed by a newer start.
    ///
    /// ### 中文
    /// 槽位尚未被更新的帧占用的最旧帧 ID。
    #[inline]
    fn oldest_intact(&self) -> u64 {
        self.storage
            .last_started()
            .saturating_sub(self.storage.capacity())
            + 1
    }

    /// ### English
    /// Skips past records whose slots may have been reused. Always advances by at least one.
    ///
    /// ### 中文
    /// 跳过槽位可能已被复用的记录；每次至少前进一条。
    fn resync(&mut self, confirmed: u64) {
        let capacity = self.storage.capacity();
        let cursor = (self.oldest_intact() - 1).clamp(self.cursor + 1, confirmed);
        let lost = cursor - self.cursor;
        warn!(
            cursor = self.cursor,
            confirmed,
            lost,
            capacity,
            "frame stats reader underrun, skipping overwritten records"
        );
        self.dropped += lost;
        self.cursor = cursor;
    }
}
