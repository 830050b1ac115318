use super::{FrameRecord, FrameStatsReader};

/// ### English
/// Running latency/frametime aggregate fed from a `FrameStatsReader`.
///
/// ### 中文
/// 由 `FrameStatsReader` 喂入的延迟/帧间隔累计统计。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub count: u64,
    pub min_latency_micros: Option<u32>,
    pub max_latency_micros: Option<u32>,
    pub last_latency_micros: Option<u32>,
    pub last_frametime_micros: Option<u32>,
    total_latency_micros: u64,
}

impl LatencySummary {
    pub fn record(&mut self, record: &FrameRecord) {
        let latency = record.latency_micros;
        self.count += 1;
        self.total_latency_micros += u64::from(latency);
        self.min_latency_micros = Some(self.min_latency_micros.map_or(latency, |m| m.min(latency)));
        self.max_latency_micros = Some(self.max_latency_micros.map_or(latency, |m| m.max(latency)));
        self.last_latency_micros = Some(latency);
        self.last_frametime_micros = Some(record.frametime_micros);
    }

    /// ### English
    /// Drains every record currently available from `reader`. Returns how many were consumed.
    ///
    /// ### 中文
    /// 取走 `reader` 当前可用的全部记录，返回消费的条数。
    pub fn drain(&mut self, reader: &mut FrameStatsReader) -> usize {
        let mut drained = 0;
        while let Some(record) = reader.next_record() {
            self.record(&record);
            drained += 1;
        }
        drained
    }

    pub fn mean_latency_micros(&self) -> Option<u32> {
        (self.count > 0).then(|| (self.total_latency_micros / self.count) as u32)
    }
}
