use chrono::{DateTime, FixedOffset, Timelike, Utc};
use tenko_protocol::messages::StagePair;

// --- Stage 1 window, local time ---
// Stage 1 runs from NIGHT_START_HOUR:00 until NIGHT_END (exclusive), stage 2 the rest of the day.
const NIGHT_START_HOUR: u32 = 22;
const NIGHT_END: (u32, u32) = (4, 30); // (hour, minute)

/// Local time of the boiler site: UTC shifted by a fixed offset, no DST.
pub fn local_time(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    now.with_timezone(&offset)
}

/// Stages for a local wall-clock time.
pub fn stages_for(hour: u32, minute: u32) -> StagePair {
    let (end_hour, end_minute) = NIGHT_END;
    // Keep every arm, including the redundant `hour > NIGHT_START_HOUR`; any minute of the
    // start hour counts.
    let stage_1_on = hour > NIGHT_START_HOUR
        || hour < end_hour
        || hour == NIGHT_START_HOUR
        || (hour == end_hour && minute < end_minute);
    StagePair::complementary(stage_1_on)
}

pub fn stages_at(now: DateTime<Utc>, offset: FixedOffset) -> StagePair {
    let local = local_time(now, offset);
    stages_for(local.hour(), local.minute())
}
