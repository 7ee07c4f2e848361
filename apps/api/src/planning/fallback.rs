//! Deterministic fallback schedule generation.
//!
//! Used whenever model output cannot be trusted — and again later by the
//! repair endpoint — so it must be pure: the same inputs always produce
//! the same schedule.

use chrono::NaiveDate;

use crate::models::plan::{Schedule, ScheduleBlock};

/// Non-off days start studying at 09:00.
const DEFAULT_START_HOUR: u32 = 9;
/// Blocks are 2 hours, or whatever budget remains below that.
const BLOCK_HOURS: u32 = 2;
/// The daily budget is clamped to a day's worth of hours; larger form
/// values would otherwise allocate unbounded blocks.
const MAX_DAY_HOURS: u32 = 24;

/// Builds a simple day-by-day schedule with no AI involvement.
///
/// Every date from `start_date` to `end_date` inclusive gets exactly one
/// entry. A day is "off" when its English weekday name is in `off_days`
/// (case-sensitive) or the set contains the sentinel "all"; off days map
/// to an empty block list. Otherwise sequential blocks are allocated from
/// 09:00, round-robin over `subjects` with wrap-around, until the daily
/// hour budget runs out or there are no subjects.
///
/// `hours_per_day` arrives as the raw form value; when it does not parse
/// as a non-negative integer, each study day falls back further to a
/// single fixed 09:00–12:00 block for the first subject ("Study" if the
/// subject list is empty). Parsed values are clamped to 24 hours.
pub fn generate_fallback_schedule(
    start_date: NaiveDate,
    end_date: NaiveDate,
    hours_per_day: &str,
    subjects: &[String],
    off_days: &[String],
) -> Schedule {
    let mut schedule = Schedule::new();
    let hours = hours_per_day
        .trim()
        .parse::<u32>()
        .ok()
        .map(|h| h.min(MAX_DAY_HOURS));
    let all_off = off_days.iter().any(|d| d == "all");

    let mut current = start_date;
    while current <= end_date {
        let date_str = current.format("%Y-%m-%d").to_string();
        let weekday = current.format("%A").to_string();

        let blocks = if all_off || off_days.iter().any(|d| *d == weekday) {
            Vec::new()
        } else {
            day_blocks(hours, subjects)
        };
        schedule.insert(date_str, blocks);

        current = match current.succ_opt() {
            Some(next) => next,
            None => break, // end of calendar
        };
    }

    schedule
}

fn day_blocks(hours: Option<u32>, subjects: &[String]) -> Vec<ScheduleBlock> {
    let Some(hours) = hours else {
        // Invalid hour budget: one fixed default block.
        let subject = subjects
            .first()
            .cloned()
            .unwrap_or_else(|| "Study".to_string());
        return vec![ScheduleBlock {
            start_time: "09:00".to_string(),
            end_time: "12:00".to_string(),
            subject,
            task: "General study session".to_string(),
        }];
    };

    let mut blocks = Vec::new();
    let mut remaining = hours;
    let mut start_hour = DEFAULT_START_HOUR;
    let mut subject_index = 0;

    while remaining > 0 && !subjects.is_empty() {
        let block_hours = remaining.min(BLOCK_HOURS);
        let subject = subjects[subject_index].clone();

        blocks.push(ScheduleBlock {
            start_time: format!("{start_hour:02}:00"),
            end_time: format!("{:02}:00", start_hour + block_hours),
            task: format!("Study {subject}"),
            subject,
        });

        start_hour += block_hours;
        remaining -= block_hours;
        subject_index = (subject_index + 1) % subjects.len();
    }

    blocks
}
