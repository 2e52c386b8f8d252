// libs/schedule-cell/src/services/generator.rs
use chrono::{DateTime, Duration, Utc, Datelike};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    CandidateSlot, ScheduleError, SlotGenerationOutcome, SlotGenerationRequest, SlotStatus,
};

/// Expand a recurring availability pattern into discrete candidate slots.
///
/// Pure: no store access, deterministic for a fixed `now`. `now` is the
/// caller's wall-clock reference so tests can pin it. Candidates whose start
/// lies at or before `now` are counted in `skipped_past_count` instead of
/// being emitted. Output is ordered by date, then start time.
pub fn generate_slots(
    schedule_id: Uuid,
    pattern: &SlotGenerationRequest,
    now: DateTime<Utc>,
) -> Result<SlotGenerationOutcome, ScheduleError> {
    validate_pattern(pattern)?;

    debug!(
        "Generating slots for schedule {} over {}..={}",
        schedule_id, pattern.range_start, pattern.range_end
    );

    let duration = Duration::minutes(pattern.slot_duration_minutes);
    let mut candidates = Vec::new();
    let mut skipped_past_count = 0usize;
    let mut matched_weekday = false;

    let mut day = pattern.range_start;
    while day <= pattern.range_end {
        let weekday = day.weekday().num_days_from_sunday() as u8;
        if pattern.allowed_weekdays.contains(&weekday) {
            matched_weekday = true;

            let day_end = day.and_time(pattern.daily_end);
            let mut cursor = day.and_time(pattern.daily_start);

            loop {
                let slot_end = cursor + duration;
                // No partial trailing slot
                if slot_end > day_end {
                    break;
                }

                // Any intersection with the break window excludes the slot,
                // not just full containment
                let overlaps_break = pattern.break_window.as_ref().is_some_and(|bw| {
                    let break_start = day.and_time(bw.start);
                    let break_end = day.and_time(bw.end);
                    cursor < break_end && slot_end > break_start
                });

                if !overlaps_break {
                    if cursor.and_utc() <= now {
                        skipped_past_count += 1;
                    } else {
                        candidates.push(CandidateSlot {
                            schedule_id,
                            start_time: cursor.and_utc(),
                            end_time: slot_end.and_utc(),
                            status: SlotStatus::Free,
                        });
                    }
                }

                cursor = slot_end;
            }
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    if !matched_weekday {
        return Err(ScheduleError::Validation(
            "no day in the requested range falls on an allowed weekday".to_string(),
        ));
    }

    if candidates.is_empty() {
        return Err(if skipped_past_count > 0 {
            ScheduleError::Validation(format!(
                "no bookable slots remain: all {} producible slot(s) start in the past",
                skipped_past_count
            ))
        } else {
            ScheduleError::Validation(
                "time window, slot duration and break window produced no usable slots".to_string(),
            )
        });
    }

    debug!(
        "Generated {} candidate slots ({} skipped as past)",
        candidates.len(),
        skipped_past_count
    );

    Ok(SlotGenerationOutcome {
        candidates,
        skipped_past_count,
    })
}

fn validate_pattern(pattern: &SlotGenerationRequest) -> Result<(), ScheduleError> {
    if pattern.range_start > pattern.range_end {
        return Err(ScheduleError::Validation(
            "date range start must not be after range end".to_string(),
        ));
    }

    if pattern.daily_start >= pattern.daily_end {
        return Err(ScheduleError::Validation(
            "daily start time must be before daily end time".to_string(),
        ));
    }

    if pattern.slot_duration_minutes <= 0 {
        return Err(ScheduleError::Validation(
            "slot duration must be a positive number of minutes".to_string(),
        ));
    }

    if pattern.allowed_weekdays.is_empty() {
        return Err(ScheduleError::Validation(
            "at least one weekday must be allowed".to_string(),
        ));
    }

    if pattern.allowed_weekdays.iter().any(|d| *d > 6) {
        return Err(ScheduleError::Validation(
            "weekday values must be between 0 (Sunday) and 6 (Saturday)".to_string(),
        ));
    }

    if let Some(bw) = &pattern.break_window {
        if bw.start >= bw.end {
            return Err(ScheduleError::Validation(
                "break window start must be before its end".to_string(),
            ));
        }
    }

    Ok(())
}
