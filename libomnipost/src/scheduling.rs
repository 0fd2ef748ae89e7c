//! Schedule string parsing
//!
//! Turns the human-friendly strings accepted by `--at` into concrete UTC
//! times: plain durations ("30m", "2h"), natural language ("tomorrow",
//! "next friday 9am"), and randomized offsets ("random:10m-2h") used to
//! space out queued posts.

use crate::{OmnipostError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

const MIN_RANDOM_SECONDS: i64 = 30;
const MAX_RANDOM_SECONDS: i64 = 30 * 24 * 3600; // 30 days

/// Parse a schedule string into a UTC time.
///
/// Accepted forms:
/// - Durations relative to now: "30m", "2h", "1 day"
/// - Natural language: "tomorrow", "next monday 10am", "2026-09-01 15:00"
/// - Random offsets: "random:MIN-MAX", offset from `last_scheduled` when
///   given so queued posts land after the queue tail instead of after now
///
/// # Errors
///
/// Returns `InvalidInput` when the string matches none of the accepted
/// forms or a random range is out of bounds.
pub fn parse_schedule(input: &str, last_scheduled: Option<i64>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(OmnipostError::InvalidInput(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    if let Some(range) = input.strip_prefix("random:") {
        return parse_random_schedule(range, last_scheduled);
    }

    if let Ok(duration) = parse_duration(input) {
        return Ok(Utc::now() + duration);
    }

    if let Ok(dt) = parse_natural_language(input) {
        return Ok(dt);
    }

    Err(OmnipostError::InvalidInput(format!(
        "Could not parse schedule string: {}",
        input
    )))
}

fn parse_duration(input: &str) -> Result<Duration> {
    let std_duration = humantime::parse_duration(input).map_err(|_| {
        OmnipostError::InvalidInput(format!("Could not parse duration: {}", input))
    })?;

    Duration::try_seconds(std_duration.as_secs() as i64)
        .ok_or_else(|| OmnipostError::InvalidInput("Duration out of range".to_string()))
}

fn parse_natural_language(input: &str) -> Result<DateTime<Utc>> {
    chrono_english::parse_date_string(input, Utc::now(), chrono_english::Dialect::Us)
        .map_err(|e| OmnipostError::InvalidInput(format!("Could not parse time: {}", e)))
}

/// "MIN-MAX" random offset, applied to the queue tail when one exists
fn parse_random_schedule(range: &str, last_scheduled: Option<i64>) -> Result<DateTime<Utc>> {
    let (min_str, max_str) = range.split_once('-').ok_or_else(|| {
        OmnipostError::InvalidInput("Random format must be random:MIN-MAX".to_string())
    })?;

    let min_secs = parse_duration(min_str)?.num_seconds();
    let max_secs = parse_duration(max_str)?.num_seconds();

    if min_secs < MIN_RANDOM_SECONDS {
        return Err(OmnipostError::InvalidInput(format!(
            "Minimum random interval must be at least {} seconds",
            MIN_RANDOM_SECONDS
        )));
    }
    if max_secs > MAX_RANDOM_SECONDS {
        return Err(OmnipostError::InvalidInput(format!(
            "Maximum random interval must be less than {} days",
            MAX_RANDOM_SECONDS / (24 * 3600)
        )));
    }
    if min_secs >= max_secs {
        return Err(OmnipostError::InvalidInput(
            "Minimum must be less than maximum".to_string(),
        ));
    }

    let base = match last_scheduled {
        Some(timestamp) => DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now),
        None => Utc::now(),
    };

    let offset_secs = rand::thread_rng().gen_range(min_secs..=max_secs);
    let offset = Duration::try_seconds(offset_secs)
        .ok_or_else(|| OmnipostError::InvalidInput("Duration out of range".to_string()))?;

    Ok(base + offset)
}
