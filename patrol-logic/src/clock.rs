use crate::patrol::UtcDT;

/// Whole seconds between `start` and `now`, zero if `start` is in the future
pub fn elapsed_seconds(start: UtcDT, now: UtcDT) -> u32 {
    let millis = (now - start).num_milliseconds().max(0);
    u32::try_from(millis / 1000).unwrap_or(u32::MAX)
}

/// Format a number of seconds as `HH:MM:SS`
pub fn format_elapsed(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
