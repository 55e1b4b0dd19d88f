use std::time::Duration;

/// Format a duration as HH:MM:SS, used in progress reports.
pub fn to_hms_string(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
