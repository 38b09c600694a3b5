use std::time::Duration;

/// Format an elapsed duration for the run summary: milliseconds below one
/// second, otherwise seconds with one decimal ("340ms", "3.4s").
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}
