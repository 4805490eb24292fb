pub mod logging;

/// Milliseconds since the Unix epoch, the unit persisted in `first_seen_timestamps`.
pub fn epoch_ms_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
