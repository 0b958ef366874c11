/// Timestamp layout used in the detection log.
pub const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Return the current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn local_now() -> String {
    chrono::Local::now().format(LOCAL_TIMESTAMP_FORMAT).to_string()
}
