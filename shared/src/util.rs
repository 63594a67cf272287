use rand::Rng;
use rand::distributions::Alphanumeric;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Random alphanumeric token of `len` characters
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a batch correlation id: `{millis}-{6 random chars}`
///
/// Used when the caller does not supply its own batch id.
pub fn batch_id() -> String {
    format!("{}-{}", now_millis(), random_token(6).to_lowercase())
}

/// Truncate to at most `max` characters (not bytes)
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
