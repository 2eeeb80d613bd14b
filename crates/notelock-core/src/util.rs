//! Shared utility functions used across multiple modules.

use std::hash::{Hash, Hasher};

/// Stable-per-process fingerprint of a user id for log fields.
pub fn user_fingerprint(user_id: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(user_fingerprint("alice"), user_fingerprint("alice"));
        assert_ne!(user_fingerprint("alice"), user_fingerprint("bob"));
    }
}
