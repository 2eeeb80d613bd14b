//! Input constraints applied before requests reach the stores

use std::time::Duration;

use crate::error::{Error, Result};

pub const USER_ID_MIN_LEN: usize = 3;
pub const USER_ID_MAX_LEN: usize = 64;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const TITLE_MAX_LEN: usize = 200;
pub const CONTENT_MAX_LEN: usize = 100_000;
/// Longest share lifetime: 30 days
pub const SHARE_TTL_MAX_MINUTES: u32 = 60 * 24 * 30;

pub fn validate_user_id(field: &str, value: &str) -> Result<()> {
    let len = value.chars().count();
    if !(USER_ID_MIN_LEN..=USER_ID_MAX_LEN).contains(&len) {
        return Err(Error::validation(format!(
            "{field} must be {USER_ID_MIN_LEN}-{USER_ID_MAX_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    {
        return Err(Error::validation(format!(
            "{field} may only contain letters, digits, `_`, `-` and `.`"
        )));
    }
    Ok(())
}

pub fn validate_password(value: &str) -> Result<()> {
    let len = value.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(Error::validation(format!(
            "password must be {PASSWORD_MIN_LEN}-{PASSWORD_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_title(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation("title must not be empty"));
    }
    if value.chars().count() > TITLE_MAX_LEN {
        return Err(Error::validation(format!(
            "title must be at most {TITLE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_content(value: &str) -> Result<()> {
    if value.chars().count() > CONTENT_MAX_LEN {
        return Err(Error::validation(format!(
            "content must be at most {CONTENT_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Convert an optional share lifetime in minutes into a duration
pub fn share_ttl(minutes: Option<u32>) -> Result<Option<Duration>> {
    match minutes {
        None => Ok(None),
        Some(m) if (1..=SHARE_TTL_MAX_MINUTES).contains(&m) => {
            Ok(Some(Duration::from_secs(u64::from(m) * 60)))
        }
        Some(_) => Err(Error::validation(format!(
            "ttl_minutes must be in [1, {SHARE_TTL_MAX_MINUTES}]"
        ))),
    }
}
