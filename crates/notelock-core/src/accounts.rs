//! Account registration and password verification

use std::sync::{Arc, OnceLock};

use rand::RngCore;

use crate::db::{Database, SqliteUserRepository, UserRepository};
use crate::error::{Error, Result};
use crate::models::User;
use crate::util::{unix_millis_now, user_fingerprint};
use crate::validation::{validate_password, validate_user_id};

const SALT_LEN: usize = 16;
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const DUMMY_PASSWORD: &str = "notelock-absent-user";

/// Registers users and checks their passwords
pub struct Accounts {
    db: Arc<Database>,
}

impl Accounts {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create an account; the password is stored only as an Argon2id hash
    pub fn register(&self, user_id: &str, password: &str) -> Result<User> {
        validate_user_id("user_id", user_id)?;
        validate_password(password)?;

        let user = User {
            user_id: user_id.to_string(),
            password_hash: hash_password(password)?,
            created_at: unix_millis_now(),
        };
        SqliteUserRepository::new(&self.db.connection()).insert(&user)?;
        tracing::info!(user = user_fingerprint(user_id), "User registered");
        Ok(user)
    }

    /// Verify credentials
    ///
    /// Unknown users and wrong passwords fail with the same message.
    pub fn authenticate(&self, user_id: &str, password: &str) -> Result<User> {
        let found = SqliteUserRepository::new(&self.db.connection()).get(user_id)?;
        let Some(user) = found else {
            // Match the Argon2 cost of checking a known user
            verify_password(password, dummy_hash());
            return Err(Error::Auth(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user = user_fingerprint(user_id), "Password mismatch");
            return Err(Error::Auth(INVALID_CREDENTIALS.to_string()));
        }
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let config = argon2::Config {
        variant: argon2::Variant::Argon2id,
        version: argon2::Version::Version13,
        ..argon2::Config::default()
    };
    argon2::hash_encoded(password.as_bytes(), &salt, &config)
        .map_err(|error| Error::Internal(format!("password hashing failed: {error}")))
}

/// Hash checked for unknown users, built with the same parameters as real ones
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password(DUMMY_PASSWORD).unwrap_or_default())
}

fn verify_password(password: &str, encoded: &str) -> bool {
    argon2::verify_encoded(encoded, password.as_bytes()).unwrap_or(false)
}
