//! User repository implementation

use crate::error::{Error, Result};
use crate::models::User;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

/// Trait for account storage operations
pub trait UserRepository {
    /// Persist a new account; fails `UserExists` on a duplicate id
    fn insert(&self, user: &User) -> Result<()>;

    /// Get an account by id
    fn get(&self, user_id: &str) -> Result<Option<User>>;
}

/// `SQLite` implementation of `UserRepository`
pub struct SqliteUserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteUserRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn insert(&self, user: &User) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO users (user_id, password_hash, created_at) VALUES (?, ?, ?)",
            params![user.user_id, user.password_hash, user.created_at],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::UserExists(user.user_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, user_id: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT user_id, password_hash, created_at FROM users WHERE user_id = ?",
                params![user_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        password_hash: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}
