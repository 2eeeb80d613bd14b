//! Database layer for notelock

mod connection;
mod migrations;
mod repository;
mod share_repository;
mod user_repository;

pub use connection::Database;
pub use repository::{NoteRepository, SqliteNoteRepository};
pub use share_repository::{ShareRepository, SqliteShareRepository};
pub use user_repository::{SqliteUserRepository, UserRepository};

use std::str::FromStr;

/// Parse a text column into a typed value, reporting failures as conversion errors
pub(crate) fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(error))
    })
}
