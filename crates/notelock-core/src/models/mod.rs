//! Data models for notelock

mod lock;
mod note;
mod share;
mod user;

pub use lock::{Lock, LockTarget, LockToken};
pub use note::{Note, NoteId};
pub use share::{Share, ShareId, ShareMode};
pub use user::User;
