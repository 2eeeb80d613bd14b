//! notelock-core - Core library for notelock
//!
//! Collaborative note editing without lost updates: a note has at most one
//! active editor at a time, mediated by leased locks, and every accepted
//! write bumps the note's version by exactly one. Owners can grant read-only
//! or read-write shares and revoke them, which immediately invalidates any
//! lock held through the share.

pub mod accounts;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod locks;
pub mod models;
pub mod notes;
pub mod service;
pub mod shares;
pub mod util;
pub mod validation;

pub use accounts::Accounts;
pub use coordinator::{NoteEdit, WriteCoordinator};
pub use error::{Error, Result};
pub use locks::LockManager;
pub use models::{Lock, LockTarget, LockToken, Note, NoteId, Share, ShareId, ShareMode, User};
pub use notes::NoteStore;
pub use service::NoteService;
pub use shares::ShareManager;
