//! Lease-based exclusive locks over note and share targets
//!
//! At most one live lock exists per [`LockTarget`]. Each target has its own
//! slot behind its own mutex, so operations on unrelated targets never wait
//! on each other; the outer map is only held long enough to find a slot.
//! Expiry is evaluated lazily whenever a slot is touched.
//!
//! Lock order: slot map, then a target slot, then the token index. Nothing
//! acquires the slot map while holding a target slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::models::{Lock, LockTarget, LockToken};
use crate::util::user_fingerprint;

type Slot = Arc<Mutex<Option<Lock>>>;

/// Tracks the single live lock per target
pub struct LockManager {
    lease: Duration,
    slots: Mutex<HashMap<LockTarget, Slot>>,
    tokens: Mutex<HashMap<LockToken, LockTarget>>,
}

impl LockManager {
    /// Create a manager whose locks live for `lease` unless renewed
    pub fn new(lease: Duration) -> Self {
        Self {
            lease,
            slots: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub const fn lease(&self) -> Duration {
        self.lease
    }

    /// Run `f` with exclusive access to `target`'s slot
    ///
    /// Everything `f` does is one critical section for that target: callers
    /// use this to keep a lock check and the action it guards together.
    pub fn with_target<T>(
        &self,
        target: LockTarget,
        f: impl FnOnce(&mut TargetSlot<'_>) -> T,
    ) -> T {
        let slot = self.slot(target);
        let result = {
            let mut lock = slot.lock();
            let mut guard = TargetSlot {
                manager: self,
                target,
                lock: &mut *lock,
            };
            f(&mut guard)
        };
        self.prune(target, &slot);
        result
    }

    /// Acquire or renew a lock on `target` for `requester`
    pub fn acquire(&self, target: LockTarget, requester: &str) -> Result<Lock> {
        self.with_target(target, |slot| slot.acquire(requester))
    }

    /// Release the lock identified by `token`
    pub fn release(&self, token: LockToken, requester: &str) -> Result<()> {
        let target = self
            .tokens
            .lock()
            .get(&token)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("lock {token}")))?;
        self.with_target(target, |slot| slot.release(token, requester))
    }

    /// Release whatever live lock `requester` holds on `target`
    pub fn release_target(&self, target: LockTarget, requester: &str) -> Result<()> {
        self.with_target(target, |slot| slot.release_held(requester))
    }

    /// Check that `token` is live on `target`, returning the holder
    pub fn validate(&self, token: LockToken, target: LockTarget) -> Result<String> {
        self.with_target(target, |slot| slot.validate(token))
    }

    /// Tear down any live lock on `target` regardless of holder
    pub fn invalidate(&self, target: LockTarget) -> Option<Lock> {
        self.with_target(target, |slot| slot.invalidate())
    }

    /// The live lock on `target`, if any
    pub fn current(&self, target: LockTarget) -> Option<Lock> {
        self.with_target(target, |slot| slot.current().cloned())
    }

    /// Drop locks that lapsed at least one lease ago, with their slots
    ///
    /// Expiry is otherwise only noticed when a target is touched again, so an
    /// abandoned lock would keep its slot and token entry indefinitely.
    /// Recently lapsed locks are kept so their holder still sees
    /// `LockExpired` rather than `NotFound`. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| {
            // In use by a caller right now
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let mut lock = slot.lock();
            let keep = lock
                .as_ref()
                .is_some_and(|held| self.expiry_from(held.expires_at) > now);
            if !keep {
                if let Some(lapsed) = lock.take() {
                    self.forget(&lapsed.token);
                }
            }
            keep
        });
        let swept = before - slots.len();
        if swept > 0 {
            tracing::debug!(swept, "Swept abandoned lock slots");
        }
        swept
    }

    fn slot(&self, target: LockTarget) -> Slot {
        self.slots.lock().entry(target).or_default().clone()
    }

    /// Drop an empty slot nobody else is using
    fn prune(&self, target: LockTarget, slot: &Slot) {
        let mut slots = self.slots.lock();
        // Clones are only handed out under the map lock: map + ours == 2
        if Arc::strong_count(slot) == 2 && slot.lock().is_none() {
            slots.remove(&target);
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.lease)
            .ok()
            .and_then(|lease| now.checked_add_signed(lease))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn remember(&self, token: LockToken, target: LockTarget) {
        self.tokens.lock().insert(token, target);
    }

    fn forget(&self, token: &LockToken) {
        self.tokens.lock().remove(token);
    }
}

/// Exclusive view of one target's lock state
pub struct TargetSlot<'a> {
    manager: &'a LockManager,
    target: LockTarget,
    lock: &'a mut Option<Lock>,
}

impl TargetSlot<'_> {
    pub const fn target(&self) -> LockTarget {
        self.target
    }

    /// The live lock, clearing it first if its lease has passed
    pub fn current(&mut self) -> Option<&Lock> {
        self.clear_if_expired(Utc::now());
        self.lock.as_ref()
    }

    /// Acquire the target for `requester`
    ///
    /// Re-acquisition by the current holder renews the lease and returns the
    /// same token.
    pub fn acquire(&mut self, requester: &str) -> Result<Lock> {
        let now = Utc::now();
        self.clear_if_expired(now);
        let expires_at = self.manager.expiry_from(now);

        if let Some(lock) = self.lock.as_mut() {
            if lock.holder != requester {
                tracing::debug!(
                    target_id = %self.target,
                    requester = user_fingerprint(requester),
                    "Lock acquisition rejected"
                );
                return Err(Error::AlreadyLocked(self.target.to_string()));
            }
            lock.expires_at = expires_at;
            tracing::debug!(
                target_id = %self.target,
                holder = user_fingerprint(requester),
                %expires_at,
                "Lock lease renewed"
            );
            return Ok(lock.clone());
        }

        let lock = Lock {
            token: LockToken::new(),
            target: self.target,
            holder: requester.to_string(),
            acquired_at: now,
            expires_at,
        };
        self.manager.remember(lock.token, self.target);
        tracing::info!(
            target_id = %self.target,
            holder = user_fingerprint(requester),
            %expires_at,
            "Lock acquired"
        );
        *self.lock = Some(lock.clone());
        Ok(lock)
    }

    /// Release the lock identified by `token`
    pub fn release(&mut self, token: LockToken, requester: &str) -> Result<()> {
        let now = Utc::now();
        match self.lock.as_ref() {
            Some(lock) if lock.token == token => {
                if !lock.is_live_at(now) {
                    self.clear();
                    return Err(Error::LockExpired(token.to_string()));
                }
                if lock.holder != requester {
                    return Err(Error::LockNotOwned(token.to_string()));
                }
                self.clear();
                tracing::info!(
                    target_id = %self.target,
                    holder = user_fingerprint(requester),
                    "Lock released"
                );
                Ok(())
            }
            _ => Err(self.unknown_token(token)),
        }
    }

    /// Release the live lock if `requester` holds it
    pub fn release_held(&mut self, requester: &str) -> Result<()> {
        let target = self.target;
        let token = self
            .current()
            .map(|lock| lock.token)
            .ok_or_else(|| Error::NotFound(format!("lock on {target}")))?;
        self.release(token, requester)
    }

    /// Check `token` is the live lock on this target and return its holder
    pub fn validate(&mut self, token: LockToken) -> Result<String> {
        let now = Utc::now();
        match self.lock.as_ref() {
            Some(lock) if lock.token == token => {
                if lock.is_live_at(now) {
                    Ok(lock.holder.clone())
                } else {
                    self.clear();
                    Err(Error::LockExpired(token.to_string()))
                }
            }
            _ => Err(self.unknown_token(token)),
        }
    }

    /// Remove any lock on this target regardless of holder
    ///
    /// The holder is not notified; their next validation fails.
    pub fn invalidate(&mut self) -> Option<Lock> {
        let removed = self.lock.take();
        if let Some(lock) = removed.as_ref() {
            self.manager.forget(&lock.token);
            tracing::info!(
                target_id = %self.target,
                holder = user_fingerprint(&lock.holder),
                "Lock invalidated"
            );
        }
        removed
    }

    fn clear(&mut self) {
        if let Some(lock) = self.lock.take() {
            self.manager.forget(&lock.token);
        }
    }

    fn clear_if_expired(&mut self, now: DateTime<Utc>) {
        if self.lock.as_ref().is_some_and(|lock| !lock.is_live_at(now)) {
            tracing::debug!(target_id = %self.target, "Lock lease lapsed");
            self.clear();
        }
    }

    /// Classify a token that is not this target's current lock
    fn unknown_token(&self, token: LockToken) -> Error {
        match self.manager.tokens.lock().get(&token) {
            Some(other) if *other != self.target => Error::LockMismatch(format!(
                "lock {token} was issued for a different target"
            )),
            _ => Error::NotFound(format!("lock {token}")),
        }
    }
}
