//! Per-user request locks
//!
//! At most one request per client id is processed at a time; later requests
//! for the same id block until the earlier one releases its guard.

use std::collections::HashSet;

use parking_lot::{Condvar, Mutex};

/// Set of client ids with a request in flight
#[derive(Debug, Default)]
pub struct UserLocks {
    active: Mutex<HashSet<u32>>,
    released: Condvar,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `client_id` is free, then claim it
    pub fn lock(&self, client_id: u32) -> UserGuard<'_> {
        let mut active = self.active.lock();
        while active.contains(&client_id) {
            tracing::debug!("Client {} busy, waiting", client_id);
            self.released.wait(&mut active);
        }
        active.insert(client_id);

        UserGuard {
            locks: self,
            client_id,
        }
    }

    /// Whether a request for `client_id` is in flight
    pub fn is_locked(&self, client_id: u32) -> bool {
        self.active.lock().contains(&client_id)
    }
}

/// Releases the client id when dropped
#[derive(Debug)]
pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    client_id: u32,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.locks.active.lock().remove(&self.client_id);
        self.locks.released.notify_all();
    }
}
