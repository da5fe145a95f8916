//! In-memory presence registry.
//!
//! Clients heartbeat while they have a match open; an entry younger than the
//! TTL answers "is player X currently connected to match Y" for the clock
//! driver negotiation and the sweep.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub struct PresenceRegistry {
    ttl: Duration,
    seen: RwLock<HashMap<(i64, i64), Instant>>,
}

impl PresenceRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: RwLock::new(HashMap::new()),
        }
    }

    pub fn heartbeat(&self, match_id: i64, player_id: i64) {
        let mut seen = self.seen.write().unwrap();
        seen.insert((match_id, player_id), Instant::now());
    }

    pub fn is_present(&self, match_id: i64, player_id: i64) -> bool {
        let seen = self.seen.read().unwrap();
        seen.get(&(match_id, player_id))
            .is_some_and(|at| at.elapsed() <= self.ttl)
    }

    /// Drop expired entries. The sweep calls this on its cadence so the map
    /// does not grow with finished matches.
    pub fn prune(&self) {
        let mut seen = self.seen.write().unwrap();
        let ttl = self.ttl;
        seen.retain(|_, at| at.elapsed() <= ttl);
    }
}
