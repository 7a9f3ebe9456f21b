// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU-backed replay guard for accepted envelope signatures.
//!
//! Remembers every accepted signature for the length of the freshness window
//! so a captured request cannot be delivered twice while its timestamp is
//! still considered fresh. Once the window has passed, the timestamp check
//! rejects the envelope on its own and the entry can be forgotten.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// Default number of signatures remembered.
pub const DEFAULT_REPLAY_CAPACITY: usize = 10_000;

/// Why a signature was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayRejection {
    /// Already accepted within the TTL.
    Replayed,
    /// Every remembered signature is still live; nothing can be dropped.
    Saturated,
}

/// In-process set of recently accepted signatures.
///
/// Entries are never promoted on lookup, so the least-recent end of the
/// cache is always the oldest acceptance. Only expired entries are evicted.
pub struct ReplayGuard {
    seen: Mutex<LruCache<String, Instant>>,
    capacity: usize,
    ttl: Duration,
}

impl ReplayGuard {
    /// Create a guard remembering up to `capacity` signatures for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: Mutex::new(LruCache::new(capacity)),
            capacity: capacity.get(),
            ttl,
        }
    }

    /// Record a signature unless it is a replay or the guard is full of
    /// live entries.
    pub fn check_and_record(&self, signature: &str) -> Result<(), ReplayRejection> {
        let key = signature.trim().to_ascii_lowercase();
        let mut seen = match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(accepted_at) = seen.peek(&key) {
            if accepted_at.elapsed() < self.ttl {
                return Err(ReplayRejection::Replayed);
            }
        }

        while let Some((_, accepted_at)) = seen.peek_lru() {
            if accepted_at.elapsed() < self.ttl {
                break;
            }
            seen.pop_lru();
        }

        if seen.len() >= self.capacity && !seen.contains(&key) {
            return Err(ReplayRejection::Saturated);
        }
        seen.put(key, Instant::now());
        Ok(())
    }

    /// Number of signatures currently remembered.
    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delivery_is_accepted_second_is_rejected() {
        let guard = ReplayGuard::new(10, Duration::from_secs(300));
        assert_eq!(guard.check_and_record("abc"), Ok(()));
        assert_eq!(guard.check_and_record("abc"), Err(ReplayRejection::Replayed));
        assert_eq!(guard.check_and_record("def"), Ok(()));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn signatures_compare_case_insensitively() {
        let guard = ReplayGuard::new(10, Duration::from_secs(300));
        assert_eq!(guard.check_and_record("ABCDEF"), Ok(()));
        assert_eq!(guard.check_and_record("abcdef"), Err(ReplayRejection::Replayed));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let guard = ReplayGuard::new(10, Duration::from_millis(1));
        assert_eq!(guard.check_and_record("abc"), Ok(()));

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(guard.check_and_record("abc"), Ok(()));
    }

    #[test]
    fn live_entries_are_never_forgotten_when_full() {
        let guard = ReplayGuard::new(2, Duration::from_secs(300));
        assert_eq!(guard.check_and_record("a"), Ok(()));
        assert_eq!(guard.check_and_record("b"), Ok(()));
        assert_eq!(guard.check_and_record("c"), Err(ReplayRejection::Saturated));

        // "a" is still remembered, so it stays a replay.
        assert_eq!(guard.check_and_record("a"), Err(ReplayRejection::Replayed));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn expired_entries_make_room_when_full() {
        let guard = ReplayGuard::new(2, Duration::from_millis(20));
        assert_eq!(guard.check_and_record("a"), Ok(()));
        assert_eq!(guard.check_and_record("b"), Ok(()));

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(guard.check_and_record("c"), Ok(()));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let guard = ReplayGuard::new(0, Duration::from_secs(300));
        assert!(guard.is_empty());
        assert_eq!(guard.check_and_record("a"), Ok(()));
        assert_eq!(guard.check_and_record("a"), Err(ReplayRejection::Replayed));
    }
}
