//! Process-wide source of truth for "next unused leaf" per key identity.
//!
//! A private key never owns its leaf counter. It asks the registry for the
//! counter registered under its [`KeyIdentity`], which is derived from the
//! secret seeds alone. Two handles built from the same secret material (say,
//! the same stored key parsed twice) therefore share one counter and can never
//! hand out the same leaf. Replacing this with a per-handle counter reopens
//! one-time key reuse.
//!
//! Entries are never evicted: a counter lives as long as its registry. An
//! evicted counter would restart at the index embedded in whatever serialized
//! copy is parsed next, which may be stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::crypto::hash::{HashFunction, SHA256};
use crate::xmss::{Result, XMSSError};

static PROCESS_REGISTRY: Lazy<Arc<LeafIndexRegistry>> =
    Lazy::new(|| Arc::new(LeafIndexRegistry::new()));

/// Fingerprint of a key's secret material: `SHA-256(private_seed || prf_key)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyIdentity([u8; 32]);

impl KeyIdentity {
    pub fn derive(private_seed: &[u8], prf_key: &[u8]) -> Self {
        let digest = SHA256::new().hash_parts(&[private_seed, prf_key]);
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        KeyIdentity(id)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyIdentity({self})")
    }
}

/// Shared handle to one identity's counter.
///
/// The counter only moves forward, and only through [`reserve`](Self::reserve)
/// and [`advance_to`](Self::advance_to).
#[derive(Clone)]
pub struct LeafCounter {
    identity: KeyIdentity,
    next: Arc<AtomicU64>,
}

impl LeafCounter {
    pub fn identity(&self) -> KeyIdentity {
        self.identity
    }

    /// Next leaf index that has not been handed out.
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Atomically hands out the next leaf index below `limit`.
    ///
    /// Once `limit` is reached the counter stays at `limit` and every call
    /// fails with [`XMSSError::LeafExhausted`].
    pub fn reserve(&self, limit: u64) -> Result<u64> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next < limit).then(|| next + 1)
            })
            .map_err(|index| {
                warn!(identity = %self.identity, index, limit, "leaf indices exhausted");
                XMSSError::LeafExhausted { index, limit }
            })
    }

    /// Raises the counter to `index` if it is behind. Returns the previous value.
    pub fn advance_to(&self, index: u64) -> u64 {
        self.next.fetch_max(index, Ordering::SeqCst)
    }
}

impl fmt::Debug for LeafCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafCounter")
            .field("identity", &self.identity)
            .field("next", &self.current())
            .finish()
    }
}

/// Identity → counter map.
///
/// The lock guards only lookup and insertion; reservations go straight to the
/// per-identity atomic, so different identities never contend.
#[derive(Default)]
pub struct LeafIndexRegistry {
    counters: Mutex<HashMap<KeyIdentity, Arc<AtomicU64>>>,
}

impl LeafIndexRegistry {
    /// A fresh, isolated registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by everything in this process that asks for it.
    pub fn process_wide() -> Arc<LeafIndexRegistry> {
        Arc::clone(&PROCESS_REGISTRY)
    }

    /// Counter for `identity`, created at 0 on first request.
    pub fn counter(&self, identity: KeyIdentity) -> LeafCounter {
        let next = {
            let mut counters = self.counters.lock();
            Arc::clone(counters.entry(identity).or_insert_with(|| {
                debug!(%identity, "registering leaf counter");
                Arc::new(AtomicU64::new(0))
            }))
        };
        LeafCounter { identity, next }
    }

    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LeafIndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafIndexRegistry").field("identities", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn identity(tag: u8) -> KeyIdentity {
        KeyIdentity::derive(&[tag; 32], &[tag.wrapping_add(1); 32])
    }

    #[test]
    fn identity_depends_on_both_secrets() {
        let base = KeyIdentity::derive(&[1; 32], &[2; 32]);
        assert_eq!(base, KeyIdentity::derive(&[1; 32], &[2; 32]));
        assert_ne!(base, KeyIdentity::derive(&[1; 32], &[3; 32]));
        assert_ne!(base, KeyIdentity::derive(&[2; 32], &[1; 32]));
    }

    #[test]
    fn same_identity_shares_counter() {
        let registry = LeafIndexRegistry::new();
        let first = registry.counter(identity(1));
        let second = registry.counter(identity(1));
        let other = registry.counter(identity(9));

        assert_eq!(first.reserve(8).unwrap(), 0);
        assert_eq!(second.reserve(8).unwrap(), 1);
        assert_eq!(first.current(), 2);
        assert_eq!(other.reserve(8).unwrap(), 0);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reserve_saturates_at_limit() {
        let registry = LeafIndexRegistry::new();
        let counter = registry.counter(identity(2));
        for expected in 0..4 {
            assert_eq!(counter.reserve(4).unwrap(), expected);
        }
        for _ in 0..3 {
            match counter.reserve(4) {
                Err(XMSSError::LeafExhausted { index, limit }) => {
                    assert_eq!(index, 4);
                    assert_eq!(limit, 4);
                }
                other => panic!("expected exhaustion, got {other:?}"),
            }
        }
        assert_eq!(counter.current(), 4);
    }

    #[test]
    fn advance_never_moves_backwards() {
        let registry = LeafIndexRegistry::new();
        let counter = registry.counter(identity(3));
        assert_eq!(counter.advance_to(5), 0);
        assert_eq!(counter.advance_to(2), 5);
        assert_eq!(counter.current(), 5);
        assert_eq!(counter.reserve(16).unwrap(), 5);
    }

    #[test]
    fn concurrent_reservations_are_unique_and_gapless() {
        let registry = Arc::new(LeafIndexRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let counter = registry.counter(identity(4));
                    (0..250).map(|_| counter.reserve(u64::MAX).unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for index in handle.join().unwrap() {
                assert!(seen.insert(index), "index {index} handed out twice");
            }
        }
        assert_eq!(seen, (0..2000).collect::<HashSet<u64>>());
    }

    #[test]
    fn process_wide_registry_is_shared() {
        assert!(Arc::ptr_eq(
            &LeafIndexRegistry::process_wide(),
            &LeafIndexRegistry::process_wide()
        ));
    }
}
