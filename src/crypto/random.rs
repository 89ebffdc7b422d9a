// Random number generation

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Secure random number generator trait
pub trait SecureRandom {
    /// Generate random bytes
    fn random_bytes(&mut self, size: usize) -> Vec<u8>;
}

/// OS-based secure random number generator
#[derive(Debug, Default)]
pub struct OsSecureRandom {
    rng: OsRng,
}

impl OsSecureRandom {
    pub fn new() -> Self {
        OsSecureRandom { rng: OsRng }
    }
}

impl SecureRandom for OsSecureRandom {
    fn random_bytes(&mut self, size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        self.rng.fill_bytes(&mut bytes);
        bytes
    }
}

/// Deterministic RNG for testing. Never use it for real keys.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: StdRng,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        DeterministicRng { rng: StdRng::seed_from_u64(seed) }
    }
}

impl SecureRandom for DeterministicRng {
    fn random_bytes(&mut self, size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        self.rng.fill_bytes(&mut bytes);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_rng_repeats_for_same_seed() {
        let a = DeterministicRng::new(7).random_bytes(64);
        let b = DeterministicRng::new(7).random_bytes(64);
        let c = DeterministicRng::new(8).random_bytes(64);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
