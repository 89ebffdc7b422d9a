// Hash function abstractions

use sha2::{Digest, Sha256, Sha512};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake128, Shake256};

/// Trait for hash functions
pub trait HashFunction {
    /// Hash input data
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Hash the concatenation of `parts` without building it first
    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        self.hash(&parts.concat())
    }

    /// Get output size in bytes
    fn output_size(&self) -> usize;
}

/// SHA-256 hash function
#[derive(Debug, Clone, Copy, Default)]
pub struct SHA256;

impl SHA256 {
    pub fn new() -> Self {
        SHA256
    }
}

impl HashFunction for SHA256 {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        digest_parts::<Sha256>(parts)
    }

    fn output_size(&self) -> usize {
        32
    }
}

/// Hash families an XMSS parameter set can be instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFamily {
    /// SHA-256 for n = 32, SHA-512 for n = 64.
    Sha2,
    /// SHAKE128 for n = 32, SHAKE256 for n = 64.
    Shake,
}

/// The n-byte hash selected by a family and an output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHasher {
    family: HashFamily,
    n: usize,
}

impl NodeHasher {
    /// Returns `None` for output sizes the family has no instance for.
    pub fn new(family: HashFamily, n: usize) -> Option<Self> {
        match n {
            32 | 64 => Some(NodeHasher { family, n }),
            _ => None,
        }
    }

    pub fn family(&self) -> HashFamily {
        self.family
    }
}

impl HashFunction for NodeHasher {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        self.hash_parts(&[data])
    }

    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        match (self.family, self.n) {
            (HashFamily::Sha2, 32) => digest_parts::<Sha256>(parts),
            (HashFamily::Sha2, _) => digest_parts::<Sha512>(parts),
            (HashFamily::Shake, 32) => xof_parts::<Shake128>(parts, self.n),
            (HashFamily::Shake, _) => xof_parts::<Shake256>(parts, self.n),
        }
    }

    fn output_size(&self) -> usize {
        self.n
    }
}

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        Digest::update(&mut hasher, part);
    }
    hasher.finalize().to_vec()
}

fn xof_parts<X: Default + Update + ExtendableOutput>(parts: &[&[u8]], out_len: usize) -> Vec<u8> {
    let mut hasher = X::default();
    for part in parts {
        Update::update(&mut hasher, part);
    }
    let mut out = vec![0u8; out_len];
    hasher.finalize_xof().read(&mut out);
    out
}
