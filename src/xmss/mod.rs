//! XMSS key management, tree hashing and signing.

pub mod address;
pub mod context;
pub mod hash;
pub mod params;
pub mod private_key;
pub mod public_key;
pub mod registry;
pub mod signature;
pub mod tree;
pub mod wots_plus;

pub use self::address::{Address, AddressType};
pub use self::context::XMSSContext;
pub use self::hash::XMSSHash;
pub use self::params::{XMSSAlgorithm, XMSSParams};
pub use self::private_key::XMSSPrivateKey;
pub use self::public_key::XMSSPublicKey;
pub use self::registry::{KeyIdentity, LeafCounter, LeafIndexRegistry};
pub use self::signature::XMSSSignature;
pub use self::tree::{AuthPath, Parallelism, TreeBuilder, TreeHashConfig, TreeHashExecutor};
pub use self::wots_plus::{
    OneTimeSignatureProvider, SeedRef, WOTSPlus, WOTSPlusParams, WotsPublicKey, WotsSignature,
};

use thiserror::Error;

/// A tree node: one n-byte hash value.
pub type Node = Vec<u8>;

pub type Result<T> = std::result::Result<T, XMSSError>;

#[derive(Debug, Error)]
pub enum XMSSError {
    /// Malformed key, signature or tree request.
    #[error("Integrity failure: {0}")]
    IntegrityFailure(#[from] IntegrityError),

    /// Every usable leaf of this key identity has been consumed.
    #[error("Leaf index {index} exhausted (limit {limit})")]
    LeafExhausted { index: u64, limit: u64 },

    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    #[error("Concurrency failure: {0}")]
    ConcurrencyFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("invalid XMSS private key size: expected {expected} bytes, got {actual}")]
    PrivateKeySize { expected: usize, actual: usize },

    #[error("invalid XMSS public key size: expected {expected} bytes, got {actual}")]
    PublicKeySize { expected: usize, actual: usize },

    #[error("invalid XMSS signature size: expected {expected} bytes, got {actual}")]
    SignatureSize { expected: usize, actual: usize },

    #[error("XMSS private key leaf index {index} out of bounds (limit {limit})")]
    LeafIndexOutOfRange { index: u64, limit: u64 },

    #[error("algorithm identifier mismatch: expected {expected:#010x}, found {found:#010x}")]
    AlgorithmMismatch { expected: u32, found: u32 },

    #[error("subtree at {start} of height {height} is not aligned or exceeds the tree")]
    MisalignedSubtree { start: u64, height: usize },

    #[error("authentication path has {actual} nodes, expected {expected}")]
    AuthPathLength { expected: usize, actual: usize },

    #[error("expected a {expected}-byte {what}, got {actual} bytes")]
    ElementSize { what: &'static str, expected: usize, actual: usize },
}
