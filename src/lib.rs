//! Stateful XMSS signatures.
//!
//! Every private key shares a leaf-index counter with all other handles to
//! the same secret through a [`LeafIndexRegistry`](xmss::LeafIndexRegistry),
//! so a one-time leaf is never used twice within a process even when the key
//! is loaded more than once.

pub mod crypto;
pub mod xmss;

pub use xmss::{Result, XMSSError};
