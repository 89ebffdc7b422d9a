//! Keyed hash family of RFC 8391 section 5.1.
//!
//! Each function prepends `toByte(domain, n)` to `KEY || M` so that F, H,
//! H_msg and PRF never collide on the same input.

use crate::crypto::hash::{HashFunction, NodeHasher};
use crate::xmss::address::Address;
use crate::xmss::{IntegrityError, Node, Result};

const DOMAIN_F: u64 = 0;
const DOMAIN_H: u64 = 1;
const DOMAIN_H_MSG: u64 = 2;
const DOMAIN_PRF: u64 = 3;

/// `value` as a big-endian integer left-padded to `len` bytes.
pub fn to_byte(value: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let bytes = value.to_be_bytes();
    let take = len.min(bytes.len());
    out[len - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}

/// Hash context handed to tree and one-time-signature code.
///
/// Stateless apart from the selected hash, so each worker simply clones its
/// own copy.
#[derive(Debug, Clone, Copy)]
pub struct XMSSHash {
    hasher: NodeHasher,
}

impl XMSSHash {
    pub fn new(hasher: NodeHasher) -> Self {
        XMSSHash { hasher }
    }

    pub fn output_size(&self) -> usize {
        self.hasher.output_size()
    }

    pub fn f(&self, key: &[u8], message: &[u8]) -> Node {
        self.keyed(DOMAIN_F, key, message)
    }

    pub fn h(&self, key: &[u8], message: &[u8]) -> Node {
        self.keyed(DOMAIN_H, key, message)
    }

    pub fn h_msg(&self, key: &[u8], message: &[u8]) -> Node {
        self.keyed(DOMAIN_H_MSG, key, message)
    }

    pub fn prf(&self, key: &[u8], message: &[u8]) -> Node {
        self.keyed(DOMAIN_PRF, key, message)
    }

    /// PRF keyed by `key` over the 32 address bytes.
    pub fn derive(&self, key: &[u8], adrs: &Address) -> Node {
        self.prf(key, adrs.as_bytes())
    }

    /// RAND_HASH: combine two children into their parent.
    ///
    /// Uses key-and-mask words 0, 1 and 2 of `adrs` for the key and the two
    /// bitmasks; the address is left with key-and-mask set to 2.
    pub fn combine(
        &self,
        left: &[u8],
        right: &[u8],
        adrs: &mut Address,
        public_seed: &[u8],
    ) -> Result<Node> {
        let n = self.output_size();
        check_len("left node", left, n)?;
        check_len("right node", right, n)?;
        check_len("public seed", public_seed, n)?;

        adrs.set_key_and_mask(0);
        let key = self.derive(public_seed, adrs);
        adrs.set_key_and_mask(1);
        let mask_left = self.derive(public_seed, adrs);
        adrs.set_key_and_mask(2);
        let mask_right = self.derive(public_seed, adrs);

        let mut masked = Vec::with_capacity(2 * n);
        masked.extend(left.iter().zip(&mask_left).map(|(a, b)| a ^ b));
        masked.extend(right.iter().zip(&mask_right).map(|(a, b)| a ^ b));

        Ok(self.h(&key, &masked))
    }

    /// `H_msg(r || root || toByte(index, n), message)`
    pub fn message_digest(
        &self,
        randomness: &[u8],
        root: &[u8],
        index: u64,
        message: &[u8],
    ) -> Node {
        let n = self.output_size();
        let key = [randomness, root, &to_byte(index, n)[..]].concat();
        self.h_msg(&key, message)
    }

    fn keyed(&self, domain: u64, key: &[u8], message: &[u8]) -> Node {
        let prefix = to_byte(domain, self.output_size());
        self.hasher.hash_parts(&[&prefix[..], key, message])
    }
}

pub(crate) fn check_len(what: &'static str, value: &[u8], expected: usize) -> Result<()> {
    if value.len() == expected {
        Ok(())
    } else {
        Err(IntegrityError::ElementSize { what, expected, actual: value.len() }.into())
    }
}
