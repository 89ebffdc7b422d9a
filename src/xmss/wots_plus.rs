//! WOTS+ one-time signatures (RFC 8391 section 3) behind the
//! [`OneTimeSignatureProvider`] seam used by the tree builder.

use std::fmt;

use zeroize::Zeroizing;

use crate::xmss::address::Address;
use crate::xmss::hash::{check_len, to_byte, XMSSHash};
use crate::xmss::{Node, Result, XMSSError};

/// Seeds a provider needs to derive one-time keys.
#[derive(Clone, Copy)]
pub struct SeedRef<'a> {
    pub private_seed: &'a [u8],
    pub public_seed: &'a [u8],
}

impl fmt::Debug for SeedRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedRef")
            .field("private_seed", &"<redacted>")
            .field("public_seed", &hex::encode(self.public_seed))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WotsPublicKey {
    chains: Vec<Node>,
}

impl WotsPublicKey {
    pub fn new(chains: Vec<Node>) -> Self {
        WotsPublicKey { chains }
    }

    pub fn chains(&self) -> &[Node] {
        &self.chains
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WotsSignature {
    chains: Vec<Node>,
}

impl WotsSignature {
    pub fn from_chains(chains: Vec<Node>) -> Self {
        WotsSignature { chains }
    }

    pub fn chains(&self) -> &[Node] {
        &self.chains
    }
}

/// One-time signatures as consumed by tree hashing, signing and verification.
///
/// Callers set the address type and leaf word before each call: OTS type with
/// the OTS address for key generation and signing, L-tree type with the
/// L-tree address for [`compress_to_leaf`](Self::compress_to_leaf).
pub trait OneTimeSignatureProvider: Send + Sync + fmt::Debug {
    fn generate_public_key(
        &self,
        seeds: SeedRef<'_>,
        adrs: &mut Address,
        hash: &XMSSHash,
    ) -> Result<WotsPublicKey>;

    fn compress_to_leaf(
        &self,
        public_key: &WotsPublicKey,
        adrs: &mut Address,
        public_seed: &[u8],
        hash: &XMSSHash,
    ) -> Result<Node>;

    fn sign(
        &self,
        seeds: SeedRef<'_>,
        adrs: &mut Address,
        digest: &[u8],
        hash: &XMSSHash,
    ) -> Result<WotsSignature>;

    fn public_key_from_signature(
        &self,
        signature: &WotsSignature,
        digest: &[u8],
        adrs: &mut Address,
        public_seed: &[u8],
        hash: &XMSSHash,
    ) -> Result<WotsPublicKey>;
}

/// WOTS+ parameters; the Winternitz parameter is fixed at w = 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WOTSPlusParams {
    n: usize,
    len_1: usize,
    len_2: usize,
}

impl WOTSPlusParams {
    pub const W: u32 = 16;
    pub const LOG_W: usize = 4;

    pub fn new(n: usize) -> Self {
        let len_1 = 8 * n / Self::LOG_W;
        let max_checksum = len_1 * (Self::W as usize - 1);
        let floor_log2 = (usize::BITS - 1 - max_checksum.leading_zeros()) as usize;
        let len_2 = floor_log2 / Self::LOG_W + 1;
        WOTSPlusParams { n, len_1, len_2 }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Total number of hash chains.
    pub fn len(&self) -> usize {
        self.len_1 + self.len_2
    }

    /// Chain positions a message digest selects, checksum included.
    fn chain_lengths(&self, digest: &[u8]) -> Vec<u32> {
        let mut lengths = base_w(digest, self.len_1);
        let checksum: u32 = lengths.iter().map(|&v| Self::W - 1 - v).sum();

        let checksum_bits = self.len_2 * Self::LOG_W;
        let shifted = checksum << (8 - checksum_bits % 8);
        let checksum_bytes = to_byte(u64::from(shifted), checksum_bits.div_ceil(8));
        lengths.extend(base_w(&checksum_bytes, self.len_2));
        lengths
    }
}

/// Splits `input` into `out_len` 4-bit digits, most significant first.
fn base_w(input: &[u8], out_len: usize) -> Vec<u32> {
    input
        .iter()
        .flat_map(|byte| [u32::from(byte >> 4), u32::from(byte & 0x0f)])
        .take(out_len)
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct WOTSPlus {
    params: WOTSPlusParams,
}

impl WOTSPlus {
    pub fn new(params: WOTSPlusParams) -> Self {
        WOTSPlus { params }
    }

    pub fn params(&self) -> &WOTSPlusParams {
        &self.params
    }

    fn secret_element(
        &self,
        private_seed: &[u8],
        adrs: &Address,
        chain: u32,
        hash: &XMSSHash,
    ) -> Zeroizing<Node> {
        let mut element_adrs = *adrs;
        element_adrs.set_chain_address(chain);
        element_adrs.set_hash_address(0);
        element_adrs.set_key_and_mask(0);
        Zeroizing::new(hash.derive(private_seed, &element_adrs))
    }

    fn chain(
        &self,
        input: &[u8],
        start: u32,
        steps: u32,
        adrs: &mut Address,
        public_seed: &[u8],
        hash: &XMSSHash,
    ) -> Result<Node> {
        if start + steps > WOTSPlusParams::W - 1 {
            return Err(XMSSError::ProviderFailure(format!(
                "chain walk {start}+{steps} exceeds w-1"
            )));
        }

        let mut node = input.to_vec();
        for step in start..start + steps {
            adrs.set_hash_address(step);
            adrs.set_key_and_mask(0);
            let key = hash.derive(public_seed, adrs);
            adrs.set_key_and_mask(1);
            let mask = hash.derive(public_seed, adrs);
            node.iter_mut().zip(&mask).for_each(|(b, m)| *b ^= m);
            node = hash.f(&key, &node);
        }
        Ok(node)
    }

    fn check_seeds(&self, seeds: SeedRef<'_>) -> Result<()> {
        check_len("private seed", seeds.private_seed, self.params.n)?;
        check_len("public seed", seeds.public_seed, self.params.n)
    }
}

impl OneTimeSignatureProvider for WOTSPlus {
    fn generate_public_key(
        &self,
        seeds: SeedRef<'_>,
        adrs: &mut Address,
        hash: &XMSSHash,
    ) -> Result<WotsPublicKey> {
        self.check_seeds(seeds)?;
        let chains = (0..self.params.len() as u32)
            .map(|chain| {
                let secret = self.secret_element(seeds.private_seed, adrs, chain, hash);
                adrs.set_chain_address(chain);
                self.chain(&secret, 0, WOTSPlusParams::W - 1, adrs, seeds.public_seed, hash)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(WotsPublicKey::new(chains))
    }

    /// L-tree (RFC 8391 algorithm 8): fold the chains pairwise, carrying an
    /// odd last node up unchanged, until one node remains.
    fn compress_to_leaf(
        &self,
        public_key: &WotsPublicKey,
        adrs: &mut Address,
        public_seed: &[u8],
        hash: &XMSSHash,
    ) -> Result<Node> {
        if public_key.chains().len() != self.params.len() {
            return Err(XMSSError::ProviderFailure(format!(
                "WOTS+ public key has {} chains, expected {}",
                public_key.chains().len(),
                self.params.len()
            )));
        }

        let mut nodes = public_key.chains().to_vec();
        let mut height = 0;
        while nodes.len() > 1 {
            adrs.set_tree_height(height);
            let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
            for (i, pair) in nodes.chunks(2).enumerate() {
                match pair {
                    [left, right] => {
                        adrs.set_tree_index(i as u32);
                        next.push(hash.combine(left, right, adrs, public_seed)?);
                    }
                    [odd] => next.push(odd.clone()),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                }
            }
            nodes = next;
            height += 1;
        }

        nodes
            .pop()
            .ok_or_else(|| XMSSError::ProviderFailure("empty WOTS+ public key".into()))
    }

    fn sign(
        &self,
        seeds: SeedRef<'_>,
        adrs: &mut Address,
        digest: &[u8],
        hash: &XMSSHash,
    ) -> Result<WotsSignature> {
        self.check_seeds(seeds)?;
        check_len("message digest", digest, self.params.n)?;

        let chains = self
            .params
            .chain_lengths(digest)
            .into_iter()
            .enumerate()
            .map(|(chain, steps)| {
                let chain = chain as u32;
                let secret = self.secret_element(seeds.private_seed, adrs, chain, hash);
                adrs.set_chain_address(chain);
                self.chain(&secret, 0, steps, adrs, seeds.public_seed, hash)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(WotsSignature::from_chains(chains))
    }

    fn public_key_from_signature(
        &self,
        signature: &WotsSignature,
        digest: &[u8],
        adrs: &mut Address,
        public_seed: &[u8],
        hash: &XMSSHash,
    ) -> Result<WotsPublicKey> {
        check_len("message digest", digest, self.params.n)?;
        if signature.chains().len() != self.params.len() {
            return Err(XMSSError::ProviderFailure(format!(
                "WOTS+ signature has {} chains, expected {}",
                signature.chains().len(),
                self.params.len()
            )));
        }

        let chains = self
            .params
            .chain_lengths(digest)
            .into_iter()
            .zip(signature.chains())
            .enumerate()
            .map(|(chain, (start, node))| {
                check_len("signature chain", node, self.params.n)?;
                adrs.set_chain_address(chain as u32);
                self.chain(node, start, WOTSPlusParams::W - 1 - start, adrs, public_seed, hash)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(WotsPublicKey::new(chains))
    }
}
