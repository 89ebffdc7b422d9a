use std::fmt;
use std::str::FromStr;

use crate::crypto::hash::{HashFamily, NodeHasher};
use crate::xmss::hash::XMSSHash;
use crate::xmss::wots_plus::WOTSPlusParams;
use crate::xmss::{Result, XMSSError};

/// Smallest and largest tree heights accepted by [`XMSSParams::custom`].
pub const MIN_TREE_HEIGHT: usize = 2;
pub const MAX_TREE_HEIGHT: usize = 20;

/// Registered XMSS parameter sets (RFC 8391 section 5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XMSSAlgorithm {
    Sha2_10_256,
    Sha2_16_256,
    Sha2_20_256,
    Sha2_10_512,
    Sha2_16_512,
    Sha2_20_512,
    Shake10_256,
    Shake16_256,
    Shake20_256,
    Shake10_512,
    Shake16_512,
    Shake20_512,
}

impl XMSSAlgorithm {
    pub const ALL: [XMSSAlgorithm; 12] = [
        XMSSAlgorithm::Sha2_10_256,
        XMSSAlgorithm::Sha2_16_256,
        XMSSAlgorithm::Sha2_20_256,
        XMSSAlgorithm::Sha2_10_512,
        XMSSAlgorithm::Sha2_16_512,
        XMSSAlgorithm::Sha2_20_512,
        XMSSAlgorithm::Shake10_256,
        XMSSAlgorithm::Shake16_256,
        XMSSAlgorithm::Shake20_256,
        XMSSAlgorithm::Shake10_512,
        XMSSAlgorithm::Shake16_512,
        XMSSAlgorithm::Shake20_512,
    ];

    pub fn oid(self) -> u32 {
        match self {
            XMSSAlgorithm::Sha2_10_256 => 0x0000_0001,
            XMSSAlgorithm::Sha2_16_256 => 0x0000_0002,
            XMSSAlgorithm::Sha2_20_256 => 0x0000_0003,
            XMSSAlgorithm::Sha2_10_512 => 0x0000_0004,
            XMSSAlgorithm::Sha2_16_512 => 0x0000_0005,
            XMSSAlgorithm::Sha2_20_512 => 0x0000_0006,
            XMSSAlgorithm::Shake10_256 => 0x0000_0007,
            XMSSAlgorithm::Shake16_256 => 0x0000_0008,
            XMSSAlgorithm::Shake20_256 => 0x0000_0009,
            XMSSAlgorithm::Shake10_512 => 0x0000_000a,
            XMSSAlgorithm::Shake16_512 => 0x0000_000b,
            XMSSAlgorithm::Shake20_512 => 0x0000_000c,
        }
    }

    pub fn from_oid(oid: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|algorithm| algorithm.oid() == oid)
    }

    pub fn name(self) -> &'static str {
        match self {
            XMSSAlgorithm::Sha2_10_256 => "XMSS-SHA2_10_256",
            XMSSAlgorithm::Sha2_16_256 => "XMSS-SHA2_16_256",
            XMSSAlgorithm::Sha2_20_256 => "XMSS-SHA2_20_256",
            XMSSAlgorithm::Sha2_10_512 => "XMSS-SHA2_10_512",
            XMSSAlgorithm::Sha2_16_512 => "XMSS-SHA2_16_512",
            XMSSAlgorithm::Sha2_20_512 => "XMSS-SHA2_20_512",
            XMSSAlgorithm::Shake10_256 => "XMSS-SHAKE_10_256",
            XMSSAlgorithm::Shake16_256 => "XMSS-SHAKE_16_256",
            XMSSAlgorithm::Shake20_256 => "XMSS-SHAKE_20_256",
            XMSSAlgorithm::Shake10_512 => "XMSS-SHAKE_10_512",
            XMSSAlgorithm::Shake16_512 => "XMSS-SHAKE_16_512",
            XMSSAlgorithm::Shake20_512 => "XMSS-SHAKE_20_512",
        }
    }

    fn shape(self) -> (HashFamily, usize, usize) {
        use XMSSAlgorithm::*;
        match self {
            Sha2_10_256 => (HashFamily::Sha2, 32, 10),
            Sha2_16_256 => (HashFamily::Sha2, 32, 16),
            Sha2_20_256 => (HashFamily::Sha2, 32, 20),
            Sha2_10_512 => (HashFamily::Sha2, 64, 10),
            Sha2_16_512 => (HashFamily::Sha2, 64, 16),
            Sha2_20_512 => (HashFamily::Sha2, 64, 20),
            Shake10_256 => (HashFamily::Shake, 32, 10),
            Shake16_256 => (HashFamily::Shake, 32, 16),
            Shake20_256 => (HashFamily::Shake, 32, 20),
            Shake10_512 => (HashFamily::Shake, 64, 10),
            Shake16_512 => (HashFamily::Shake, 64, 16),
            Shake20_512 => (HashFamily::Shake, 64, 20),
        }
    }
}

impl fmt::Display for XMSSAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for XMSSAlgorithm {
    type Err = XMSSError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| XMSSError::ProviderFailure(format!("unknown XMSS algorithm {s:?}")))
    }
}

/// Parameters of one XMSS instance. Cheap to copy and immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XMSSParams {
    algorithm: Option<XMSSAlgorithm>,
    hasher: NodeHasher,
    tree_height: usize,
    wots: WOTSPlusParams,
}

impl XMSSParams {
    /// OID written for parameter sets built with [`XMSSParams::custom`].
    pub const CUSTOM_OID: u32 = 0;

    pub fn new(algorithm: XMSSAlgorithm) -> Self {
        let (family, n, tree_height) = algorithm.shape();
        XMSSParams {
            algorithm: Some(algorithm),
            hasher: NodeHasher::new(family, n).unwrap_or_else(|| unreachable!("registered n")),
            tree_height,
            wots: WOTSPlusParams::new(n),
        }
    }

    /// Unregistered parameter set, mainly for small test trees.
    pub fn custom(family: HashFamily, n: usize, tree_height: usize) -> Result<Self> {
        let hasher = NodeHasher::new(family, n).ok_or_else(|| {
            XMSSError::ProviderFailure(format!("unsupported node size {n} for {family:?}"))
        })?;
        if !(MIN_TREE_HEIGHT..=MAX_TREE_HEIGHT).contains(&tree_height) {
            return Err(XMSSError::ProviderFailure(format!(
                "unsupported tree height {tree_height}"
            )));
        }

        Ok(XMSSParams { algorithm: None, hasher, tree_height, wots: WOTSPlusParams::new(n) })
    }

    pub fn algorithm(&self) -> Option<XMSSAlgorithm> {
        self.algorithm
    }

    pub fn oid(&self) -> u32 {
        self.algorithm.map_or(Self::CUSTOM_OID, XMSSAlgorithm::oid)
    }

    pub fn hash_family(&self) -> HashFamily {
        self.hasher.family()
    }

    pub fn tree_height(&self) -> usize {
        self.tree_height
    }

    /// Node and seed size n in bytes.
    pub fn element_size(&self) -> usize {
        self.wots.n()
    }

    pub fn wots(&self) -> &WOTSPlusParams {
        &self.wots
    }

    pub fn hasher(&self) -> XMSSHash {
        XMSSHash::new(self.hasher)
    }

    /// Exclusive bound on leaf indices a private key may hand out: 2^(h-1).
    pub fn leaf_limit(&self) -> u64 {
        1u64 << (self.tree_height - 1)
    }

    /// Number of leaves in the full tree: 2^h.
    pub fn leaf_count(&self) -> u64 {
        1u64 << self.tree_height
    }

    /// `oid || root || public_seed`
    pub fn public_key_size(&self) -> usize {
        4 + 2 * self.element_size()
    }

    /// `public key || leaf index (8) || prf key || private seed`
    pub fn private_key_size(&self) -> usize {
        self.public_key_size() + 8 + 2 * self.element_size()
    }

    /// `leaf index (4) || r || ots signature || authentication path`
    pub fn signature_size(&self) -> usize {
        let n = self.element_size();
        4 + n + self.wots.len() * n + self.tree_height * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_sets_have_rfc_sizes() {
        let params = XMSSParams::new(XMSSAlgorithm::Sha2_10_256);
        assert_eq!(params.tree_height(), 10);
        assert_eq!(params.element_size(), 32);
        assert_eq!(params.wots().len(), 67);
        assert_eq!(params.signature_size(), 2500);
        assert_eq!(params.public_key_size(), 68);
        assert_eq!(params.private_key_size(), 68 + 8 + 64);

        let params = XMSSParams::new(XMSSAlgorithm::Shake20_512);
        assert_eq!(params.wots().len(), 131);
        assert_eq!(params.signature_size(), 4 + 64 + 131 * 64 + 20 * 64);
    }

    #[test]
    fn oid_and_name_lookup() {
        for algorithm in XMSSAlgorithm::ALL {
            assert_eq!(XMSSAlgorithm::from_oid(algorithm.oid()), Some(algorithm));
            assert_eq!(algorithm.name().parse::<XMSSAlgorithm>().unwrap(), algorithm);
        }
        assert_eq!(XMSSAlgorithm::from_oid(0), None);
        assert!("XMSS-MD5_10_256".parse::<XMSSAlgorithm>().is_err());
    }

    #[test]
    fn leaf_limit_is_one_bit_short_of_tree() {
        let params = XMSSParams::custom(HashFamily::Sha2, 32, 4).unwrap();
        assert_eq!(params.leaf_limit(), 8);
        assert_eq!(params.leaf_count(), 16);
        assert_eq!(params.oid(), XMSSParams::CUSTOM_OID);
    }

    #[test]
    fn custom_rejects_unsupported_shapes() {
        assert!(matches!(
            XMSSParams::custom(HashFamily::Sha2, 24, 4),
            Err(XMSSError::ProviderFailure(_))
        ));
        assert!(XMSSParams::custom(HashFamily::Shake, 32, 1).is_err());
        assert!(XMSSParams::custom(HashFamily::Shake, 32, 21).is_err());
    }
}
