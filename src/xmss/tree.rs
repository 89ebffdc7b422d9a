//! Merkle tree hashing over WOTS+ leaves.
//!
//! [`TreeBuilder::subtree_root`] computes the root of any aligned subtree.
//! Small requests, or a single worker, run the stack-based treehash in
//! O(height) memory. Otherwise the range is split into `2^s` contiguous
//! subtrees that are treehashed on the rayon pool and then combined pairwise,
//! one level at a time. Both paths produce identical roots.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::trace;

use crate::xmss::address::{Address, AddressType};
use crate::xmss::hash::XMSSHash;
use crate::xmss::params::XMSSParams;
use crate::xmss::wots_plus::{OneTimeSignatureProvider, SeedRef};
use crate::xmss::{IntegrityError, Node, Result, XMSSError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// One task per thread of the global rayon pool.
    #[default]
    Auto,
    /// Always run treehash on the calling thread.
    Sequential,
    /// A dedicated pool with this many threads.
    Workers(NonZeroUsize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeHashConfig {
    pub parallelism: Parallelism,
}

impl TreeHashConfig {
    pub fn sequential() -> Self {
        TreeHashConfig { parallelism: Parallelism::Sequential }
    }

    pub fn workers(count: NonZeroUsize) -> Self {
        TreeHashConfig { parallelism: Parallelism::Workers(count) }
    }
}

/// Where parallel tree hashing runs.
#[derive(Debug, Clone)]
pub struct TreeHashExecutor {
    workers: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl TreeHashExecutor {
    pub fn new(config: &TreeHashConfig) -> Result<Self> {
        match config.parallelism {
            Parallelism::Auto => Ok(Self::default()),
            Parallelism::Sequential => Ok(Self::sequential()),
            Parallelism::Workers(count) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(count.get())
                    .thread_name(|i| format!("xmss-treehash-{i}"))
                    .build()
                    .map_err(|err| XMSSError::ConcurrencyFailure(err.to_string()))?;
                Ok(TreeHashExecutor { workers: count.get(), pool: Some(Arc::new(pool)) })
            }
        }
    }

    pub fn sequential() -> Self {
        TreeHashExecutor { workers: 1, pool: None }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `s = min(height, ceil(log2(workers)))`
    fn split_level(&self, height: usize) -> usize {
        if self.workers <= 1 {
            return 0;
        }
        let ceil_log2 = (usize::BITS - (self.workers - 1).leading_zeros()) as usize;
        height.min(ceil_log2)
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl Default for TreeHashExecutor {
    fn default() -> Self {
        TreeHashExecutor { workers: rayon::current_num_threads(), pool: None }
    }
}

/// Computes subtree roots and authentication paths for one key.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    params: &'a XMSSParams,
    ots: &'a dyn OneTimeSignatureProvider,
    seeds: SeedRef<'a>,
    executor: &'a TreeHashExecutor,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        params: &'a XMSSParams,
        ots: &'a dyn OneTimeSignatureProvider,
        seeds: SeedRef<'a>,
        executor: &'a TreeHashExecutor,
    ) -> Self {
        TreeBuilder { params, ots, seeds, executor }
    }

    /// Root of the subtree of `height` whose leftmost leaf is `start`.
    ///
    /// `start` must be a multiple of `2^height` and the subtree must lie
    /// inside the tree. Only the layer and tree words of `adrs` are used.
    pub fn subtree_root(&self, start: u64, height: usize, adrs: &Address) -> Result<Node> {
        let misaligned = IntegrityError::MisalignedSubtree { start, height };
        if height > self.params.tree_height() {
            return Err(misaligned.into());
        }
        let span = 1u64 << height;
        let outside = start
            .checked_add(span)
            .map_or(true, |end| end > self.params.leaf_count());
        if start % span != 0 || outside {
            return Err(misaligned.into());
        }

        let split = self.executor.split_level(height);
        if split == 0 {
            return self.treehash(start, height, *adrs, &self.params.hasher());
        }
        self.parallel_root(start, height, split, adrs)
    }

    /// Sibling roots along the path from `leaf` to the root, bottom first.
    pub fn auth_path(&self, leaf: u64, adrs: &Address) -> Result<AuthPath> {
        let nodes = (0..self.params.tree_height())
            .map(|level| self.subtree_root(((leaf >> level) ^ 1) << level, level, adrs))
            .collect::<Result<Vec<_>>>()?;
        Ok(AuthPath::new(nodes))
    }

    /// Leaf node `index`: the L-tree compression of its WOTS+ public key.
    pub fn leaf(&self, index: u64, adrs: &mut Address, hash: &XMSSHash) -> Result<Node> {
        adrs.set_type(AddressType::Ots);
        adrs.set_ots_address(index as u32);
        let public_key = self.ots.generate_public_key(self.seeds, adrs, hash)?;

        adrs.set_type(AddressType::LTree);
        adrs.set_ltree_address(index as u32);
        self.ots.compress_to_leaf(&public_key, adrs, self.seeds.public_seed, hash)
    }

    /// Treehash (RFC 8391 algorithm 9). The stack never holds more than
    /// `height + 1` nodes.
    fn treehash(
        &self,
        start: u64,
        height: usize,
        mut adrs: Address,
        hash: &XMSSHash,
    ) -> Result<Node> {
        let mut stack: Vec<(Node, usize)> = Vec::with_capacity(height + 1);

        for index in start..start + (1u64 << height) {
            let mut node = self.leaf(index, &mut adrs, hash)?;
            let mut node_height = 0;

            adrs.set_type(AddressType::HashTree);
            loop {
                match stack.last() {
                    Some((_, top_height)) if *top_height == node_height => {}
                    _ => break,
                }
                let Some((left, _)) = stack.pop() else { break };
                adrs.set_tree_height(node_height as u32);
                adrs.set_tree_index((index >> (node_height + 1)) as u32);
                node = hash.combine(&left, &node, &mut adrs, self.seeds.public_seed)?;
                node_height += 1;
            }
            stack.push((node, node_height));
        }

        match stack.pop() {
            Some((root, root_height)) if stack.is_empty() && root_height == height => Ok(root),
            _ => Err(XMSSError::ProviderFailure("treehash left an unbalanced stack".into())),
        }
    }

    fn parallel_root(
        &self,
        start: u64,
        height: usize,
        split: usize,
        adrs: &Address,
    ) -> Result<Node> {
        let subtrees = 1usize << split;
        let sub_height = height - split;
        let span = 1u64 << sub_height;
        trace!(
            start,
            height,
            subtrees,
            sub_height,
            workers = self.executor.workers(),
            "parallel treehash"
        );

        let public_seed = self.seeds.public_seed;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.install(|| -> Result<Node> {
                let mut nodes = (0..subtrees)
                    .into_par_iter()
                    .map(|i| {
                        let hash = self.params.hasher();
                        self.treehash(start + i as u64 * span, sub_height, *adrs, &hash)
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut level = sub_height;
                let mut first = start >> sub_height;
                while nodes.len() > 1 {
                    let parent_first = first >> 1;
                    nodes = nodes
                        .par_chunks(2)
                        .enumerate()
                        .map(|(j, pair)| {
                            let hash = self.params.hasher();
                            let mut node_adrs = *adrs;
                            node_adrs.set_type(AddressType::HashTree);
                            node_adrs.set_tree_height(level as u32);
                            node_adrs.set_tree_index((parent_first + j as u64) as u32);
                            match pair {
                                [left, right] => {
                                    hash.combine(left, right, &mut node_adrs, public_seed)
                                }
                                _ => Err(XMSSError::ConcurrencyFailure(
                                    "odd number of partial roots".into(),
                                )),
                            }
                        })
                        .collect::<Result<Vec<_>>>()?;
                    level += 1;
                    first = parent_first;
                }

                nodes.pop().ok_or_else(|| {
                    XMSSError::ConcurrencyFailure("no partial roots computed".into())
                })
            })
        }));

        outcome.unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            Err(XMSSError::ConcurrencyFailure(reason))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPath {
    nodes: Vec<Node>,
}

impl AuthPath {
    pub fn new(nodes: Vec<Node>) -> Self {
        AuthPath { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Climbs from `leaf` at `leaf_index` to the root this path implies.
    pub fn compute_root(
        &self,
        leaf: &[u8],
        leaf_index: u64,
        adrs: &Address,
        public_seed: &[u8],
        hash: &XMSSHash,
    ) -> Result<Node> {
        let mut adrs = *adrs;
        adrs.set_type(AddressType::HashTree);

        let mut node = leaf.to_vec();
        let mut index = leaf_index;
        for (height, sibling) in self.nodes.iter().enumerate() {
            adrs.set_tree_height(height as u32);
            adrs.set_tree_index((index >> 1) as u32);
            node = if index & 1 == 0 {
                hash.combine(&node, sibling, &mut adrs, public_seed)?
            } else {
                hash.combine(sibling, &node, &mut adrs, public_seed)?
            };
            index >>= 1;
        }

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::HashFamily;
    use crate::xmss::wots_plus::{WOTSPlus, WotsPublicKey, WotsSignature};

    const PRIVATE_SEED: [u8; 32] = [5u8; 32];
    const PUBLIC_SEED: [u8; 32] = [6u8; 32];

    fn params(height: usize) -> XMSSParams {
        XMSSParams::custom(HashFamily::Sha2, 32, height).unwrap()
    }

    fn seeds() -> SeedRef<'static> {
        SeedRef { private_seed: &PRIVATE_SEED, public_seed: &PUBLIC_SEED }
    }

    fn executor(workers: usize) -> TreeHashExecutor {
        let config = TreeHashConfig::workers(NonZeroUsize::new(workers).unwrap());
        TreeHashExecutor::new(&config).unwrap()
    }

    /// Fails (or panics) when asked for one specific leaf.
    #[derive(Debug)]
    struct FaultyProvider {
        inner: WOTSPlus,
        bad_leaf: u32,
        panic: bool,
    }

    impl OneTimeSignatureProvider for FaultyProvider {
        fn generate_public_key(
            &self,
            seeds: SeedRef<'_>,
            adrs: &mut Address,
            hash: &XMSSHash,
        ) -> Result<WotsPublicKey> {
            if u32::from_be_bytes(adrs.as_bytes()[16..20].try_into().unwrap()) == self.bad_leaf {
                if self.panic {
                    panic!("injected worker panic");
                }
                return Err(XMSSError::ProviderFailure("injected failure".into()));
            }
            self.inner.generate_public_key(seeds, adrs, hash)
        }

        fn compress_to_leaf(
            &self,
            public_key: &WotsPublicKey,
            adrs: &mut Address,
            public_seed: &[u8],
            hash: &XMSSHash,
        ) -> Result<Node> {
            self.inner.compress_to_leaf(public_key, adrs, public_seed, hash)
        }

        fn sign(
            &self,
            seeds: SeedRef<'_>,
            adrs: &mut Address,
            digest: &[u8],
            hash: &XMSSHash,
        ) -> Result<WotsSignature> {
            self.inner.sign(seeds, adrs, digest, hash)
        }

        fn public_key_from_signature(
            &self,
            signature: &WotsSignature,
            digest: &[u8],
            adrs: &mut Address,
            public_seed: &[u8],
            hash: &XMSSHash,
        ) -> Result<WotsPublicKey> {
            self.inner.public_key_from_signature(signature, digest, adrs, public_seed, hash)
        }
    }

    #[test]
    fn split_level_follows_worker_count() {
        assert_eq!(TreeHashExecutor::sequential().split_level(10), 0);
        assert_eq!(executor(2).split_level(10), 1);
        assert_eq!(executor(3).split_level(10), 2);
        assert_eq!(executor(4).split_level(10), 2);
        assert_eq!(executor(8).split_level(2), 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let params = params(5);
        let ots = WOTSPlus::new(*params.wots());
        let sequential = TreeHashExecutor::sequential();
        let parallel = executor(4);
        let seq = TreeBuilder::new(&params, &ots, seeds(), &sequential);
        let par = TreeBuilder::new(&params, &ots, seeds(), &parallel);
        let adrs = Address::new();

        for (start, height) in [(0, 5), (0, 3), (8, 3), (16, 4), (4, 2), (6, 1), (9, 0)] {
            assert_eq!(
                seq.subtree_root(start, height, &adrs).unwrap(),
                par.subtree_root(start, height, &adrs).unwrap(),
                "start {start} height {height}"
            );
        }
    }

    #[test]
    fn root_combines_child_subtrees() {
        let params = params(3);
        let ots = WOTSPlus::new(*params.wots());
        let sequential = TreeHashExecutor::sequential();
        let builder = TreeBuilder::new(&params, &ots, seeds(), &sequential);
        let adrs = Address::new();

        let left = builder.subtree_root(0, 2, &adrs).unwrap();
        let right = builder.subtree_root(4, 2, &adrs).unwrap();
        let mut node_adrs = adrs;
        node_adrs.set_type(AddressType::HashTree);
        node_adrs.set_tree_height(2);
        node_adrs.set_tree_index(0);
        let combined =
            params.hasher().combine(&left, &right, &mut node_adrs, &PUBLIC_SEED).unwrap();

        assert_eq!(combined, builder.subtree_root(0, 3, &adrs).unwrap());
    }

    #[test]
    fn auth_path_reaches_root_from_every_leaf() {
        let params = params(3);
        let ots = WOTSPlus::new(*params.wots());
        let parallel = executor(2);
        let builder = TreeBuilder::new(&params, &ots, seeds(), &parallel);
        let adrs = Address::new();
        let hash = params.hasher();
        let root = builder.subtree_root(0, 3, &adrs).unwrap();

        for leaf in 0..8 {
            let path = builder.auth_path(leaf, &adrs).unwrap();
            assert_eq!(path.len(), 3);
            let leaf_node = builder.leaf(leaf, &mut adrs.clone(), &hash).unwrap();
            let recomputed =
                path.compute_root(&leaf_node, leaf, &adrs, &PUBLIC_SEED, &hash).unwrap();
            assert_eq!(recomputed, root, "leaf {leaf}");
        }
    }

    #[test]
    fn misaligned_requests_are_rejected() {
        let params = params(3);
        let ots = WOTSPlus::new(*params.wots());
        let sequential = TreeHashExecutor::sequential();
        let builder = TreeBuilder::new(&params, &ots, seeds(), &sequential);
        let adrs = Address::new();

        for (start, height) in [
            (2, 2),
            (1, 1),
            (8, 0),
            (0, 4),
            (0, 64),
            (0, usize::MAX),
            (u64::MAX, 0),
            (u64::MAX - 1, 1),
        ] {
            assert!(matches!(
                builder.subtree_root(start, height, &adrs),
                Err(XMSSError::IntegrityFailure(IntegrityError::MisalignedSubtree { .. }))
            ));
        }
    }

    #[test]
    fn provider_failure_aborts_both_paths() {
        let params = params(4);
        let ots =
            FaultyProvider { inner: WOTSPlus::new(*params.wots()), bad_leaf: 11, panic: false };
        let adrs = Address::new();

        for exec in [TreeHashExecutor::sequential(), executor(4)] {
            let builder = TreeBuilder::new(&params, &ots, seeds(), &exec);
            assert!(matches!(
                builder.subtree_root(0, 4, &adrs),
                Err(XMSSError::ProviderFailure(_))
            ));
            assert!(builder.subtree_root(0, 3, &adrs).is_ok());
        }
    }

    #[test]
    fn worker_panic_becomes_concurrency_failure() {
        let params = params(4);
        let ots = FaultyProvider { inner: WOTSPlus::new(*params.wots()), bad_leaf: 2, panic: true };
        let parallel = executor(4);
        let builder = TreeBuilder::new(&params, &ots, seeds(), &parallel);

        match builder.subtree_root(0, 4, &Address::new()) {
            Err(XMSSError::ConcurrencyFailure(reason)) => assert!(reason.contains("injected")),
            other => panic!("expected concurrency failure, got {other:?}"),
        }
    }
}
