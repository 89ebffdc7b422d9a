#[cfg(test)]
mod property_tests {
    use std::num::NonZeroUsize;

    use proptest::prelude::*;
    use xmss_signatures::crypto::hash::HashFamily;
    use xmss_signatures::crypto::random::DeterministicRng;
    use xmss_signatures::xmss::{
        Address, SeedRef, TreeBuilder, TreeHashConfig, TreeHashExecutor, WOTSPlus, XMSSContext,
        XMSSParams, XMSSPrivateKey,
    };

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn raw_private_key_round_trips(seed in any::<u64>(), signed in 0usize..4) {
            let params = XMSSParams::custom(HashFamily::Sha2, 32, 3).unwrap();
            let context = XMSSContext::isolated();
            let mut rng = DeterministicRng::new(seed);
            let key = XMSSPrivateKey::generate(&params, &mut rng, &context).unwrap();
            for _ in 0..signed {
                key.sign(b"state").unwrap();
            }

            let bytes = key.to_bytes();
            let parsed = XMSSPrivateKey::from_bytes(&bytes, &params, &context).unwrap();
            let reserialized = parsed.to_bytes();
            prop_assert_eq!(reserialized.as_slice(), bytes.as_slice());
            prop_assert_eq!(parsed.unused_leaf_index(), signed as u64);
            prop_assert_eq!(parsed.public_key(), key.public_key());
        }

        #[test]
        fn parallel_subtree_roots_match_treehash(
            private_seed in prop::array::uniform32(any::<u8>()),
            public_seed in prop::array::uniform32(any::<u8>()),
            height in 0usize..=4,
            position in 0u64..16,
            workers in 2usize..=8,
        ) {
            let params = XMSSParams::custom(HashFamily::Shake, 32, 4).unwrap();
            let ots = WOTSPlus::new(*params.wots());
            let seeds = SeedRef { private_seed: &private_seed, public_seed: &public_seed };
            let start = (position << height) % params.leaf_count();

            let sequential = TreeHashExecutor::sequential();
            let config = TreeHashConfig::workers(NonZeroUsize::new(workers).unwrap());
            let parallel = TreeHashExecutor::new(&config).unwrap();
            let mut adrs = Address::new();
            adrs.set_layer_address(1);

            let expected = TreeBuilder::new(&params, &ots, seeds, &sequential)
                .subtree_root(start, height, &adrs)
                .unwrap();
            let actual = TreeBuilder::new(&params, &ots, seeds, &parallel)
                .subtree_root(start, height, &adrs)
                .unwrap();
            prop_assert_eq!(actual, expected);
        }
    }
}
