//! Generates a key, signs a few messages and checks the signatures.
//!
//! Usage: `xmss_demo [ALGORITHM]`, e.g. `xmss_demo XMSS-SHA2_10_256`.
//! Without an argument a small custom tree of height 5 is used.

use std::error::Error;
use std::time::Instant;

use tracing_subscriber::EnvFilter;
use xmss_signatures::crypto::hash::HashFamily;
use xmss_signatures::crypto::random::OsSecureRandom;
use xmss_signatures::xmss::{XMSSAlgorithm, XMSSContext, XMSSParams, XMSSPrivateKey, XMSSSignature};

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let params = match std::env::args().nth(1) {
        Some(name) => XMSSParams::new(name.parse::<XMSSAlgorithm>()?),
        None => XMSSParams::custom(HashFamily::Sha2, 32, 5)?,
    };
    println!(
        "Parameters: oid {}, height {}, n = {}, {} usable leaves",
        params.oid(),
        params.tree_height(),
        params.element_size(),
        params.leaf_limit()
    );

    let context = XMSSContext::process_wide();
    let started = Instant::now();
    let key = XMSSPrivateKey::generate(&params, &mut OsSecureRandom::new(), &context)?;
    println!("✓ Key generated in {:?} ({})", started.elapsed(), key.identity());

    let messages: [&[u8]; 3] = [b"Hello, XMSS!", b"second message", b"third message"];
    for message in messages {
        let signature = key.sign(message)?;
        let decoded = XMSSSignature::from_bytes(&signature.to_bytes(), &params)?;
        if key.public_key().verify(message, &decoded) {
            println!("✓ Leaf {} signed and verified", signature.leaf_index());
        } else {
            println!("✗ Leaf {} failed verification", signature.leaf_index());
        }
        if key.public_key().verify(b"forged", &decoded) {
            println!("✗ Leaf {} accepted a different message", signature.leaf_index());
        }
    }

    let reloaded = XMSSPrivateKey::from_bytes(&key.to_bytes(), &params, &context)?;
    println!(
        "✓ Reloaded key continues at leaf {} ({} signatures left)",
        reloaded.unused_leaf_index(),
        reloaded.remaining_signatures()
    );
    Ok(())
}
