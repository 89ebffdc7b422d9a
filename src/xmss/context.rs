use std::sync::Arc;

use crate::xmss::registry::LeafIndexRegistry;
use crate::xmss::tree::{TreeHashConfig, TreeHashExecutor};
use crate::xmss::Result;

/// Services a private key needs beyond its own secrets: the leaf-index
/// registry it draws indices from and the executor its trees are hashed on.
///
/// Keys that must never reuse a leaf have to be loaded through contexts that
/// share one registry. [`XMSSContext::process_wide`] is the usual choice;
/// tests build isolated registries with [`XMSSContext::isolated`].
#[derive(Debug, Clone)]
pub struct XMSSContext {
    registry: Arc<LeafIndexRegistry>,
    executor: TreeHashExecutor,
}

impl XMSSContext {
    pub fn new(registry: Arc<LeafIndexRegistry>, config: &TreeHashConfig) -> Result<Self> {
        Ok(XMSSContext { registry, executor: TreeHashExecutor::new(config)? })
    }

    /// Process-wide registry, global rayon pool.
    pub fn process_wide() -> Self {
        XMSSContext {
            registry: LeafIndexRegistry::process_wide(),
            executor: TreeHashExecutor::default(),
        }
    }

    /// Fresh registry shared with nothing else, global rayon pool.
    pub fn isolated() -> Self {
        XMSSContext {
            registry: Arc::new(LeafIndexRegistry::new()),
            executor: TreeHashExecutor::default(),
        }
    }

    pub fn with_executor(mut self, executor: TreeHashExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn registry(&self) -> &Arc<LeafIndexRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &TreeHashExecutor {
        &self.executor
    }
}

impl Default for XMSSContext {
    fn default() -> Self {
        Self::process_wide()
    }
}
