//! Shared, atomically replaceable configuration.

use crate::config::{ParserConfig, ParserSnapshot};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Handle to the active [`ParserSnapshot`].
///
/// Clones share the same slot. Readers take an `Arc` to the current snapshot and keep using
/// it for the whole parse, so a concurrent [`replace`](Self::replace) never exposes a
/// half-updated configuration: the lock only guards the pointer swap.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<ParserSnapshot>>>,
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(ParserSnapshot::bundled())
    }
}

impl ConfigHandle {
    /// Creates a handle holding `snapshot`.
    #[must_use]
    pub fn new(snapshot: Arc<ParserSnapshot>) -> Self {
        Self {
            current: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Compiles `config` and creates a handle holding it.
    #[must_use]
    pub fn from_config(config: ParserConfig) -> Self {
        Self::new(Arc::new(ParserSnapshot::compile(config)))
    }

    /// Returns the active snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<ParserSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Compiles `config` and makes it the active snapshot.
    ///
    /// Compilation happens before the swap, outside the lock. It blocks for as long as the
    /// patterns take to build; async callers should go through [`ConfigRefresher`], which
    /// compiles on the blocking pool.
    ///
    /// [`ConfigRefresher`]: crate::ConfigRefresher
    pub fn replace(&self, config: ParserConfig) -> Arc<ParserSnapshot> {
        let snapshot = Arc::new(ParserSnapshot::compile(config));
        self.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Makes `snapshot` the active snapshot, returning the previous one.
    pub fn store(&self, snapshot: Arc<ParserSnapshot>) -> Arc<ParserSnapshot> {
        let service_rules = snapshot.service_rules().len();
        let custom_rules = snapshot.custom_rules().len();

        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, snapshot)
        };

        info!(service_rules, custom_rules, "Parser configuration replaced");
        previous
    }
}
