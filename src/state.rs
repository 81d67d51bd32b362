use std::sync::{Arc, RwLock};

use crate::config::OracleConfig;
use crate::data::model::Catalog;
use crate::observe::QueryObserver;
use crate::oracle::Oracle;

// ---------------------------------------------------------------------------
// Shared oracle handle
// ---------------------------------------------------------------------------

/// A reloadable oracle shared by many readers.
///
/// Readers take a [`snapshot`](Self::snapshot) and query it; a reload builds
/// a complete new oracle and swaps the reference, so a snapshot never sees a
/// half-loaded catalog.
pub struct SharedOracle {
    current: RwLock<Arc<Oracle>>,
    config: OracleConfig,
    observer: Option<Arc<dyn QueryObserver>>,
}

impl SharedOracle {
    pub fn new(catalog: Catalog, config: OracleConfig) -> Self {
        Self::build(catalog, config, None)
    }

    /// Like [`new`](Self::new), reporting through `observer` across reloads.
    pub fn with_observer(
        catalog: Catalog,
        config: OracleConfig,
        observer: Arc<dyn QueryObserver>,
    ) -> Self {
        Self::build(catalog, config, Some(observer))
    }

    fn build(
        catalog: Catalog,
        config: OracleConfig,
        observer: Option<Arc<dyn QueryObserver>>,
    ) -> Self {
        let oracle = make_oracle(catalog, &config, observer.as_ref());
        Self {
            current: RwLock::new(Arc::new(oracle)),
            config,
            observer,
        }
    }

    /// The oracle currently in service.
    pub fn snapshot(&self) -> Arc<Oracle> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the catalog. Snapshots taken earlier keep the old one.
    pub fn reload(&self, catalog: Catalog) {
        self.swap(make_oracle(catalog, &self.config, self.observer.as_ref()));
        log::info!("Catalog reloaded");
    }

    fn swap(&self, oracle: Oracle) {
        let oracle = Arc::new(oracle);
        match self.current.write() {
            Ok(mut guard) => *guard = oracle,
            Err(poisoned) => *poisoned.into_inner() = oracle,
        }
    }
}

fn make_oracle(
    catalog: Catalog,
    config: &OracleConfig,
    observer: Option<&Arc<dyn QueryObserver>>,
) -> Oracle {
    let oracle = Oracle::with_config(catalog, config);
    match observer {
        Some(observer) => oracle.with_observer(Arc::clone(observer)),
        None => oracle,
    }
}
