//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::CalculatorService;
use crate::config::Settings;
use crate::infrastructure::snapshot::SnapshotStore;
use crate::infrastructure::traits::{ExpressionEngine, FastevalEngine, FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Expression engine
    pub engine: Arc<dyn ExpressionEngine>,

    pub calculators: CalculatorService,

    pub snapshots: SnapshotStore,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(FastevalEngine))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Self {
        let settings = Arc::new(settings);
        let calculators = CalculatorService::new(Arc::clone(&engine));
        let snapshots = SnapshotStore::new(Arc::clone(&fs));

        Self {
            settings,
            fs,
            engine,
            calculators,
            snapshots,
        }
    }
}
