use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::config::LoaderConfig;
use crate::loader::{DocumentSource, LoadError, LoadReport, load_vocabulary};
use crate::vocabulary::VocabularyState;

#[derive(Clone)]
struct Loaded {
    state: Arc<VocabularyState>,
    report: Arc<LoadReport>,
}

/// Owns the current vocabulary snapshot and the source it is loaded from.
///
/// Loads never overlap: callers that find no snapshot wait on the load already
/// in flight instead of starting another one. A failed reload leaves the last
/// good snapshot in place.
pub struct VocabularyStore<S> {
    source: S,
    config: LoaderConfig,
    current: RwLock<Option<Loaded>>,
    loading: Mutex<()>,
}

impl<S: DocumentSource> VocabularyStore<S> {
    pub fn new(source: S, config: LoaderConfig) -> Self {
        Self {
            source,
            config,
            current: RwLock::new(None),
            loading: Mutex::new(()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current snapshot, if a load has completed.
    pub fn snapshot(&self) -> Option<Arc<VocabularyState>> {
        self.current.read().as_ref().map(|loaded| loaded.state.clone())
    }

    pub fn last_report(&self) -> Option<Arc<LoadReport>> {
        self.current.read().as_ref().map(|loaded| loaded.report.clone())
    }

    /// Returns the snapshot, loading it first when nothing is installed yet.
    pub async fn ensure_loaded(&self) -> Result<Arc<VocabularyState>, LoadError> {
        if let Some(state) = self.snapshot() {
            return Ok(state);
        }
        let _guard = self.loading.lock().await;
        if let Some(state) = self.snapshot() {
            return Ok(state);
        }
        self.load_and_install().await
    }

    /// Loads again and replaces the snapshot on success.
    pub async fn reload(&self) -> Result<Arc<VocabularyState>, LoadError> {
        let _guard = self.loading.lock().await;
        self.load_and_install().await
    }

    async fn load_and_install(&self) -> Result<Arc<VocabularyState>, LoadError> {
        let (state, report) = load_vocabulary(&self.source, &self.config).await?;
        let state = Arc::new(state);
        *self.current.write() = Some(Loaded {
            state: state.clone(),
            report: Arc::new(report),
        });
        Ok(state)
    }
}
