//! Fetching and parsing of word-list documents.
//!
//! A document is a JSON array of rows, each row an array of word variants.
//! The base document is flattened into one set; glossary documents keep their
//! row order so a cutoff can take a prefix of them.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{GlossarySources, LoaderConfig};
use crate::vocabulary::{BaseVocabulary, Glossary, VocabularyCatalog, VocabularyState};

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid document identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("invalid base URL {0:?}")]
    InvalidBase(String),
    #[error("no document named {0:?}")]
    Missing(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed word list: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load base word list {document:?}: {reason}")]
    Base {
        document: String,
        #[source]
        reason: DocumentError,
    },
    #[error("failed to load word list index {document:?}: {reason}")]
    Index {
        document: String,
        #[source]
        reason: DocumentError,
    },
    #[error("failed to build base word set: {0}")]
    Build(#[from] fst::Error),
}

/// A glossary that could not be loaded and was left out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialLoadWarning {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub base_words: usize,
    pub glossaries: usize,
    pub warnings: Vec<PartialLoadWarning>,
}

/// Anything that can hand back the raw bytes of a named document.
pub trait DocumentSource: Send + Sync {
    fn fetch(&self, id: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Short human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// Documents stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(id);
        let escapes = relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_) | Component::CurDir));
        if id.is_empty() || escapes {
            return Err(FetchError::InvalidIdentifier(id.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentSource for DirSource {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(id)?;
        tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Documents served relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self, FetchError> {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: &str) -> Result<Self, FetchError> {
        // Without a trailing slash `join` would replace the last path segment.
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized).map_err(|_| FetchError::InvalidBase(base.to_string()))?;
        Ok(Self { client, base })
    }

    fn resolve(&self, id: &str) -> Result<Url, FetchError> {
        if id.is_empty() || id.starts_with('/') || id.split('/').any(|seg| seg == "..") {
            return Err(FetchError::InvalidIdentifier(id.to_string()));
        }
        let encoded = id
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        self.base
            .join(&encoded)
            .map_err(|_| FetchError::InvalidIdentifier(id.to_string()))
    }
}

impl DocumentSource for HttpSource {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.resolve(id)?;
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}

/// Documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, id: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(id, body);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.documents.insert(id.into(), body.into());
    }
}

impl DocumentSource for MemorySource {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::Missing(id.to_string()))
    }

    fn describe(&self) -> String {
        format!("memory ({} documents)", self.documents.len())
    }
}

/// A source picked at runtime from configuration.
#[derive(Debug, Clone)]
pub enum AnySource {
    Dir(DirSource),
    Http(HttpSource),
    Memory(MemorySource),
}

impl AnySource {
    /// `http://` and `https://` locations fetch over HTTP; anything else is a directory.
    pub fn from_location(location: &str) -> Result<Self, FetchError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(AnySource::Http(HttpSource::new(location)?))
        } else {
            Ok(AnySource::Dir(DirSource::new(location)))
        }
    }
}

impl DocumentSource for AnySource {
    async fn fetch(&self, id: &str) -> Result<Vec<u8>, FetchError> {
        match self {
            AnySource::Dir(source) => source.fetch(id).await,
            AnySource::Http(source) => source.fetch(id).await,
            AnySource::Memory(source) => source.fetch(id).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            AnySource::Dir(source) => source.describe(),
            AnySource::Http(source) => source.describe(),
            AnySource::Memory(source) => source.describe(),
        }
    }
}

/// Loads the base list and every configured glossary into a fresh snapshot.
///
/// A missing base list or index is fatal. A glossary that fails is skipped and
/// reported in the returned [`LoadReport`].
pub async fn load_vocabulary<S>(
    source: &S,
    config: &LoaderConfig,
) -> Result<(VocabularyState, LoadReport), LoadError>
where
    S: DocumentSource,
{
    let rows = fetch_rows(source, &config.base)
        .await
        .map_err(|reason| LoadError::Base {
            document: config.base.clone(),
            reason,
        })
        .inspect_err(|err| error!(source = %source.describe(), "{err}"))?;
    let base = BaseVocabulary::from_words(rows.into_iter().flatten())?;

    let documents = match &config.glossaries {
        GlossarySources::Index { document } => fetch_index(source, document)
            .await
            .map_err(|reason| LoadError::Index {
                document: document.clone(),
                reason,
            })
            .inspect_err(|err| error!(source = %source.describe(), "{err}"))?,
        GlossarySources::Single { document } => vec![document.clone()],
        GlossarySources::Listed { documents } => documents.clone(),
    };

    let mut catalog = VocabularyCatalog::default();
    let mut warnings = Vec::new();
    for document in documents {
        match fetch_rows(source, &document).await {
            Ok(rows) => {
                debug!(glossary = %document, rows = rows.len(), "glossary loaded");
                catalog.insert(document, Glossary::new(rows));
            }
            Err(reason) => {
                warn!(glossary = %document, error = %reason, "skipping glossary");
                warnings.push(PartialLoadWarning {
                    source: document,
                    reason: reason.to_string(),
                });
            }
        }
    }

    let report = LoadReport {
        base_words: base.len(),
        glossaries: catalog.len(),
        warnings,
    };
    info!(
        source = %source.describe(),
        base_words = report.base_words,
        glossaries = report.glossaries,
        skipped = report.warnings.len(),
        "vocabulary loaded"
    );
    Ok((VocabularyState::new(base, catalog), report))
}

async fn fetch_rows<S: DocumentSource>(
    source: &S,
    id: &str,
) -> Result<Vec<Vec<String>>, DocumentError> {
    let bytes = source.fetch(id).await?;
    debug!(document = %id, bytes = bytes.len(), "fetched word list");
    let rows: Vec<Vec<String>> = serde_json::from_slice(&bytes)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(|word| word.to_lowercase()).collect())
        .collect())
}

async fn fetch_index<S: DocumentSource>(source: &S, id: &str) -> Result<Vec<String>, DocumentError> {
    let bytes = source.fetch(id).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
